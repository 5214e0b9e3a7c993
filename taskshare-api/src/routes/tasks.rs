/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - Tasks the caller owns, then tasks they collaborate on
/// - `POST /api/tasks` - Create a task owned by the caller
/// - `PUT /api/tasks/:id` - Partial update, scoped by the caller's role
/// - `DELETE /api/tasks/:id` - Delete (owner only)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskshare_shared::{
    auth::middleware::AuthContext,
    models::task::{NewTask, Task, TaskChanges, TaskStatus},
    CoreResult,
};

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskUpdatedResponse {
    pub message: String,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Update request body
///
/// Every field is optional. Empty strings and `0` leave content fields as
/// they are; an empty `group_id` or `assigned_to` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub time_until_finish: Option<i64>,
    pub category: Option<String>,
    pub group_id: Option<String>,
    pub assigned_to: Option<String>,
    pub arr_collaborators: Option<Vec<String>>,
}

impl UpdateTaskRequest {
    /// Converts into the service's change set
    ///
    /// A blank status means "unchanged"; an unknown one is rejected.
    pub fn into_changes(self) -> CoreResult<TaskChanges> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<TaskStatus>()?),
        };

        Ok(TaskChanges {
            title: self.title,
            description: self.description,
            status,
            time_until_finish: self.time_until_finish,
            category: self.category,
            group_id: self.group_id,
            assigned_to: self.assigned_to,
            arr_collaborators: self.arr_collaborators,
        })
    }
}

/// List visible tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TasksResponse>> {
    let tasks = state.services.tasks.list_visible_tasks(&auth.subject).await?;
    Ok(Json(TasksResponse { tasks }))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks
/// Authorization: Bearer <token>
///
/// {
///   "title": "Buy groceries",
///   "description": "Milk, eggs",
///   "status": "pending",
///   "category": "home",
///   "arr_collaborators": ["<user id>"]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Blank title or description, `group_id` without
///   `assigned_to`, or the owner listed as a collaborator
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = state.services.tasks.create_task(&auth.subject, req).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse { task })))
}

/// Update a task
///
/// Collaborators may change content fields only; delegation fields they send
/// are ignored. A change that would leave the task invalid is rejected whole.
///
/// # Errors
///
/// - `404 Not Found`: No such task
/// - `403 Forbidden`: Caller neither owns nor collaborates on it
/// - `400 Bad Request`: Unknown status or invalid resulting task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskUpdatedResponse>> {
    let changes = req.into_changes()?;
    let task = state
        .services
        .tasks
        .update_task(&auth.subject, &task_id, changes)
        .await?;

    Ok(Json(TaskUpdatedResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// Delete a task; owner only
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .tasks
        .delete_task(&auth.subject, &task_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}
