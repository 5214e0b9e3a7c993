/// Group endpoints
///
/// # Endpoints
///
/// - `GET /api/groups` - Groups the caller belongs to
/// - `POST /api/groups` - Create a group with the caller as creator
/// - `GET /api/groups/:id` - Group with member profiles (members only)
/// - `POST /api/groups/:id/members/:user_id` - Add a member (members only)
/// - `DELETE /api/groups/:id/members/:user_id` - Remove a member

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use taskshare_shared::{
    auth::middleware::AuthContext,
    models::group::{Group, GroupDetails, NewGroup},
};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: Group,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// List the caller's groups
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<GroupsResponse>> {
    let groups = state.services.groups.list_user_groups(&auth.subject).await?;
    Ok(Json(GroupsResponse { groups }))
}

/// Create a group
///
/// # Endpoint
///
/// ```text
/// POST /api/groups
/// Authorization: Bearer <token>
///
/// { "name": "Household", "description": "Chores", "members": ["<user id>"] }
/// ```
///
/// The caller is added to `members` if not already listed.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Name or description out of bounds
/// - `404 Not Found`: A listed member does not exist
pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<NewGroup>,
) -> ApiResult<(StatusCode, Json<GroupResponse>)> {
    req.validate()?;

    let group = state.services.groups.create_group(&auth.subject, req).await?;
    Ok((StatusCode::CREATED, Json(GroupResponse { group })))
}

/// Group with its member profiles
pub async fn get_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupDetails>> {
    let details = state
        .services
        .groups
        .get_group(&auth.subject, &group_id)
        .await?;
    Ok(Json(details))
}

/// Add a member
///
/// # Errors
///
/// - `404 Not Found`: No such group or user
/// - `403 Forbidden`: Caller is not a member
/// - `409 Conflict`: Already a member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .membership
        .add_member(&group_id, &user_id, &auth.subject)
        .await?;

    Ok(Json(MessageResponse {
        message: "Member added successfully".to_string(),
    }))
}

/// Remove a member
///
/// The creator may remove anyone but themselves; other members may only
/// remove themselves.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((group_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .services
        .membership
        .remove_member(&group_id, &user_id, &auth.subject)
        .await?;

    Ok(Json(MessageResponse {
        message: "Member removed successfully".to_string(),
    }))
}
