/// Role-scoped partial updates for tasks
///
/// [`apply_task_update`] takes the stored task, the requester's role and the
/// requested changes, and produces the merged task plus the list of fields it
/// accepted. It is pure: nothing is written until the caller persists
/// [`TaskUpdate::changed_fields`].
///
/// | Field | Owner | Collaborator |
/// |---|---|---|
/// | title, description, status, time_until_finish, category | applied | applied |
/// | group_id, assigned_to, arr_collaborators | applied | ignored |
///
/// Content fields treat empty strings and zero as "unchanged". Delegation
/// fields treat presence as a request; an empty string clears the reference.
/// The merged task must satisfy every task invariant or the whole update is
/// rejected.

use crate::auth::authorization::{require_task_access, TaskRole};
use crate::error::{CoreError, CoreResult};
use crate::models::dedup_ids;
use crate::models::task::{Task, TaskChanges, TaskField, UPDATED_AT_FIELD};
use crate::store::{encode, FieldMap};
use chrono::Utc;
use tracing::debug;

/// Result of a successful merge
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    /// The task as it will look once persisted
    pub task: Task,

    /// Fields taken from the request, in application order
    pub accepted: Vec<TaskField>,
}

impl TaskUpdate {
    /// The partial document to write: accepted fields plus `updated_at`
    pub fn changed_fields(&self) -> CoreResult<FieldMap> {
        let document = encode(&self.task)?;
        let mut fields = FieldMap::new();

        for field in &self.accepted {
            let name = field.as_str();
            let value = document.get(name).cloned().ok_or_else(|| {
                CoreError::Internal(format!("encoded task has no '{}' field", name))
            })?;
            fields.insert(name.to_string(), value);
        }

        let updated_at = document
            .get(UPDATED_AT_FIELD)
            .cloned()
            .ok_or_else(|| CoreError::Internal("encoded task has no updated_at".into()))?;
        fields.insert(UPDATED_AT_FIELD.to_string(), updated_at);

        Ok(fields)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Merges `changes` into `existing` as far as `role` allows
///
/// # Errors
///
/// - [`CoreError::Forbidden`] when the role is Unrelated
/// - [`CoreError::InvalidEntity`] when the merged task breaks an invariant
pub fn apply_task_update(
    existing: &Task,
    role: TaskRole,
    changes: &TaskChanges,
) -> CoreResult<TaskUpdate> {
    require_task_access(role)?;

    let mut task = existing.clone();
    let mut accepted = Vec::new();

    if let Some(title) = non_empty(&changes.title) {
        task.title = title.to_string();
        accepted.push(TaskField::Title);
    }
    if let Some(description) = non_empty(&changes.description) {
        task.description = description.to_string();
        accepted.push(TaskField::Description);
    }
    if let Some(status) = changes.status {
        task.status = status;
        accepted.push(TaskField::Status);
    }
    if let Some(time) = changes.time_until_finish.filter(|t| *t != 0) {
        task.time_until_finish = time;
        accepted.push(TaskField::TimeUntilFinish);
    }
    if let Some(category) = non_empty(&changes.category) {
        task.category = category.to_string();
        accepted.push(TaskField::Category);
    }

    let wants_delegation = changes.group_id.is_some()
        || changes.assigned_to.is_some()
        || changes.arr_collaborators.is_some();

    if role == TaskRole::Owner {
        if let Some(group_id) = &changes.group_id {
            task.group_id = Some(group_id.clone()).filter(|g| !g.is_empty());
            accepted.push(TaskField::GroupId);
        }
        if let Some(assigned_to) = &changes.assigned_to {
            task.assigned_to = Some(assigned_to.clone()).filter(|a| !a.is_empty());
            accepted.push(TaskField::AssignedTo);
        }
        if let Some(collaborators) = &changes.arr_collaborators {
            task.arr_collaborators =
                dedup_ids(collaborators.iter().filter(|c| !c.is_empty()).cloned());
            accepted.push(TaskField::Collaborators);
        }
    } else if wants_delegation {
        debug!(task_id = %existing.id, "Ignoring delegation fields sent by a collaborator");
    }

    task.validate()?;
    task.updated_at = Utc::now();

    Ok(TaskUpdate { task, accepted })
}
