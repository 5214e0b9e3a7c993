/// Role resolution and permission checks
///
/// Roles are derived, never stored: each request computes the requester's
/// relationship to an entity that the caller has already fetched.
///
/// # Task roles
///
/// | Role | Condition |
/// |---|---|
/// | Owner | `task.user_id == subject` |
/// | Collaborator | subject listed in `task.arr_collaborators`, not the owner |
/// | Unrelated | anything else |
///
/// # Group roles
///
/// | Role | Condition |
/// |---|---|
/// | Creator | `group.creator_id == subject` |
/// | Member | subject listed in `group.members` |
/// | Unrelated | anything else |
///
/// Unrelated is terminal: every `require_*` check rejects it. Absence of the
/// entity is the caller's concern and is reported as not-found before any
/// role is computed.
///
/// # Example
///
/// ```
/// use taskshare_shared::auth::authorization::{require_task_access, resolve_task_role, TaskRole};
/// use taskshare_shared::models::task::{NewTask, Task};
///
/// let task = Task::create("u-1", NewTask {
///     title: "Plan".into(),
///     description: "Plan the sprint".into(),
///     arr_collaborators: vec!["u-2".into()],
///     ..Default::default()
/// });
///
/// assert_eq!(resolve_task_role(&task, "u-2"), TaskRole::Collaborator);
/// assert!(require_task_access(resolve_task_role(&task, "u-3")).is_err());
/// ```

use crate::models::group::Group;
use crate::models::task::Task;

/// Requester's relationship to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRole {
    Owner,
    Collaborator,
    Unrelated,
}

/// Requester's relationship to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRole {
    Creator,
    Member,
    Unrelated,
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("You are neither the owner nor a collaborator of this task")]
    NoTaskAccess,

    #[error("Only the task owner can do this")]
    NotTaskOwner,

    #[error("You are not a member of this group")]
    NotGroupMember,

    #[error("The group creator cannot be removed from the group")]
    CreatorImmune,

    #[error("Only the group creator can remove other members")]
    CannotRemoveOthers,
}

/// Computes the requester's role on a task
pub fn resolve_task_role(task: &Task, subject: &str) -> TaskRole {
    if task.user_id == subject {
        TaskRole::Owner
    } else if task.arr_collaborators.iter().any(|c| c == subject) {
        TaskRole::Collaborator
    } else {
        TaskRole::Unrelated
    }
}

/// Computes the requester's role on a group
pub fn resolve_group_role(group: &Group, subject: &str) -> GroupRole {
    if group.creator_id == subject {
        GroupRole::Creator
    } else if group.is_member(subject) {
        GroupRole::Member
    } else {
        GroupRole::Unrelated
    }
}

/// Owner or collaborator
pub fn require_task_access(role: TaskRole) -> Result<(), AuthzError> {
    match role {
        TaskRole::Owner | TaskRole::Collaborator => Ok(()),
        TaskRole::Unrelated => Err(AuthzError::NoTaskAccess),
    }
}

/// Owner only
pub fn require_task_ownership(role: TaskRole) -> Result<(), AuthzError> {
    match role {
        TaskRole::Owner => Ok(()),
        _ => Err(AuthzError::NotTaskOwner),
    }
}

/// Creator or member; gates reads and member additions
pub fn require_group_membership(role: GroupRole) -> Result<(), AuthzError> {
    match role {
        GroupRole::Creator | GroupRole::Member => Ok(()),
        GroupRole::Unrelated => Err(AuthzError::NotGroupMember),
    }
}

/// Checks whether `requester` may remove `target` from `group`
///
/// The creator is immune, including from themself. Otherwise the creator may
/// remove anyone and everyone else may only remove themself.
pub fn require_member_removal(
    group: &Group,
    requester: &str,
    target: &str,
) -> Result<(), AuthzError> {
    if group.creator_id == target {
        return Err(AuthzError::CreatorImmune);
    }

    match resolve_group_role(group, requester) {
        GroupRole::Creator => Ok(()),
        _ if requester == target => Ok(()),
        _ => Err(AuthzError::CannotRemoveOthers),
    }
}
