/// Task model
///
/// A task belongs to one owner (`user_id`), may be delegated to a group and
/// assigned to one user of that group, and may be co-edited by a list of
/// collaborators (`arr_collaborators`).
///
/// # Invariants
///
/// - `title` and `description` are non-empty
/// - a set, non-empty `group_id` requires a set, non-empty `assigned_to`
/// - the owner never appears in `arr_collaborators`
///
/// [`Task::validate`] checks all three; every write path calls it before
/// touching the store.
///
/// # Document shape
///
/// ```json
/// {
///   "id": "7c1d...",
///   "user_id": "u-owner",
///   "group_id": null,
///   "assigned_to": null,
///   "created_by": "u-owner",
///   "title": "Write report",
///   "description": "Quarterly numbers",
///   "status": "in_progress",
///   "category": "work",
///   "time_until_finish": 86400000000000,
///   "remind_me": false,
///   "arr_collaborators": ["u-2"],
///   "created_at": "2025-01-01T00:00:00Z",
///   "updated_at": "2025-01-01T00:00:00Z"
/// }
/// ```

use crate::error::{CoreError, CoreResult};
use crate::models::{dedup_ids, new_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document field holding the owner's ID
pub const OWNER_FIELD: &str = "user_id";

/// Document field holding the collaborator list
pub const COLLABORATORS_FIELD: &str = "arr_collaborators";

/// Document field refreshed on every accepted update
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Task progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(CoreError::InvalidEntity(format!(
                "status must be one of pending, in_progress, completed (got '{}')",
                other
            ))),
        }
    }
}

/// Updatable task fields
///
/// Content fields may be changed by the owner and by collaborators;
/// delegation fields only by the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    Title,
    Description,
    Status,
    TimeUntilFinish,
    Category,
    GroupId,
    AssignedTo,
    Collaborators,
}

impl TaskField {
    /// Document field name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskField::Title => "title",
            TaskField::Description => "description",
            TaskField::Status => "status",
            TaskField::TimeUntilFinish => "time_until_finish",
            TaskField::Category => "category",
            TaskField::GroupId => "group_id",
            TaskField::AssignedTo => "assigned_to",
            TaskField::Collaborators => COLLABORATORS_FIELD,
        }
    }

    /// True for fields a collaborator may change
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            TaskField::Title
                | TaskField::Description
                | TaskField::Status
                | TaskField::TimeUntilFinish
                | TaskField::Category
        )
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,

    /// Owner
    pub user_id: String,

    /// Group the task is delegated to
    #[serde(default, deserialize_with = "blank_as_none")]
    pub group_id: Option<String>,

    /// Group member responsible for the task
    #[serde(default, deserialize_with = "blank_as_none")]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub created_by: String,

    pub title: String,
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub category: String,

    /// Duration until due, in nanoseconds
    #[serde(default)]
    pub time_until_finish: i64,

    #[serde(default)]
    pub remind_me: bool,

    /// Co-editors, in insertion order
    #[serde(default)]
    pub arr_collaborators: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Older documents stored cleared references as `""`
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Task creation input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub time_until_finish: i64,
    #[serde(default)]
    pub remind_me: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub arr_collaborators: Vec<String>,
}

/// Requested changes to an existing task
///
/// Content fields use "empty means unchanged": `None`, `Some("")` and
/// `Some(0)` all leave the field alone. Delegation fields use "present means
/// requested": `Some("")` clears `group_id`/`assigned_to`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub time_until_finish: Option<i64>,
    pub category: Option<String>,
    pub group_id: Option<String>,
    pub assigned_to: Option<String>,
    pub arr_collaborators: Option<Vec<String>>,
}

impl Task {
    /// Builds a new task owned and created by `owner`
    ///
    /// Blank delegation references become `None` and the collaborator list is
    /// de-duplicated. The result is not validated; call [`Task::validate`].
    pub fn create(owner: &str, input: NewTask) -> Task {
        let now = Utc::now();

        Task {
            id: new_id(),
            user_id: owner.to_string(),
            group_id: input.group_id.filter(|s| !s.is_empty()),
            assigned_to: input.assigned_to.filter(|s| !s.is_empty()),
            created_by: owner.to_string(),
            title: input.title,
            description: input.description,
            status: input.status,
            category: input.category,
            time_until_finish: input.time_until_finish,
            remind_me: input.remind_me,
            arr_collaborators: dedup_ids(input.arr_collaborators),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the task invariants
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidEntity`] naming the first violated rule.
    pub fn validate(&self) -> CoreResult<()> {
        if self.title.is_empty() {
            return Err(CoreError::InvalidEntity("title must not be empty".into()));
        }
        if self.description.is_empty() {
            return Err(CoreError::InvalidEntity(
                "description must not be empty".into(),
            ));
        }

        let grouped = self.group_id.as_deref().is_some_and(|g| !g.is_empty());
        let assigned = self.assigned_to.as_deref().is_some_and(|a| !a.is_empty());
        if grouped && !assigned {
            return Err(CoreError::InvalidEntity(
                "a task delegated to a group must be assigned to a user".into(),
            ));
        }

        if self.arr_collaborators.iter().any(|c| c == &self.user_id) {
            return Err(CoreError::InvalidEntity(
                "the owner cannot also be a collaborator".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_task() -> NewTask {
        NewTask {
            title: "Write report".to_string(),
            description: "Quarterly numbers".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
        assert!(matches!(
            "done".parse::<TaskStatus>(),
            Err(CoreError::InvalidEntity(_))
        ));
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            json!("in_progress")
        );
    }

    #[test]
    fn test_field_classes() {
        assert!(TaskField::Title.is_content());
        assert!(TaskField::Category.is_content());
        assert!(!TaskField::GroupId.is_content());
        assert!(!TaskField::Collaborators.is_content());
        assert_eq!(TaskField::TimeUntilFinish.as_str(), "time_until_finish");
    }

    #[test]
    fn test_create_sets_owner_and_creator() {
        let mut input = new_task();
        input.group_id = Some(String::new());
        input.arr_collaborators = vec!["u-2".into(), "u-3".into(), "u-2".into()];

        let task = Task::create("u-1", input);
        assert_eq!(task.user_id, "u-1");
        assert_eq!(task.created_by, "u-1");
        assert_eq!(task.group_id, None);
        assert_eq!(task.arr_collaborators, vec!["u-2", "u-3"]);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_group_requires_assignee() {
        let mut input = new_task();
        input.group_id = Some("g-1".to_string());
        let task = Task::create("u-1", input);
        assert!(matches!(task.validate(), Err(CoreError::InvalidEntity(_))));

        let mut input = new_task();
        input.group_id = Some("g-1".to_string());
        input.assigned_to = Some("u-2".to_string());
        assert!(Task::create("u-1", input).validate().is_ok());
    }

    #[test]
    fn test_owner_cannot_collaborate() {
        let mut input = new_task();
        input.arr_collaborators = vec!["u-1".to_string()];
        let task = Task::create("u-1", input);
        assert!(matches!(task.validate(), Err(CoreError::InvalidEntity(_))));
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut input = new_task();
        input.title = String::new();
        assert!(Task::create("u-1", input).validate().is_err());
    }

    #[test]
    fn test_whitespace_text_is_not_empty() {
        let mut input = new_task();
        input.title = "   ".to_string();
        input.description = " ".to_string();
        assert!(Task::create("u-1", input).validate().is_ok());
    }

    #[test]
    fn test_legacy_blank_references_decode_as_none() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1",
            "user_id": "u-1",
            "group_id": "",
            "assigned_to": "",
            "title": "t",
            "description": "d",
            "status": "pending",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(task.group_id, None);
        assert_eq!(task.assigned_to, None);
        assert!(task.arr_collaborators.is_empty());
    }
}
