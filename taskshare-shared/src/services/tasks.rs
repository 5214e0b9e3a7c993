/// Task operations
///
/// Creation and deletion are owner operations; updates go through the
/// role-scoped merge in [`crate::services::merge`]; listings go through the
/// visibility aggregator.

use crate::auth::authorization::{require_task_ownership, resolve_task_role};
use crate::error::CoreResult;
use crate::models::task::{NewTask, Task, TaskChanges};
use crate::services::load;
use crate::services::merge::apply_task_update;
use crate::services::visibility;
use crate::store::{put, Collection, DocumentStore};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DocumentStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates a task owned by `subject`
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::InvalidEntity`] if the task breaks an invariant.
    pub async fn create_task(&self, subject: &str, input: NewTask) -> CoreResult<Task> {
        let task = Task::create(subject, input);
        task.validate()?;

        put(self.store.as_ref(), Collection::Tasks, &task.id, &task).await?;

        info!(task_id = %task.id, user_id = %subject, "Task created");
        Ok(task)
    }

    /// Applies `changes` as far as the requester's role allows
    ///
    /// Only the accepted fields and `updated_at` are written, as a blind
    /// partial overwrite.
    pub async fn update_task(
        &self,
        subject: &str,
        task_id: &str,
        changes: TaskChanges,
    ) -> CoreResult<Task> {
        let existing: Task = load(self.store.as_ref(), Collection::Tasks, task_id).await?;
        let role = resolve_task_role(&existing, subject);

        let update = apply_task_update(&existing, role, &changes)?;
        let fields = update.changed_fields()?;

        self.store
            .merge_fields(Collection::Tasks, task_id, fields)
            .await?;

        debug!(
            task_id = %task_id,
            user_id = %subject,
            role = ?role,
            accepted = ?update.accepted,
            "Task updated"
        );
        Ok(update.task)
    }

    /// Deletes a task; owner only
    pub async fn delete_task(&self, subject: &str, task_id: &str) -> CoreResult<()> {
        let existing: Task = load(self.store.as_ref(), Collection::Tasks, task_id).await?;
        require_task_ownership(resolve_task_role(&existing, subject))?;

        self.store.delete(Collection::Tasks, task_id).await?;

        info!(task_id = %task_id, user_id = %subject, "Task deleted");
        Ok(())
    }

    /// Tasks the subject owns or collaborates on
    pub async fn list_visible_tasks(&self, subject: &str) -> CoreResult<Vec<Task>> {
        visibility::list_visible_tasks(self.store.as_ref(), subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::CoreError;

    fn new_task(collaborators: &[&str]) -> NewTask {
        NewTask {
            title: "Write report".into(),
            description: "Quarterly".into(),
            arr_collaborators: collaborators.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let tasks = TaskService::new(Arc::new(MemoryStore::new()));
        let created = tasks.create_task("owner", new_task(&["collab"])).await.unwrap();

        let owned = tasks.list_visible_tasks("owner").await.unwrap();
        assert_eq!(owned, vec![created.clone()]);

        let shared = tasks.list_visible_tasks("collab").await.unwrap();
        assert_eq!(shared, vec![created]);

        assert!(tasks.list_visible_tasks("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_persists_merged_task() {
        let store = MemoryStore::new();
        let tasks = TaskService::new(Arc::new(store.clone()));
        let created = tasks.create_task("owner", new_task(&["collab"])).await.unwrap();

        let changes = TaskChanges {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let updated = tasks
            .update_task("collab", &created.id, changes)
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");

        let stored: Task = load(&store, Collection::Tasks, &created.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_missing_vs_forbidden() {
        let tasks = TaskService::new(Arc::new(MemoryStore::new()));
        let created = tasks.create_task("owner", new_task(&[])).await.unwrap();

        assert!(matches!(
            tasks.update_task("owner", "missing", TaskChanges::default()).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            tasks
                .update_task("stranger", &created.id, TaskChanges::default())
                .await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_owner_only() {
        let tasks = TaskService::new(Arc::new(MemoryStore::new()));
        let created = tasks.create_task("owner", new_task(&["collab"])).await.unwrap();

        assert!(matches!(
            tasks.delete_task("collab", &created.id).await,
            Err(CoreError::Forbidden(_))
        ));

        tasks.delete_task("owner", &created.id).await.unwrap();
        assert!(matches!(
            tasks.delete_task("owner", &created.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_group_without_assignee() {
        let tasks = TaskService::new(Arc::new(MemoryStore::new()));
        let mut input = new_task(&[]);
        input.group_id = Some("g-1".into());

        assert!(matches!(
            tasks.create_task("owner", input).await,
            Err(CoreError::InvalidEntity(_))
        ));
        assert!(tasks.list_visible_tasks("owner").await.unwrap().is_empty());
    }
}
