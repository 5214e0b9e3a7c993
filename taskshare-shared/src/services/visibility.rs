/// Tasks visible to a user
///
/// A user sees a task through two disjoint paths: owning it (`user_id`) or
/// being listed as a collaborator (`arr_collaborators`). Both queries run
/// concurrently; the owner results come first and duplicates keep their
/// first position.

use crate::error::CoreResult;
use crate::models::task::{Task, COLLABORATORS_FIELD, OWNER_FIELD};
use crate::store::{decode_all, Collection, DocumentStore};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Lists every task `subject` owns or collaborates on
///
/// # Errors
///
/// If either query fails the whole call fails; partial results are never
/// returned.
pub async fn list_visible_tasks(store: &dyn DocumentStore, subject: &str) -> CoreResult<Vec<Task>> {
    let subject_value = Value::String(subject.to_string());

    let (owned, collaborated) = futures::try_join!(
        store.query_equals(Collection::Tasks, OWNER_FIELD, &subject_value),
        store.query_array_contains(Collection::Tasks, COLLABORATORS_FIELD, &subject_value),
    )
    .map_err(|e| {
        warn!(user_id = %subject, error = %e, "Visible task query failed");
        e
    })?;

    let owned: Vec<Task> = decode_all(Collection::Tasks, owned);
    let collaborated: Vec<Task> = decode_all(Collection::Tasks, collaborated);

    debug!(
        user_id = %subject,
        owned = owned.len(),
        collaborated = collaborated.len(),
        "Fetched visible tasks"
    );

    Ok(merge_visible(owned, collaborated))
}

/// Concatenates the two result sets and drops repeated ids
pub fn merge_visible(owned: Vec<Task>, collaborated: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();

    owned
        .into_iter()
        .chain(collaborated)
        .filter(|task| seen.insert(task.id.clone()))
        .collect()
}
