/// Domain models
///
/// - `user`: accounts, public profiles and the user-side group mirror
/// - `task`: tasks, their invariants, and the shape of partial updates
/// - `group`: collaboration groups and their member lists
///
/// Identifiers are opaque strings. Models are stored as JSON documents through
/// [`crate::store::DocumentStore`]; the field names here are the document
/// field names.

pub mod group;
pub mod task;
pub mod user;

use std::collections::HashSet;

/// Generates a fresh opaque identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Removes repeated ids, keeping the first occurrence of each
pub fn dedup_ids<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}
