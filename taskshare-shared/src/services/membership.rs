/// Group membership with a mirrored user-side list
///
/// Membership is stored twice: `Group.members` (authoritative) and
/// `User.groups` (a mirror). The store has no multi-document transactions, so
/// every change writes the group first and then updates the mirror
/// best-effort. A failed mirror write is logged and swallowed; the group-side
/// change stands.
///
/// [`MembershipManager::reconcile_user_groups`] re-derives a user's mirror from
/// the group side and repairs any drift those swallowed failures left behind.
///
/// Neither write carries a version token: two concurrent edits of the same
/// group read the same member list and the later write wins.

use crate::auth::authorization::{
    require_group_membership, require_member_removal, resolve_group_role,
};
use crate::error::{CoreError, CoreResult};
use crate::models::group::{Group, MEMBERS_FIELD};
use crate::models::task::UPDATED_AT_FIELD;
use crate::models::user::{User, GROUPS_FIELD};
use crate::services::load;
use crate::store::{decode_all, fetch, Collection, DocumentStore, FieldMap};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Adds and removes group members, keeping the user mirror in step
#[derive(Clone)]
pub struct MembershipManager {
    store: Arc<dyn DocumentStore>,
}

impl MembershipManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds `user_id` to a group on behalf of `requester`
    ///
    /// Checks run in order: group exists, requester is creator or member,
    /// target not already a member, target user exists.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the group or the target user is missing
    /// - [`CoreError::Forbidden`] if the requester is not in the group
    /// - [`CoreError::Conflict`] if the target is already a member
    /// - [`CoreError::Unavailable`] if the group write fails
    pub async fn add_member(
        &self,
        group_id: &str,
        user_id: &str,
        requester: &str,
    ) -> CoreResult<Group> {
        let mut group: Group = load(self.store.as_ref(), Collection::Groups, group_id).await?;
        require_group_membership(resolve_group_role(&group, requester))?;

        if group.is_member(user_id) {
            return Err(CoreError::Conflict(format!(
                "User {} is already a member of this group",
                user_id
            )));
        }

        load::<User>(self.store.as_ref(), Collection::Users, user_id).await?;

        group.members.push(user_id.to_string());
        group.updated_at = Utc::now();
        self.write_members(&group).await?;

        info!(group_id = %group.id, user_id = %user_id, requester = %requester, "Member added");

        self.mirror_add(user_id, group_id).await;
        Ok(group)
    }

    /// Removes `user_id` from a group on behalf of `requester`
    ///
    /// The creator can never be removed. Other members may be removed by the
    /// creator, or may remove themselves.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the group is missing or the target is not
    ///   a member
    /// - [`CoreError::Forbidden`] if the removal is not permitted
    /// - [`CoreError::Unavailable`] if the group write fails
    pub async fn remove_member(
        &self,
        group_id: &str,
        user_id: &str,
        requester: &str,
    ) -> CoreResult<Group> {
        let mut group: Group = load(self.store.as_ref(), Collection::Groups, group_id).await?;
        require_member_removal(&group, requester, user_id)?;

        if !group.is_member(user_id) {
            return Err(CoreError::NotFound(format!(
                "User {} is not a member of group {}",
                user_id, group_id
            )));
        }

        group.members.retain(|m| m != user_id);
        group.updated_at = Utc::now();
        self.write_members(&group).await?;

        info!(group_id = %group.id, user_id = %user_id, requester = %requester, "Member removed");

        self.mirror_remove(user_id, group_id).await;
        Ok(group)
    }

    /// Rebuilds a user's `groups` mirror from the groups that list them
    ///
    /// Returns the group ids now stored on the user.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the user does not exist
    /// - [`CoreError::Unavailable`] if the query or the write fails
    pub async fn reconcile_user_groups(&self, user_id: &str) -> CoreResult<Vec<String>> {
        let user: User = load(self.store.as_ref(), Collection::Users, user_id).await?;

        let documents = self
            .store
            .query_array_contains(
                Collection::Groups,
                MEMBERS_FIELD,
                &Value::String(user_id.to_string()),
            )
            .await?;
        let groups: Vec<String> = decode_all::<Group>(Collection::Groups, documents)
            .into_iter()
            .map(|g| g.id)
            .collect();

        if groups != user.groups {
            let mut fields = FieldMap::new();
            fields.insert(GROUPS_FIELD.to_string(), json!(groups));
            self.store
                .merge_fields(Collection::Users, user_id, fields)
                .await?;

            info!(
                user_id = %user_id,
                before = user.groups.len(),
                after = groups.len(),
                "Reconciled user group mirror"
            );
        } else {
            debug!(user_id = %user_id, "User group mirror already consistent");
        }

        Ok(groups)
    }

    /// Appends `group_id` to the user's mirror if absent; never fails
    pub(crate) async fn mirror_add(&self, user_id: &str, group_id: &str) {
        let result = self
            .update_mirror(user_id, |groups| {
                if groups.iter().any(|g| g == group_id) {
                    false
                } else {
                    groups.push(group_id.to_string());
                    true
                }
            })
            .await;

        if let Err(e) = result {
            warn!(
                user_id = %user_id,
                group_id = %group_id,
                error = %e,
                "Failed to add group to user mirror; group membership is authoritative"
            );
        }
    }

    /// Drops `group_id` from the user's mirror; never fails
    pub(crate) async fn mirror_remove(&self, user_id: &str, group_id: &str) {
        let result = self
            .update_mirror(user_id, |groups| {
                let before = groups.len();
                groups.retain(|g| g != group_id);
                groups.len() != before
            })
            .await;

        if let Err(e) = result {
            warn!(
                user_id = %user_id,
                group_id = %group_id,
                error = %e,
                "Failed to remove group from user mirror; group membership is authoritative"
            );
        }
    }

    async fn update_mirror<F>(&self, user_id: &str, edit: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Vec<String>) -> bool,
    {
        let Some(mut user) =
            fetch::<User>(self.store.as_ref(), Collection::Users, user_id).await?
        else {
            return Err(CoreError::NotFound(format!("User {}", user_id)));
        };

        if !edit(&mut user.groups) {
            return Ok(());
        }

        let mut fields = FieldMap::new();
        fields.insert(GROUPS_FIELD.to_string(), json!(user.groups));
        self.store
            .merge_fields(Collection::Users, user_id, fields)
            .await?;
        Ok(())
    }

    async fn write_members(&self, group: &Group) -> CoreResult<()> {
        let mut fields = FieldMap::new();
        fields.insert(MEMBERS_FIELD.to_string(), json!(group.members));
        fields.insert(UPDATED_AT_FIELD.to_string(), json!(group.updated_at));

        self.store
            .merge_fields(Collection::Groups, &group.id, fields)
            .await
            .map_err(|e| {
                warn!(group_id = %group.id, error = %e, "Failed to write group members");
                CoreError::Unavailable(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::group::NewGroup;
    use crate::store::{memory::MemoryStore, put};

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{}@example.com", id),
            role: "user".to_string(),
            password_hash: "$argon2id$test".to_string(),
            created_at: Utc::now(),
            groups: vec![],
        }
    }

    async fn setup(users: &[&str]) -> (MemoryStore, MembershipManager, Group) {
        let store = MemoryStore::new();
        for id in users {
            put(&store, Collection::Users, id, &user(id)).await.unwrap();
        }

        let group = Group::create(
            "creator",
            NewGroup {
                name: "Team".into(),
                ..Default::default()
            },
        );
        put(&store, Collection::Groups, &group.id, &group).await.unwrap();

        let manager = MembershipManager::new(Arc::new(store.clone()));
        (store, manager, group)
    }

    async fn stored_user(store: &MemoryStore, id: &str) -> User {
        fetch(store, Collection::Users, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_add_updates_both_sides() {
        let (store, manager, group) = setup(&["creator", "alice"]).await;

        let updated = manager.add_member(&group.id, "alice", "creator").await.unwrap();
        assert_eq!(updated.members, vec!["creator", "alice"]);

        let stored: Group = fetch(&store, Collection::Groups, &group.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.members, vec!["creator", "alice"]);
        assert_eq!(stored_user(&store, "alice").await.groups, vec![group.id.clone()]);
    }

    #[tokio::test]
    async fn test_add_checks_in_order() {
        let (_store, manager, group) = setup(&["creator", "alice"]).await;

        // Missing group beats everything else
        assert!(matches!(
            manager.add_member("nope", "alice", "stranger").await,
            Err(CoreError::NotFound(_))
        ));

        // Unauthorized requester beats a missing target user
        assert!(matches!(
            manager.add_member(&group.id, "ghost", "stranger").await,
            Err(CoreError::Forbidden(_))
        ));

        // Duplicate add
        assert!(matches!(
            manager.add_member(&group.id, "creator", "creator").await,
            Err(CoreError::Conflict(_))
        ));

        assert!(matches!(
            manager.add_member(&group.id, "ghost", "creator").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mirror_failure_is_swallowed() {
        let (store, manager, group) = setup(&["creator", "alice"]).await;
        store.fail_writes_to(Collection::Users).await;

        let updated = manager.add_member(&group.id, "alice", "creator").await.unwrap();
        assert!(updated.is_member("alice"));

        store.clear_faults().await;
        assert!(stored_user(&store, "alice").await.groups.is_empty());

        // The sweep repairs the drift
        let repaired = manager.reconcile_user_groups("alice").await.unwrap();
        assert_eq!(repaired, vec![group.id.clone()]);
        assert_eq!(stored_user(&store, "alice").await.groups, vec![group.id]);
    }

    #[tokio::test]
    async fn test_group_write_failure_is_unavailable() {
        let (store, manager, group) = setup(&["creator", "alice"]).await;
        store.fail_writes_to(Collection::Groups).await;

        assert!(matches!(
            manager.add_member(&group.id, "alice", "creator").await,
            Err(CoreError::Unavailable(_))
        ));
        assert!(stored_user(&store, "alice").await.groups.is_empty());
    }

    #[tokio::test]
    async fn test_remove_rules() {
        let (store, manager, group) = setup(&["creator", "alice", "bob"]).await;
        manager.add_member(&group.id, "alice", "creator").await.unwrap();
        manager.add_member(&group.id, "bob", "alice").await.unwrap();

        assert!(matches!(
            manager.remove_member(&group.id, "creator", "creator").await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            manager.remove_member(&group.id, "bob", "alice").await,
            Err(CoreError::Forbidden(_))
        ));

        let updated = manager.remove_member(&group.id, "bob", "bob").await.unwrap();
        assert_eq!(updated.members, vec!["creator", "alice"]);
        assert!(stored_user(&store, "bob").await.groups.is_empty());

        assert!(matches!(
            manager.remove_member(&group.id, "bob", "creator").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_with_missing_user_record() {
        let (store, manager, mut group) = setup(&["creator"]).await;
        group.members.push("departed".to_string());
        put(&store, Collection::Groups, &group.id, &group).await.unwrap();

        let updated = manager
            .remove_member(&group.id, "departed", "creator")
            .await
            .unwrap();
        assert_eq!(updated.members, vec!["creator"]);
    }

    #[tokio::test]
    async fn test_reconcile_missing_user() {
        let (_store, manager, _group) = setup(&[]).await;
        assert!(matches!(
            manager.reconcile_user_groups("ghost").await,
            Err(CoreError::NotFound(_))
        ));
    }
}
