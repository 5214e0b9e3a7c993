/// Group creation and lookup
///
/// Membership changes after creation go through
/// [`crate::services::membership::MembershipManager`].

use crate::auth::authorization::{require_group_membership, resolve_group_role};
use crate::error::CoreResult;
use crate::models::group::{Group, GroupDetails, NewGroup, MEMBERS_FIELD};
use crate::models::user::{User, UserProfile};
use crate::services::load;
use crate::services::membership::MembershipManager;
use crate::store::{decode_all, fetch, put, Collection, DocumentStore};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn DocumentStore>,
    membership: MembershipManager,
}

impl GroupService {
    pub fn new(store: Arc<dyn DocumentStore>, membership: MembershipManager) -> Self {
        Self { store, membership }
    }

    /// Creates a group with `subject` as creator
    ///
    /// Every requested member must exist. The members' user mirrors are
    /// updated best-effort after the group is stored.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::InvalidEntity`] if the name or description is rejected
    /// - [`crate::CoreError::NotFound`] if a requested member does not exist
    pub async fn create_group(&self, subject: &str, input: NewGroup) -> CoreResult<Group> {
        input.validate()?;

        let group = Group::create(subject, input);
        group.validate()?;

        for member in group.members.iter().filter(|m| *m != subject) {
            load::<User>(self.store.as_ref(), Collection::Users, member).await?;
        }

        put(self.store.as_ref(), Collection::Groups, &group.id, &group).await?;

        info!(
            group_id = %group.id,
            creator_id = %subject,
            members = group.members.len(),
            "Group created"
        );

        for member in &group.members {
            self.membership.mirror_add(member, &group.id).await;
        }

        Ok(group)
    }

    /// A group and its member profiles; members only
    ///
    /// Profiles are fetched concurrently. A member whose record is missing or
    /// unreadable is left out of the list rather than failing the lookup.
    pub async fn get_group(&self, subject: &str, group_id: &str) -> CoreResult<GroupDetails> {
        let group: Group = load(self.store.as_ref(), Collection::Groups, group_id).await?;
        require_group_membership(resolve_group_role(&group, subject))?;

        let store = self.store.as_ref();
        let lookups = group.members.iter().map(|member| async move {
            match fetch::<User>(store, Collection::Users, member).await {
                Ok(Some(user)) => Some(UserProfile::from(user)),
                Ok(None) => {
                    warn!(group_id = %group_id, user_id = %member, "Group member has no user record");
                    None
                }
                Err(e) => {
                    warn!(group_id = %group_id, user_id = %member, error = %e, "Failed to load group member");
                    None
                }
            }
        });

        let members = join_all(lookups).await.into_iter().flatten().collect();

        Ok(GroupDetails { group, members })
    }

    /// Every group listing `subject` as a member
    pub async fn list_user_groups(&self, subject: &str) -> CoreResult<Vec<Group>> {
        let documents = self
            .store
            .query_array_contains(
                Collection::Groups,
                MEMBERS_FIELD,
                &Value::String(subject.to_string()),
            )
            .await?;

        Ok(decode_all(Collection::Groups, documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::CoreError;
    use chrono::Utc;

    async fn setup(users: &[&str]) -> (MemoryStore, GroupService) {
        let store = MemoryStore::new();
        for id in users {
            let user = User {
                id: id.to_string(),
                username: id.to_string(),
                email: format!("{}@example.com", id),
                role: "user".to_string(),
                password_hash: "$argon2id$test".to_string(),
                created_at: Utc::now(),
                groups: vec![],
            };
            put(&store, Collection::Users, id, &user).await.unwrap();
        }

        let shared: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let service = GroupService::new(shared.clone(), MembershipManager::new(shared));
        (store, service)
    }

    fn new_group(members: &[&str]) -> NewGroup {
        NewGroup {
            name: "Team".into(),
            description: "Weekly chores".into(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_mirrors_every_member() {
        let (store, groups) = setup(&["creator", "alice"]).await;
        let group = groups
            .create_group("creator", new_group(&["alice"]))
            .await
            .unwrap();
        assert_eq!(group.members, vec!["alice", "creator"]);

        for id in ["creator", "alice"] {
            let user: User = load(&store, Collection::Users, id).await.unwrap();
            assert_eq!(user.groups, vec![group.id.clone()]);
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_member() {
        let (store, groups) = setup(&["creator"]).await;
        assert!(matches!(
            groups.create_group("creator", new_group(&["ghost"])).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(store.is_empty(Collection::Groups).await);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_store, groups) = setup(&["creator"]).await;
        let mut input = new_group(&[]);
        input.name = String::new();

        assert!(matches!(
            groups.create_group("creator", input).await,
            Err(CoreError::InvalidEntity(_))
        ));
    }

    #[tokio::test]
    async fn test_get_group_is_member_only() {
        let (store, groups) = setup(&["creator", "alice"]).await;
        let mut group = groups
            .create_group("creator", new_group(&["alice"]))
            .await
            .unwrap();

        // A dangling member id is skipped, not fatal
        group.members.push("departed".into());
        put(&store, Collection::Groups, &group.id, &group).await.unwrap();

        let details = groups.get_group("alice", &group.id).await.unwrap();
        let names: Vec<&str> = details.members.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "creator"]);

        assert!(matches!(
            groups.get_group("stranger", &group.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            groups.get_group("alice", "missing").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_user_groups() {
        let (_store, groups) = setup(&["creator", "alice"]).await;
        let first = groups.create_group("creator", new_group(&["alice"])).await.unwrap();
        groups.create_group("creator", new_group(&[])).await.unwrap();

        let listed = groups.list_user_groups("alice").await.unwrap();
        assert_eq!(listed, vec![first]);
        assert_eq!(groups.list_user_groups("creator").await.unwrap().len(), 2);
    }
}
