/// Group model
///
/// `members` is the authoritative membership list. The creator is always a
/// member and can never be removed; groups are never deleted.

use crate::error::{CoreError, CoreResult};
use crate::models::user::UserProfile;
use crate::models::{dedup_ids, new_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Document field holding the member list
pub const MEMBERS_FIELD: &str = "members";

/// Maximum group name length, in characters
pub const MAX_NAME_LEN: u64 = 100;

/// Maximum group description length, in characters
pub const MAX_DESCRIPTION_LEN: u64 = 500;

/// Stored collaboration group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Group creation input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewGroup {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,

    /// Initial members besides the creator
    #[serde(default)]
    pub members: Vec<String>,
}

/// A group together with the profiles of its members
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetails {
    pub group: Group,
    pub members: Vec<UserProfile>,
}

impl Group {
    /// Builds a group created by `creator`
    ///
    /// The requested members are de-duplicated and the creator is appended
    /// when not already listed.
    pub fn create(creator: &str, input: NewGroup) -> Group {
        let now = Utc::now();
        let members = dedup_ids(
            input
                .members
                .into_iter()
                .filter(|m| !m.is_empty())
                .chain(std::iter::once(creator.to_string())),
        );

        Group {
            id: new_id(),
            creator_id: creator.to_string(),
            name: input.name,
            description: input.description,
            members,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if `user_id` is in the member list
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Checks the group invariants
    pub fn validate(&self) -> CoreResult<()> {
        if self.creator_id.is_empty() {
            return Err(CoreError::InvalidEntity("group has no creator".into()));
        }

        let name_len = self.name.chars().count() as u64;
        if self.name.is_empty() || name_len > MAX_NAME_LEN {
            return Err(CoreError::InvalidEntity(format!(
                "name must be between 1 and {} characters",
                MAX_NAME_LEN
            )));
        }
        if self.description.chars().count() as u64 > MAX_DESCRIPTION_LEN {
            return Err(CoreError::InvalidEntity(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        if !self.is_member(&self.creator_id) {
            return Err(CoreError::InvalidEntity(
                "the creator must be a member".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_group(members: &[&str]) -> NewGroup {
        NewGroup {
            name: "Home".to_string(),
            description: "Chores".to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_creator_is_appended_once() {
        let group = Group::create("u-1", new_group(&["u-2", "u-3", "u-2"]));
        assert_eq!(group.members, vec!["u-2", "u-3", "u-1"]);
        assert_eq!(group.creator_id, "u-1");

        let group = Group::create("u-1", new_group(&["u-1", "u-2"]));
        assert_eq!(group.members, vec!["u-1", "u-2"]);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_creator_alone() {
        let group = Group::create("u-1", new_group(&[]));
        assert_eq!(group.members, vec!["u-1"]);
        assert!(group.is_member("u-1"));
        assert!(!group.is_member("u-2"));
    }

    #[test]
    fn test_validate_lengths() {
        let mut group = Group::create("u-1", new_group(&[]));
        group.name = "x".repeat(101);
        assert!(group.validate().is_err());

        group.name = "x".repeat(100);
        assert!(group.validate().is_ok());

        group.description = "d".repeat(501);
        assert!(group.validate().is_err());
    }

    #[test]
    fn test_validate_name_presence() {
        let mut group = Group::create("u-1", new_group(&[]));
        group.name = String::new();
        assert!(matches!(group.validate(), Err(CoreError::InvalidEntity(_))));

        group.name = " ".to_string();
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_validate_creator_membership() {
        let mut group = Group::create("u-1", new_group(&["u-2"]));
        group.members.retain(|m| m != "u-1");
        assert!(matches!(group.validate(), Err(CoreError::InvalidEntity(_))));
    }

    #[test]
    fn test_new_group_request_validation() {
        let mut input = new_group(&[]);
        assert!(input.validate().is_ok());

        input.name = String::new();
        assert!(input.validate().is_err());
    }
}
