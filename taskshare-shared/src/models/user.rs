/// User model
///
/// A user document carries the account credentials and the user-side mirror
/// of group membership (`groups`). The mirror is a denormalized copy of the
/// authoritative `Group.members` lists and is maintained best-effort by
/// [`crate::services::membership::MembershipManager`].
///
/// # Document shape
///
/// ```json
/// {
///   "id": "3f0c...",
///   "username": "ana_92",
///   "email": "ana@example.com",
///   "role": "user",
///   "password_hash": "$argon2id$...",
///   "created_at": "2025-01-01T00:00:00Z",
///   "groups": ["9a1e..."]
/// }
/// ```
///
/// The password hash is never sent to clients; responses use [`UserProfile`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Role tag assigned when none is given
pub const DEFAULT_ROLE: &str = "user";

/// Document field holding the username (used by uniqueness and login lookups)
pub const USERNAME_FIELD: &str = "username";

/// Document field holding the email address
pub const EMAIL_FIELD: &str = "email";

/// Document field holding the user-side group mirror
pub const GROUPS_FIELD: &str = "groups";

/// Stored user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID
    pub id: String,

    /// Unique login name
    pub username: String,

    /// Contact address, searchable
    pub email: String,

    /// Free-form role tag
    #[serde(default = "default_role")]
    pub role: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// Groups this user belongs to, mirrored from the group side
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Client-facing view of a user, without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        let role = if user.role.trim().is_empty() {
            default_role()
        } else {
            user.role.clone()
        };

        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile::from(&user)
    }
}

/// Registration input
///
/// The plaintext password is hashed before anything is stored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    /// 3 to 20 characters of letters, digits, `_` or `-`
    #[validate(
        length(min = 3, max = 20, message = "Username must be between 3 and 20 characters"),
        custom(function = "validate_username_charset")
    )]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    /// Optional role tag; blank means [`DEFAULT_ROLE`]
    #[serde(default)]
    pub role: Option<String>,
}

impl NewUser {
    /// Role tag to store
    pub fn effective_role(&self) -> String {
        self.role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_role)
    }
}

/// Accepts only ASCII letters, digits, underscores and hyphens
pub fn validate_username_charset(username: &str) -> Result<(), ValidationError> {
    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if allowed {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_charset");
        err.message =
            Some("Username may only contain letters, digits, underscores and hyphens".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "Secr3t!pass".to_string(),
            role: None,
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(new_user("ana_92", "ana@example.com").validate().is_ok());
        assert!(new_user("a-b", "ana@example.com").validate().is_ok());
        assert!(new_user("ab", "ana@example.com").validate().is_err());
        assert!(new_user("a".repeat(21).as_str(), "ana@example.com")
            .validate()
            .is_err());
        assert!(new_user("ana maria", "ana@example.com").validate().is_err());
        assert!(new_user("ana!", "ana@example.com").validate().is_err());
    }

    #[test]
    fn test_email_rule() {
        let errors = new_user("ana_92", "not-an-email").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_effective_role() {
        let mut user = new_user("ana_92", "ana@example.com");
        assert_eq!(user.effective_role(), "user");

        user.role = Some("   ".to_string());
        assert_eq!(user.effective_role(), "user");

        user.role = Some("admin".to_string());
        assert_eq!(user.effective_role(), "admin");
    }

    #[test]
    fn test_stored_document_defaults() {
        // Older documents carry neither role nor groups
        let user: User = serde_json::from_value(json!({
            "id": "u-1",
            "username": "ana_92",
            "email": "ana@example.com",
            "password_hash": "$argon2id$x",
            "created_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(user.role, "user");
        assert!(user.groups.is_empty());
    }

    #[test]
    fn test_profile_hides_hash_and_defaults_role() {
        let user = User {
            id: "u-1".to_string(),
            username: "ana_92".to_string(),
            email: "ana@example.com".to_string(),
            role: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            groups: vec![],
        };

        let profile = UserProfile::from(&user);
        assert_eq!(profile.role, "user");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
