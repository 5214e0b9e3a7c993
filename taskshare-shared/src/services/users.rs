/// User accounts
///
/// Registration, credential checks and profile lookups. Token issuance lives
/// in the HTTP layer, which owns the signing secret.

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{CoreError, CoreResult};
use crate::models::new_id;
use crate::models::user::{NewUser, User, UserProfile, EMAIL_FIELD, USERNAME_FIELD};
use crate::services::load;
use crate::store::{decode_all, put, Collection, DocumentStore};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Creates an account
    ///
    /// Username uniqueness is a pre-check query, not a constraint: two
    /// concurrent registrations of the same name can both succeed.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidEntity`] if a field or the password is rejected
    /// - [`CoreError::Conflict`] if the username is taken
    pub async fn register(&self, input: NewUser) -> CoreResult<UserProfile> {
        input.validate()?;
        validate_password_strength(&input.password)
            .map_err(|reason| CoreError::InvalidEntity(format!("password: {}", reason)))?;

        if self.find_by_username(&input.username).await?.is_some() {
            return Err(CoreError::Conflict(format!(
                "Username '{}' already exists",
                input.username
            )));
        }

        let user = User {
            id: new_id(),
            role: input.effective_role(),
            password_hash: hash_password(&input.password)?,
            username: input.username,
            email: input.email,
            created_at: Utc::now(),
            groups: Vec::new(),
        };

        put(self.store.as_ref(), Collection::Users, &user.id, &user).await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(UserProfile::from(user))
    }

    /// Checks a username/password pair
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> CoreResult<User> {
        let Some(user) = self.find_by_username(username).await? else {
            debug!(username = %username, "Login for unknown username");
            return Err(CoreError::InvalidCredentials);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => {
                debug!(user_id = %user.id, "Login with wrong password");
                Err(CoreError::InvalidCredentials)
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
                Err(CoreError::InvalidCredentials)
            }
        }
    }

    /// Public profile of a user
    pub async fn get_user(&self, user_id: &str) -> CoreResult<UserProfile> {
        let user: User = load(self.store.as_ref(), Collection::Users, user_id).await?;
        Ok(UserProfile::from(user))
    }

    /// Profiles whose email matches exactly; empty when none do
    pub async fn search_users_by_email(&self, email: &str) -> CoreResult<Vec<UserProfile>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CoreError::InvalidEntity("email is required".into()));
        }

        let documents = self
            .store
            .query_equals(
                Collection::Users,
                EMAIL_FIELD,
                &Value::String(email.to_string()),
            )
            .await?;

        Ok(decode_all::<User>(Collection::Users, documents)
            .into_iter()
            .map(UserProfile::from)
            .collect())
    }

    async fn find_by_username(&self, username: &str) -> CoreResult<Option<User>> {
        let documents = self
            .store
            .query_equals(
                Collection::Users,
                USERNAME_FIELD,
                &Value::String(username.to_string()),
            )
            .await?;

        Ok(decode_all::<User>(Collection::Users, documents)
            .into_iter()
            .next())
    }
}
