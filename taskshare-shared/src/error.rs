/// Core error kinds
///
/// Every operation in this crate reports failures as a [`CoreError`]. The
/// variants keep "you don't have access" (`Forbidden`), "that isn't valid data"
/// (`InvalidEntity`) and "that doesn't exist" (`NotFound`) apart so callers can
/// render accurate feedback. Mapping to transport status codes is the caller's
/// job.

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result alias used by the services
pub type CoreResult<T> = Result<T, CoreError>;

/// Error kinds surfaced by the access-control and consistency core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The addressed entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The requester's role does not permit the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested state already holds (duplicate member, taken username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The entity would violate one of its invariants
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Username/password pair did not match a user
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The storage collaborator failed
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Anything else that went wrong locally (hashing, encoding)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::Conflict(_) => "conflict",
            CoreError::InvalidEntity(_) => "invalid_entity",
            CoreError::InvalidCredentials => "invalid_credentials",
            CoreError::Unavailable(_) => "unavailable",
            CoreError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => {
                CoreError::NotFound(format!("{} {}", collection.entity_name(), id))
            }
            StoreError::Encoding(e) => CoreError::Internal(format!("Encoding failed: {}", e)),
            other => CoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        CoreError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        CoreError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{}: {}", field, reason)
            })
            .collect();
        fields.sort();
        CoreError::InvalidEntity(fields.join("; "))
    }
}
