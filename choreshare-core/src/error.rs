/// Service error type
///
/// Every service operation returns `ServiceResult<T>`. Callers show users
/// [`ServiceError::public_message`] and log the rest with
/// [`ServiceError::log`].
///
/// | Variant         | Public message                    | Logged at |
/// |-----------------|-----------------------------------|-----------|
/// | `Validation`    | verbatim                          | `debug`   |
/// | `Authorization` | verbatim                          | `warn`    |
/// | `NotFound`      | verbatim                          | `debug`   |
/// | `Storage`       | "An unexpected error occurred"    | `error`   |
/// | `Invariant`     | "An unexpected error occurred"    | `error`   |

use choreshare_shared::auth::AuthzError;
use choreshare_shared::StorageError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::engine::EngineError;

/// Message shown for failures whose detail stays internal
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by the ChoreShare services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected by a business rule
    #[error("{0}")]
    Validation(String),

    /// Actor is not allowed to perform the action
    #[error(transparent)]
    Authorization(#[from] AuthzError),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Storage backend failed
    #[error("Storage failure: {0}")]
    Storage(StorageError),

    /// Group data violates an engine invariant
    #[error("Invariant violation: {0}")]
    Invariant(#[from] EngineError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Message safe to show the acting user
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(msg) | ServiceError::NotFound(msg) => msg.clone(),
            ServiceError::Authorization(e) => e.to_string(),
            ServiceError::Storage(_) | ServiceError::Invariant(_) => UNEXPECTED_ERROR.to_string(),
        }
    }

    /// True for failures the caller could not have prevented
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Storage(_) | ServiceError::Invariant(_))
    }

    /// Logs the full error detail for `operation`
    pub fn log(&self, operation: &str) {
        match self {
            ServiceError::Storage(e) => {
                tracing::error!(operation, error = %e, "Storage failure");
            }
            ServiceError::Invariant(e) => {
                tracing::error!(operation, error = %e, "Invariant violation");
            }
            ServiceError::Authorization(e) => {
                tracing::warn!(operation, error = %e, "Request not authorized");
            }
            ServiceError::Validation(msg) | ServiceError::NotFound(msg) => {
                tracing::debug!(operation, reason = %msg, "Request rejected");
            }
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, .. } => {
                ServiceError::NotFound(format!("{entity} not found"))
            }
            StorageError::Conflict(msg) => ServiceError::Validation(msg),
            // AlreadyAssigned is an internal race, not bad input
            other => ServiceError::Storage(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();
        messages.sort();
        ServiceError::Validation(messages.join("; "))
    }
}
