use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can stop the controller loop.
///
/// Nothing that happens inside a session is an error: bad keys re-prompt, wrong codes show an
/// error screen, expiry becomes an outcome. What remains is losing a collaborator.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The input device went away; the controller has nothing left to react to.
    #[error("input device disconnected")]
    InputClosed,
    /// Settings could not be read or written.
    #[error("settings storage failed")]
    Storage(#[from] StorageError),
    /// Settings were rejected by validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl From<ValidationErrors> for ControllerError {
    fn from(err: ValidationErrors) -> Self {
        ControllerError::InvalidSettings(format!("validation failed: {}", err))
    }
}
