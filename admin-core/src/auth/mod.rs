//! Access control
//!
//! Session resolution, role resolution and cached permission checks.

mod access;

pub use access::{AccessControl, EditSection, LOGIN_PAGE, RoleResolution};

use dogbar_client::ClientError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Access control failures
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("No valid session found")]
    NoSession,

    #[error("Session expired")]
    SessionExpired,

    #[error("Authentication failed")]
    NotAuthenticated,

    #[error("You do not have admin access")]
    NotAdmin,

    #[error("Unable to verify admin access")]
    RoleNotFound,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Sign-in failed: {0}")]
    SignIn(#[source] ClientError),
}

impl AccessError {
    /// Errors that end the session and must send the user to the login page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AccessError::NoSession
                | AccessError::SessionExpired
                | AccessError::NotAuthenticated
                | AccessError::NotAdmin
                | AccessError::RoleNotFound
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AccessError::NoSession => ErrorCode::NoSession,
            AccessError::SessionExpired => ErrorCode::SessionExpired,
            AccessError::NotAuthenticated => ErrorCode::NotAuthenticated,
            AccessError::NotAdmin => ErrorCode::AdminRequired,
            AccessError::RoleNotFound => ErrorCode::RoleNotFound,
            AccessError::InvalidEmail(_) => ErrorCode::ValidationFailed,
            AccessError::SignIn(ClientError::Validation(_) | ClientError::Unauthorized) => {
                ErrorCode::InvalidCredentials
            }
            AccessError::SignIn(e) => e.code(),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}
