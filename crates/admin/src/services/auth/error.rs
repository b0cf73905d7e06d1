//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and account management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but is deactivated.
    #[error("account is inactive")]
    Inactive,

    /// The current password given for a change did not match.
    #[error("current password is incorrect")]
    WrongPassword,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] woo_backoffice_core::EmailError),

    /// A field failed validation.
    #[error("{0}")]
    Validation(String),

    /// The operator may not perform this change.
    #[error("{0}")]
    NotPermitted(String),

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Username or e-mail already in use.
    #[error("username or email already exists")]
    UserAlreadyExists,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::UserNotFound,
            RepositoryError::Conflict(_) => Self::UserAlreadyExists,
            other => Self::Repository(other),
        }
    }
}
