//! Operator account commands.
//!
//! The only way to create the first master account: the HTTP API requires
//! an existing master to grant that role.

use woo_backoffice_admin::db::{NewUser, UserRepository};
use woo_backoffice_admin::services::AuthError;
use woo_backoffice_admin::services::auth::{
    hash_password, parse_operator_email, validate_password, validate_username,
};
use woo_backoffice_core::UserRole;

use super::{CommandError, connect};

/// Create an operator account with any role.
///
/// # Errors
///
/// Returns `CommandError::Account` for invalid input or a taken username.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
    full_name: Option<&str>,
) -> Result<(), CommandError> {
    let role: UserRole = role.parse().map_err(AuthError::Validation)?;
    let username = validate_username(username)?;
    validate_password(password)?;

    let (config, pool) = connect().await?;
    let email = parse_operator_email(email, config.corporate_email_domain.as_deref())?;
    let hash = hash_password(password)?;

    let user = UserRepository::new(&pool)
        .create(&NewUser {
            username,
            email: &email,
            full_name: full_name.map(str::trim).filter(|n| !n.is_empty()),
            password_hash: &hash,
            role,
        })
        .await
        .map_err(AuthError::from)?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        "operator created"
    );
    Ok(())
}
