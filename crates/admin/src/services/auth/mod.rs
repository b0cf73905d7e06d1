//! Authentication service.
//!
//! Username and password login for back-office operators, self-service
//! registration, and the validation rules shared with user management.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::MySqlPool;

use woo_backoffice_core::{Email, UserId, UserRole};

use crate::db::users::{NewUser, UserRepository};
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Username length bounds.
const USERNAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=20;

/// Self-service registration form.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub password: &'a str,
    pub password2: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    corporate_domain: Option<&'a str>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, corporate_domain: Option<&'a str>) -> Self {
        Self {
            users: UserRepository::new(pool),
            corporate_domain,
        }
    }

    /// Check a username and password and record the login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
    /// password, `AuthError::Inactive` for a deactivated account.
    #[tracing::instrument(skip(self, password, user_agent), fields(user = %username))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<User, AuthError> {
        let (user, hash) = self
            .users
            .get_with_password(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &hash)?;

        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        self.users.touch_last_login(user.id).await?;
        if let Err(e) = self.users.record_login(user.id, ip_address, user_agent).await {
            tracing::warn!(error = %e, user_id = %user.id, "failed to record login history");
        }

        tracing::info!(user_id = %user.id, "operator logged in");
        Ok(user)
    }

    /// Create a basic `user` account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` or `AuthError::InvalidEmail` for a bad
    /// form and `AuthError::UserAlreadyExists` for a taken username or e-mail.
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        let username = validate_username(form.username)?;
        let email = parse_operator_email(form.email, self.corporate_domain)?;
        validate_password(form.password)?;
        if form.password != form.password2 {
            return Err(AuthError::Validation("passwords do not match".into()));
        }

        let hash = hash_password(form.password)?;
        let user = self
            .users
            .create(&NewUser {
                username,
                email: &email,
                full_name: non_blank(form.full_name),
                password_hash: &hash,
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "operator registered");
        Ok(user)
    }

    /// Change an operator's own password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WrongPassword` if `current` does not match and
    /// `AuthError::Validation` if the new password is rejected.
    pub async fn change_password(
        &self,
        id: UserId,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .password_hash(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &hash).map_err(|_| AuthError::WrongPassword)?;

        validate_password(new)?;
        if new != confirm {
            return Err(AuthError::Validation("passwords do not match".into()));
        }

        self.users.set_password(id, &hash_password(new)?).await?;
        Ok(())
    }

    /// Get an operator by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Trimmed username if it is 3-20 ASCII letters, digits or underscores.
///
/// # Errors
///
/// Returns `AuthError::Validation` otherwise.
pub fn validate_username(raw: &str) -> Result<&str, AuthError> {
    let username = raw.trim();
    if !USERNAME_LENGTH.contains(&username.len())
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::Validation(
            "username must be 3-20 letters, digits or underscores".into(),
        ));
    }
    Ok(username)
}

/// # Errors
///
/// Returns `AuthError::Validation` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Parse an operator e-mail, enforcing the corporate domain when set.
///
/// # Errors
///
/// Returns `AuthError::InvalidEmail` for a malformed address and
/// `AuthError::Validation` for one outside the corporate domain.
pub fn parse_operator_email(raw: &str, corporate_domain: Option<&str>) -> Result<Email, AuthError> {
    let email = Email::parse(raw)?;
    if let Some(domain) = corporate_domain
        && !email.is_in_domain(domain)
    {
        return Err(AuthError::Validation(format!(
            "email must belong to {}",
            domain.trim_start_matches('@')
        )));
    }
    Ok(email)
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Password hashing
// =============================================================================

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::Hash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a PHC hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secreto1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secreto1", &hash).is_ok());
        assert!(matches!(
            verify_password("secreto2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("abcdef").unwrap(), hash_password("abcdef").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" ana_01 ").unwrap(), "ana_01");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
        assert!(validate_username("ana.perez").is_err());
        assert!(validate_username("añaa").is_err());
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_corporate_domain_enforced() {
        assert!(parse_operator_email("ana@tienda.pe", Some("@tienda.pe")).is_ok());
        assert!(matches!(
            parse_operator_email("ana@gmail.com", Some("tienda.pe")),
            Err(AuthError::Validation(_))
        ));
        assert!(parse_operator_email("ana@gmail.com", None).is_ok());
        assert!(matches!(
            parse_operator_email("ana", None),
            Err(AuthError::InvalidEmail(_))
        ));
    }
}
