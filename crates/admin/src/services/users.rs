//! Operator account management for administrators.

use sqlx::MySqlPool;

use woo_backoffice_core::{PageRequest, UserId, UserRole};

use crate::db::users::{NewUser, UserFilter, UserRepository, UserStats};
use crate::models::{CurrentUser, LoginRecord, User};
use crate::services::auth::{
    AuthError, hash_password, non_blank, parse_operator_email, validate_password,
    validate_username,
};

/// Logins shown on the user detail view.
const RECENT_LOGINS: u32 = 10;

/// Account creation form.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub password: &'a str,
    pub role: UserRole,
}

/// Profile changes; absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub email: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub role: Option<UserRole>,
}

/// User management service.
pub struct UserService<'a> {
    users: UserRepository<'a>,
    corporate_domain: Option<&'a str>,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(pool: &'a MySqlPool, corporate_domain: Option<&'a str>) -> Self {
        Self {
            users: UserRepository::new(pool),
            corporate_domain,
        }
    }

    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), AuthError> {
        Ok(self.users.list(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn stats(&self) -> Result<UserStats, AuthError> {
        Ok(self.users.stats().await?)
    }

    /// A user with their most recent logins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn detail(&self, id: UserId) -> Result<(User, Vec<LoginRecord>), AuthError> {
        let user = self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        let logins = self.users.recent_logins(id, RECENT_LOGINS).await?;
        Ok((user, logins))
    }

    /// Create an account with any role. Only a master may create a master.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotPermitted`, a validation error, or
    /// `AuthError::UserAlreadyExists`.
    #[tracing::instrument(skip(self, actor, account), fields(user = %account.username))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        account: &NewAccount<'_>,
    ) -> Result<User, AuthError> {
        ensure_may_grant(actor, account.role)?;
        let username = validate_username(account.username)?;
        let email = parse_operator_email(account.email, self.corporate_domain)?;
        validate_password(account.password)?;

        let hash = hash_password(account.password)?;
        let user = self
            .users
            .create(&NewUser {
                username,
                email: &email,
                full_name: non_blank(account.full_name),
                password_hash: &hash,
                role: account.role,
            })
            .await?;

        tracing::info!(user_id = %user.id, created_by = %actor.username, "operator created");
        Ok(user)
    }

    /// Update e-mail, full name and role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if operators would drop their own
    /// admin rights, `AuthError::NotPermitted` if a non-master grants master.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: UserId,
        changes: &ProfileChanges<'_>,
    ) -> Result<User, AuthError> {
        let user = self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)?;

        let email = match changes.email {
            Some(raw) => parse_operator_email(raw, self.corporate_domain)?,
            None => user.email.clone(),
        };
        let full_name = match changes.full_name {
            Some(name) => non_blank(Some(name)),
            None => user.full_name.as_deref(),
        };
        let role = changes.role.unwrap_or(user.role);

        if role != user.role {
            ensure_may_grant(actor, role)?;
            if actor.id == id && !role.is_admin() {
                return Err(AuthError::Validation(
                    "you cannot remove your own administrator rights".into(),
                ));
            }
        }

        Ok(self.users.update_profile(id, &email, full_name, role).await?)
    }

    /// Flip the active flag; returns the new state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` when operators target themselves.
    pub async fn toggle_status(&self, actor: &CurrentUser, id: UserId) -> Result<bool, AuthError> {
        if actor.id == id {
            return Err(AuthError::Validation(
                "you cannot deactivate your own account".into(),
            ));
        }
        let user = self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        let active = !user.is_active;
        self.users.set_active(id, active).await?;
        Ok(active)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the password is too short.
    pub async fn reset_password(&self, id: UserId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        self.users.set_password(id, &hash_password(password)?).await?;
        Ok(())
    }

    /// Delete an account and its login history; returns the username.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` when operators target themselves.
    pub async fn delete(&self, actor: &CurrentUser, id: UserId) -> Result<String, AuthError> {
        if actor.id == id {
            return Err(AuthError::Validation(
                "you cannot delete your own account".into(),
            ));
        }
        let user = self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)?;
        self.users.delete(id).await?;
        tracing::info!(user_id = %id, deleted_by = %actor.username, "operator deleted");
        Ok(user.username)
    }
}

fn ensure_may_grant(actor: &CurrentUser, role: UserRole) -> Result<(), AuthError> {
    if role.is_master() && !actor.role.is_master() {
        return Err(AuthError::NotPermitted(
            "only a master can grant the master role".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            username: "jefa".into(),
            full_name: None,
            role,
        }
    }

    #[test]
    fn test_only_master_grants_master() {
        assert!(ensure_may_grant(&actor(UserRole::Master), UserRole::Master).is_ok());
        assert!(matches!(
            ensure_may_grant(&actor(UserRole::Admin), UserRole::Master),
            Err(AuthError::NotPermitted(_))
        ));
        assert!(ensure_may_grant(&actor(UserRole::Admin), UserRole::Advisor).is_ok());
    }
}
