//! Operator account repository (`woo_users`, `woo_user_login_history`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::MySqlPool;

use woo_backoffice_core::{Email, PageRequest, UserId, UserRole};

use super::{Filter, RepositoryError};
use crate::models::{LoginRecord, User};

const USER_COLUMNS: &str =
    "id, username, email, full_name, role, is_active, created_at, updated_at, last_login";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: u64,
    username: String,
    email: String,
    full_name: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row.role.parse::<UserRole>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            full_name: row.full_name,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login: row.last_login,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoginRow {
    login_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl From<LoginRow> for LoginRecord {
    fn from(row: LoginRow) -> Self {
        Self {
            login_at: row.login_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        }
    }
}

// =============================================================================
// Inputs and aggregates
// =============================================================================

/// Data for a new operator. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a Email,
    pub full_name: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: UserRole,
}

/// Filters for the user list.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Matches username, e-mail or full name.
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Account counts by role and state.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_role: BTreeMap<String, i64>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for operator accounts.
pub struct UserRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM woo_users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by username, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM woo_users WHERE username = ?")
                .bind(username)
                .fetch_optional(self.pool)
                .await?;
        let Some((hash,)) = row else {
            return Ok(None);
        };

        let user: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM woo_users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        match user {
            Some(row) => Ok(Some((row.try_into()?, hash))),
            None => Ok(None),
        }
    }

    /// Password hash of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM woo_users WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(hash)
    }

    /// List users, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, u64), RepositoryError> {
        let mut conditions = Filter::new();
        if let Some(term) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            conditions.search(&["username", "email", "full_name"], term);
        }
        if let Some(role) = filter.role {
            conditions.eq_text("role", role.as_str());
        }
        if let Some(active) = filter.is_active {
            conditions.eq_int("is_active", i64::from(active));
        }
        let clause = conditions.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM woo_users{clause}");
        let total: i64 = conditions
            .bind_scalar(sqlx::query_scalar(&count_sql))
            .fetch_one(self.pool)
            .await?;

        let list_sql = format!(
            "SELECT {USER_COLUMNS} FROM woo_users{clause} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows: Vec<UserRow> = conditions
            .bind_as(sqlx::query_as(&list_sql))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, u64::try_from(total).unwrap_or(0)))
    }

    /// Counts by role and active state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<UserStats, RepositoryError> {
        let rows: Vec<(String, bool, i64)> = sqlx::query_as(
            "SELECT role, is_active, COUNT(*) FROM woo_users GROUP BY role, is_active",
        )
        .fetch_all(self.pool)
        .await?;

        let mut stats = UserStats {
            total: 0,
            active: 0,
            inactive: 0,
            by_role: UserRole::ALL
                .iter()
                .map(|r| (r.as_str().to_string(), 0))
                .collect(),
        };
        for (role, active, count) in rows {
            stats.total += count;
            if active {
                stats.active += count;
            } else {
                stats.inactive += count;
            }
            *stats.by_role.entry(role).or_insert(0) += count;
        }
        Ok(stats)
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username or e-mail is taken.
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO woo_users (username, email, full_name, password_hash, role, is_active) \
             VALUES (?, ?, ?, ?, ?, TRUE)",
        )
        .bind(user.username)
        .bind(user.email.as_str())
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "username or email"))?;

        self.get_by_id(UserId::new(result.last_insert_id()))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Update e-mail, full name and role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the e-mail is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        email: &Email,
        full_name: Option<&str>,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        sqlx::query("UPDATE woo_users SET email = ?, full_name = ?, role = ? WHERE id = ?")
            .bind(email.as_str())
            .bind(full_name)
            .bind(role.as_str())
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE woo_users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE woo_users SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE woo_users SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Append a login-history row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_login(
        &self,
        id: UserId,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let user_agent = user_agent.map(|ua| truncate(ua, 255));
        sqlx::query(
            "INSERT INTO woo_user_login_history (user_id, ip_address, user_agent) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(ip_address)
        .bind(user_agent)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Most recent logins, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_logins(
        &self,
        id: UserId,
        limit: u32,
    ) -> Result<Vec<LoginRecord>, RepositoryError> {
        let rows: Vec<LoginRow> = sqlx::query_as(
            "SELECT login_at, ip_address, user_agent FROM woo_user_login_history \
             WHERE user_id = ? ORDER BY login_at DESC, id DESC LIMIT ?",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a user and their login history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM woo_user_login_history WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM woo_users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}

/// Cut a string to at most `max` bytes on a char boundary.
fn truncate(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.get(..end).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("ñandú", 3), "ña");
        assert_eq!(truncate("abcdef", 3), "abc");
    }
}
