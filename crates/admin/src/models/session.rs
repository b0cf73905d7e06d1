//! Session-related types for operator authentication.

use serde::{Deserialize, Serialize};

use woo_backoffice_core::{UserId, UserRole};

use super::user::User;

/// Session-stored operator identity.
///
/// Minimal data stored in the session to identify the logged-in operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

impl CurrentUser {
    /// Name shown in audit columns (`changed_by`, `_created_by`).
    #[must_use]
    pub fn audit_name(&self) -> &str {
        &self.username
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in operator.
    pub const CURRENT_USER: &str = "current_user";
}
