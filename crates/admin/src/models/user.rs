//! Operator account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use woo_backoffice_core::{Email, UserId, UserRole};

/// A back-office operator.
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// One successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRecord {
    pub login_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
