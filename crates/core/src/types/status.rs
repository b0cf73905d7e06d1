//! Status and role enums.
//!
//! WordPress stores all of these as plain strings, so each enum has an exact
//! `as_str()` form plus a lenient `FromStr`. Repositories decode the string
//! column and convert, reporting corrupt values instead of panicking.

use serde::{Deserialize, Serialize};

/// Operator role governing authorization.
///
/// Ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Owner account; the only role that can see expenses and create masters.
    Master,
    /// Store administrator; manages users, bulk prices and exchange rates.
    Admin,
    /// Sales advisor; creates orders and updates stock.
    Advisor,
    /// Basic operator.
    #[default]
    User,
}

impl UserRole {
    /// Every role, most privileged first.
    pub const ALL: [Self; 4] = [Self::Master, Self::Admin, Self::Advisor, Self::User];

    /// Column value for this role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Admin => "admin",
            Self::Advisor => "advisor",
            Self::User => "user",
        }
    }

    /// Admins and masters pass admin-only checks.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Master | Self::Admin)
    }

    #[must_use]
    pub const fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(Self::Master),
            "admin" => Ok(Self::Admin),
            "advisor" => Ok(Self::Advisor),
            "user" => Ok(Self::User),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// WooCommerce order status.
///
/// The database form carries the `wc-` prefix (`wc-processing`); the REST API
/// form does not (`processing`). `trash` has no prefix in either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
    CheckoutDraft,
    Trash,
}

impl OrderStatus {
    /// Value stored in `wc_orders.status` and `posts.post_status`.
    #[must_use]
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            Self::Pending => "wc-pending",
            Self::Processing => "wc-processing",
            Self::OnHold => "wc-on-hold",
            Self::Completed => "wc-completed",
            Self::Cancelled => "wc-cancelled",
            Self::Refunded => "wc-refunded",
            Self::Failed => "wc-failed",
            Self::CheckoutDraft => "wc-checkout-draft",
            Self::Trash => "trash",
        }
    }

    /// Value used by the WooCommerce REST API.
    #[must_use]
    pub const fn as_api_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
            Self::CheckoutDraft => "checkout-draft",
            Self::Trash => "trash",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    /// Accepts both the `wc-` prefixed and the bare form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.trim().trim_start_matches("wc-");
        match bare {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "on-hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            "failed" => Ok(Self::Failed),
            "checkout-draft" => Ok(Self::CheckoutDraft),
            "trash" => Ok(Self::Trash),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Product `_stock_status` meta value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
            Self::OnBackorder => "onbackorder",
        }
    }

    /// Status implied by a managed stock quantity.
    #[must_use]
    pub const fn for_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            Self::InStock
        } else {
            Self::OutOfStock
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "instock" => Ok(Self::InStock),
            "outofstock" => Ok(Self::OutOfStock),
            "onbackorder" => Ok(Self::OnBackorder),
            _ => Err(format!("invalid stock status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert_eq!(" ADMIN ".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_privileges() {
        assert!(UserRole::Master.is_admin());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Advisor.is_admin());
        assert!(!UserRole::User.is_admin());
        assert!(UserRole::Master.is_master());
        assert!(!UserRole::Admin.is_master());
    }

    #[test]
    fn test_order_status_both_forms() {
        assert_eq!(
            "wc-processing".parse::<OrderStatus>().unwrap(),
            OrderStatus::Processing
        );
        assert_eq!(
            "on-hold".parse::<OrderStatus>().unwrap(),
            OrderStatus::OnHold
        );
        assert_eq!(OrderStatus::Pending.as_db_str(), "wc-pending");
        assert_eq!(OrderStatus::Trash.as_db_str(), "trash");
        assert_eq!(OrderStatus::Processing.to_string(), "processing");
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_stock_status_for_quantity() {
        assert_eq!(StockStatus::for_quantity(3), StockStatus::InStock);
        assert_eq!(StockStatus::for_quantity(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::for_quantity(-2), StockStatus::OutOfStock);
        assert_eq!(StockStatus::OutOfStock.as_str(), "outofstock");
    }
}
