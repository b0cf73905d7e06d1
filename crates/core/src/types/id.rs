//! Newtype IDs for type-safe entity references.
//!
//! WordPress and WooCommerce key every table with `BIGINT UNSIGNED`, so the
//! `define_id!` macro wraps a `u64`. The auxiliary tables owned by this
//! service use the same column type to keep joins and bindings uniform.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `u64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_u64()`
/// - `From<u64>` and `Into<u64>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `mysql` feature)
///
/// # Example
///
/// ```rust
/// # use woo_backoffice_core::define_id;
/// define_id!(CouponId);
/// define_id!(RefundId);
///
/// let coupon_id = CouponId::new(1);
/// let refund_id = RefundId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: CouponId = refund_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create a new ID from a u64 value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Get the underlying u64 value.
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "mysql")]
        impl ::sqlx::Type<::sqlx::MySql> for $name {
            fn type_info() -> ::sqlx::mysql::MySqlTypeInfo {
                <u64 as ::sqlx::Type<::sqlx::MySql>>::type_info()
            }

            fn compatible(ty: &::sqlx::mysql::MySqlTypeInfo) -> bool {
                <u64 as ::sqlx::Type<::sqlx::MySql>>::compatible(ty)
            }
        }

        #[cfg(feature = "mysql")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::MySql> for $name {
            fn decode(
                value: ::sqlx::mysql::MySqlValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <u64 as ::sqlx::Decode<::sqlx::MySql>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "mysql")]
        impl ::sqlx::Encode<'_, ::sqlx::MySql> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::std::vec::Vec<u8>,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <u64 as ::sqlx::Encode<::sqlx::MySql>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// WordPress / WooCommerce entities
define_id!(PostId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(OrderItemId);

// Auxiliary tables owned by the back-office
define_id!(UserId);
define_id!(ExpenseId);
define_id!(ExchangeRateId);
define_id!(StockHistoryId);
define_id!(PriceHistoryId);
define_id!(OutboxId);

impl ProductId {
    /// View this product as the WordPress post that stores it.
    #[must_use]
    pub const fn as_post(self) -> PostId {
        PostId::new(self.0)
    }
}

impl OrderId {
    /// The legacy `shop_order` post that shadows this order shares its ID.
    #[must_use]
    pub const fn as_post(self) -> PostId {
        PostId::new(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_and_display() {
        let id = OrderId::new(50_001);
        assert_eq!(id.as_u64(), 50_001);
        assert_eq!(u64::from(id), 50_001);
        assert_eq!(id.to_string(), "50001");
    }

    #[test]
    fn test_order_shadow_post_shares_id() {
        let id = OrderId::new(42);
        assert_eq!(id.as_post(), PostId::new(42));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&ProductId::new(7)).unwrap_or_default();
        assert_eq!(json, "7");
    }
}
