//! WooCommerce REST API integration.
//!
//! The back-office writes catalog and order rows straight to the database.
//! The REST API is only used where WooCommerce must run its own code, which
//! today means the order e-mail trigger.
//!
//! Authentication is HTTP Basic with the store's consumer key and secret.

mod client;
pub mod email_trigger;
mod error;

pub use client::WooCommerceClient;
pub use email_trigger::{
    EmailJob, EmailTrigger, OrderTransport, ReplaySummary, RetryPolicy, StatusUpdate,
    TriggerReport,
};
pub use error::WooCommerceError;
