//! Core types for the back-office.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{PageRequest, Pagination};
pub use status::*;
