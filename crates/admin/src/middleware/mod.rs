//! HTTP middleware for the back-office.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, one transaction per request)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions with MySQL store)
//!
//! Authorization is per handler through the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, RequireMaster, clear_current_user,
    set_current_user,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
