//! Authentication extractors.
//!
//! Every rejection is a JSON body in the API's error shape, so the frontend
//! can handle a lapsed session like any other failure.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in operator.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
///     Json(user)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires role admin or master.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires role master.
pub struct RequireMaster(pub CurrentUser);

/// Extractor that optionally gets the current operator.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Why an authenticated extractor refused the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session or no operator in it.
    Unauthorized,
    /// Logged in, but the role is too low.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "insufficient permissions"),
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn require_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    let user = session_user(parts)
        .await
        .ok_or(AuthRejection::Unauthorized)?;
    set_sentry_user(user.id.as_u64(), &user.username);
    Ok(user)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_user(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if !user.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireMaster
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = require_user(parts).await?;
        if !user.role.is_master() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the operator in the session after login.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be reached.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejections_are_json() {
        let response = AuthRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));

        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
