//! Request extractors.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections (bad syntax, missing fields, wrong content
/// type) answer 400 with the usual `{"success": false, "error": ...}` body.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Login {
        username: String,
        password: String,
    }

    async fn extract(content_type: &str, body: &'static str) -> Result<Login, AppError> {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        AppJson::<Login>::from_request(request, &()).await.map(|AppJson(login)| login)
    }

    #[tokio::test]
    async fn test_valid_body() {
        let login = extract("application/json", r#"{"username":"ana","password":"secret1"}"#)
            .await
            .unwrap();
        assert_eq!(login.username, "ana");
        assert_eq!(login.password, "secret1");
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let err = extract("application/json", r#"{"username":"ana"}"#).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_malformed_and_untyped_bodies_are_bad_requests() {
        let err = extract("application/json", "{not json").await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = extract("text/plain", r#"{"username":"a","password":"b"}"#).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
