/// Request extractors that reject with `ApiError`
///
/// axum's own `Json` and `Path` reject with plain-text 4xx bodies. These
/// wrappers turn every rejection into the JSON error envelope instead:
/// malformed or mistyped bodies answer 400 `validation_error`, bad path ids
/// answer 400 `bad_request`.

use crate::error::{ApiError, ValidationErrorDetail};
use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    FromRequest, FromRequestParts,
};

pub const INVALID_BODY_MESSAGE: &str = "Dados inválidos";
pub const INVALID_JSON_MESSAGE: &str = "JSON inválido";
pub const INVALID_ID_MESSAGE: &str = "Identificador inválido";

/// `axum::Json` with `ApiError` rejections
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with `ApiError` rejections
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected request body");

        match rejection {
            JsonRejection::JsonDataError(_) => ApiError::ValidationError(vec![
                ValidationErrorDetail::new("body", INVALID_BODY_MESSAGE),
            ]),
            JsonRejection::JsonSyntaxError(_) => ApiError::ValidationError(vec![
                ValidationErrorDetail::new("body", INVALID_JSON_MESSAGE),
            ]),
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("Content-Type deve ser application/json".to_string())
            }
            _ => ApiError::BadRequest(INVALID_BODY_MESSAGE.to_string()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "Rejected path parameter");
        ApiError::BadRequest(INVALID_ID_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct NewItem {
        #[allow(dead_code)]
        name: String,
        #[allow(dead_code)]
        confirmation_hours_before: Option<i32>,
    }

    async fn echo(ApiJson(_body): ApiJson<NewItem>) -> StatusCode {
        StatusCode::OK
    }

    async fn by_id(ApiPath(_id): ApiPath<Uuid>) -> StatusCode {
        StatusCode::OK
    }

    fn router() -> Router {
        Router::new()
            .route("/items", post(echo))
            .route("/items/:id", get(by_id))
    }

    async fn call(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/items")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_field_is_validation_error() {
        let (status, json) = call(post_json(r#"{"confirmationHoursBefore": 24}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], INVALID_BODY_MESSAGE);
        assert_eq!(json["details"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_wrong_type_is_validation_error() {
        let (status, json) =
            call(post_json(r#"{"name": "Maria", "confirmationHoursBefore": "24"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let (status, json) = call(post_json(r#"{"name": "#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], INVALID_JSON_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/items")
            .body(Body::from(r#"{"name": "Maria"}"#))
            .unwrap();
        let (status, json) = call(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_invalid_path_id() {
        let request = Request::builder()
            .uri("/items/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, json) = call(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], INVALID_ID_MESSAGE);
    }
}
