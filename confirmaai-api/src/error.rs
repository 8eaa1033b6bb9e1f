/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`; `ApiError` turns into the JSON
/// error envelope with the matching HTTP status. Messages are user-facing
/// and written in Portuguese.
///
/// # Example
///
/// ```no_run
/// use confirmaai_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Paciente não encontrado".to_string()));
///     }
///     Ok(Json(json!({ "data": {} })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use confirmaai_shared::auth::{jwt::JwtError, middleware::AuthError, password::PasswordError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

pub const UNAUTHORIZED_MESSAGE: &str = "Não autorizado";
pub const FORBIDDEN_MESSAGE: &str = "Acesso negado";
pub const NOT_FOUND_MESSAGE: &str = "Recurso não encontrado";
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do servidor";
pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email já cadastrado";

/// Unique index on `LOWER(users.email)`
const USERS_EMAIL_INDEX: &str = "idx_users_email_lower";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Request body or query failed validation (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500); the message is logged, never returned
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation (camelCase, as sent by the client)
    pub field: String,

    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::ValidationError(errors) => {
                let message = errors
                    .first()
                    .map(|detail| detail.message.clone())
                    .unwrap_or_else(|| "Dados inválidos".to_string());
                ("validation_error", message, Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                ("internal_error", INTERNAL_ERROR_MESSAGE.to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// `clinic_name` -> `clinicName`, matching the JSON the client sent
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Flattens `validator` failures into details, sorted by field
pub fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Campo inválido: {}", field));
                ValidationErrorDetail::new(camel_case(&field), message)
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(validation_details(&errors))
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.constraint() == Some(USERS_EMAIL_INDEX) {
                    return ApiError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string());
                }
                if db_err.is_unique_violation() {
                    return ApiError::Conflict("Registro duplicado".to_string());
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                tracing::debug!(reason = %msg, "Rejected credentials");
                ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            JwtError::Expired => ApiError::Unauthorized("Token expirado".to_string()),
            _ => {
                tracing::debug!(error = %err, "Rejected token");
                ApiError::Unauthorized("Token inválido".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Nome deve ter pelo menos 3 caracteres"))]
        name: String,

        #[validate(email(message = "Email inválido"))]
        email: String,
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Paciente não encontrado".to_string());
        assert_eq!(err.to_string(), "Not found: Paciente não encontrado");
    }

    #[test]
    fn test_validation_errors_are_sorted_by_field() {
        let sample = Sample {
            name: "Al".to_string(),
            email: "not-an-email".to_string(),
        };

        let err: ApiError = sample.validate().unwrap_err().into();
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(
                    details,
                    vec![
                        ValidationErrorDetail::new("email", "Email inválido"),
                        ValidationErrorDetail::new("name", "Nome deve ter pelo menos 3 caracteres"),
                    ]
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_response_uses_first_message() {
        let err = ApiError::ValidationError(vec![
            ValidationErrorDetail::new("email", "Email inválido"),
            ValidationErrorDetail::new("name", "Nome deve ter pelo menos 3 caracteres"),
        ]);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Email inválido");
        assert_eq!(json["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_internal_error_is_masked() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], INTERNAL_ERROR_MESSAGE);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_auth_errors_map_to_unauthorized() {
        let err: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::InvalidToken("bad signature".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: ApiError = JwtError::Expired.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err: ApiError = JwtError::CreateError("boom".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_camel_case_field_names() {
        assert_eq!(camel_case("avg_appointment_value"), "avgAppointmentValue");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
