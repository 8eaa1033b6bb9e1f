/// Authentication endpoints
///
/// - `POST /api/auth/register`: create a clinic account
/// - `POST /api/auth/login`: exchange credentials for tokens
/// - `POST /api/auth/refresh`: exchange a refresh token for an access token
/// - `GET /api/auth/me`: current user (JWT required)

use super::trimmed;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, DUPLICATE_EMAIL_MESSAGE},
    extract::ApiJson,
    response::ApiResponse,
};
use axum::{extract::State, response::Response, Extension};
use confirmaai_shared::{
    auth::{
        jwt::{self, TokenPair},
        middleware::AuthContext,
        password,
    },
    models::user::{normalize_email, CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS_MESSAGE: &str = "Email ou senha inválidos";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Nome deve ter pelo menos 3 caracteres"))]
    pub name: String,

    #[validate(email(message = "Email inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String,

    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Nome da clínica deve ter pelo menos 3 caracteres"))]
    pub clinic_name: String,

    #[validate(range(min = 0.0, message = "Valor deve ser positivo"))]
    pub avg_appointment_value: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Email inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "Senha deve ter pelo menos 6 caracteres"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// User plus a fresh token pair, returned by register and login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Registers a clinic user with default settings
///
/// ```text
/// POST /api/auth/register
///
/// {
///   "name": "Dra. Ana Costa",
///   "email": "ana@clinica.com.br",
///   "password": "segredo",
///   "clinicName": "Clínica Sorriso",
///   "avgAppointmentValue": 180
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let email = normalize_email(&req.email);
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    // The unique index still guards against a concurrent registration
    let (user, _settings) = User::create_with_default_settings(
        &state.db,
        CreateUser {
            name: req.name,
            email,
            password_hash,
            clinic_name: req.clinic_name,
            avg_appointment_value: req.avg_appointment_value.unwrap_or(0.0),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok(ApiResponse::with_message(SessionResponse { user, tokens }, "Usuário criado com sucesso").created())
}

/// Authenticates with email and password
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `401 Unauthorized`: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()));
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok(ApiResponse::data(SessionResponse { user, tokens }))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(ApiResponse::data(RefreshResponse { access_token }))
}

/// Returns the authenticated user
///
/// A valid token for a deleted account is answered with 401.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(crate::error::UNAUTHORIZED_MESSAGE.to_string()))?;

    Ok(ApiResponse::data(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana Costa",
            "email": "ana@clinica.com.br",
            "password": "segredo",
            "clinicName": "Clínica Sorriso"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.avg_appointment_value.is_none());

        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "Ana Costa",
            "email": "ana@clinica.com.br",
            "password": "123",
            "clinicName": "Clínica Sorriso",
            "avgAppointmentValue": -5.0
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("avg_appointment_value"));
    }

    #[test]
    fn test_register_names_trimmed_before_validation() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "name": "   ",
            "email": "ana@clinica.com.br",
            "password": "segredo",
            "clinicName": " ab "
        }))
        .unwrap();
        assert_eq!(req.clinic_name, "ab");

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("clinic_name"));
    }

    #[test]
    fn test_session_response_flattens_tokens() {
        let response = SessionResponse {
            user: User {
                id: uuid::Uuid::new_v4(),
                name: "Ana".to_string(),
                email: "ana@clinica.com.br".to_string(),
                password_hash: "hash".to_string(),
                clinic_name: "Clínica".to_string(),
                avg_appointment_value: 0.0,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            tokens: TokenPair {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "access");
        assert_eq!(json["refreshToken"], "refresh");
        assert!(json["user"].get("passwordHash").is_none());
    }
}
