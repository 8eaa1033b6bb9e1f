/// Clinic settings endpoints
///
/// - `GET /api/settings`: current settings, created with defaults if missing
/// - `PUT /api/settings`: partial update

use super::validate_all;
use crate::{
    app::AppState,
    error::{ApiResult, ValidationErrorDetail},
    extract::ApiJson,
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use confirmaai_shared::{
    auth::middleware::AuthContext,
    models::settings::{Settings, UpdateSettings},
};
use serde::Deserialize;
use validator::Validate;

const MESSAGE_MIN_CHARS: usize = 10;
const MESSAGE_MAX_CHARS: usize = 1000;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 1, max = 72, message = "Confirmação deve ser enviada entre 1 e 72 horas antes"))]
    pub confirmation_hours_before: Option<i32>,

    #[validate(range(min = 1, max = 24, message = "Lembrete deve ser enviado entre 1 e 24 horas antes"))]
    pub reminder_hours_before: Option<i32>,

    pub confirmation_message: Option<String>,

    pub reminder_message: Option<String>,
}

/// Template length check, counted in characters rather than bytes
fn template_error(field: &str, template: Option<&str>) -> Option<ValidationErrorDetail> {
    let chars = template?.chars().count();

    if chars < MESSAGE_MIN_CHARS {
        Some(ValidationErrorDetail::new(field, "Mensagem deve ter pelo menos 10 caracteres"))
    } else if chars > MESSAGE_MAX_CHARS {
        Some(ValidationErrorDetail::new(field, "Mensagem deve ter no máximo 1000 caracteres"))
    } else {
        None
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Settings>> {
    let settings = Settings::get_or_create(&state.db, auth.user_id).await?;

    Ok(ApiResponse::data(settings))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> ApiResult<ApiResponse<Settings>> {
    validate_all(
        &req,
        template_error("confirmationMessage", req.confirmation_message.as_deref())
            .into_iter()
            .chain(template_error("reminderMessage", req.reminder_message.as_deref())),
    )?;

    let settings = Settings::update(
        &state.db,
        auth.user_id,
        UpdateSettings {
            confirmation_hours_before: req.confirmation_hours_before,
            reminder_hours_before: req.reminder_hours_before,
            confirmation_message: req.confirmation_message,
            reminder_message: req.reminder_message,
        },
    )
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        confirmation_hours_before = settings.confirmation_hours_before,
        reminder_hours_before = settings.reminder_hours_before,
        "Settings updated"
    );

    Ok(ApiResponse::with_message(settings, "Configurações atualizadas com sucesso"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_hours_ranges() {
        let ok = UpdateSettingsRequest {
            confirmation_hours_before: Some(72),
            reminder_hours_before: Some(1),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_far = UpdateSettingsRequest {
            confirmation_hours_before: Some(73),
            reminder_hours_before: Some(0),
            ..Default::default()
        };
        let errors = too_far.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn test_template_length_counts_characters() {
        assert!(template_error("reminderMessage", None).is_none());
        assert!(template_error("reminderMessage", Some("Olá {nome}!")).is_none());
        assert_eq!(
            template_error("reminderMessage", Some("curta")).unwrap().message,
            "Mensagem deve ter pelo menos 10 caracteres"
        );
        // 1000 two-byte characters stay within the limit
        assert!(template_error("reminderMessage", Some(&"ç".repeat(1000))).is_none());
        assert!(template_error("reminderMessage", Some(&"a".repeat(1001))).is_some());
    }

    #[test]
    fn test_validate_all_combines_derived_and_template_errors() {
        let req = UpdateSettingsRequest {
            reminder_hours_before: Some(30),
            confirmation_message: Some("oi".to_string()),
            ..Default::default()
        };

        let result = validate_all(
            &req,
            template_error("confirmationMessage", req.confirmation_message.as_deref()),
        );
        match result {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["confirmationMessage", "reminderHoursBefore"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
