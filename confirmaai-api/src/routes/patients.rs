/// Patient endpoints
///
/// - `GET /api/patients?search=&page=&limit=`
/// - `POST /api/patients`
/// - `GET /api/patients/:id`
/// - `PUT /api/patients/:id`
/// - `DELETE /api/patients/:id`
///
/// Every query is scoped to the authenticated clinic user; another
/// clinic's patient answers 404.

use super::{nullable, trimmed, trimmed_opt, validate_all};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{ApiJson, ApiPath},
    response::{ApiResponse, PageMeta},
};
use axum::{
    extract::{Query, State},
    response::Response,
    Extension,
};
use chrono::Utc;
use confirmaai_shared::{
    auth::middleware::AuthContext,
    models::patient::{CreatePatient, Patient, PatientFilter, PatientWithCount, UpdatePatient},
    validation::{is_valid_phone, INVALID_PHONE_MESSAGE},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

pub const PATIENT_NOT_FOUND_MESSAGE: &str = "Paciente não encontrado";

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Raw query string; numbers are parsed leniently
#[derive(Debug, Default, Deserialize)]
pub struct ListPatientsQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Page and page size for a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

impl Paging {
    /// `None` without `page`: the caller wants every result
    ///
    /// Unparseable numbers fall back to the defaults; `page` is at least 1
    /// and `limit` is clamped to 1..=100.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Option<Self> {
        let page = page?;
        let page = page.trim().parse::<i64>().unwrap_or(1).max(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        Some(Self { page, limit })
    }

    /// Saturates instead of overflowing on absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatientRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Nome deve ter pelo menos 3 caracteres"))]
    pub name: String,

    pub phone: String,

    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,

    pub notes: Option<String>,
}

/// Partial update; `email` and `notes` accept `null` to clear them
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePatientRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, message = "Nome deve ter pelo menos 3 caracteres"))]
    pub name: Option<String>,

    pub phone: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

fn phone_error(phone: Option<&str>) -> Option<ValidationErrorDetail> {
    match phone {
        Some(phone) if !is_valid_phone(phone) => {
            Some(ValidationErrorDetail::new("phone", INVALID_PHONE_MESSAGE))
        }
        _ => None,
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound(PATIENT_NOT_FOUND_MESSAGE.to_string())
}

/// Lists the caller's patients ordered by name
///
/// Paginated (with `meta`) only when `page` is given.
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListPatientsQuery>,
) -> ApiResult<ApiResponse<Vec<PatientWithCount>>> {
    let paging = Paging::from_query(query.page.as_deref(), query.limit.as_deref());

    let mut filter = PatientFilter {
        search: query.search,
        ..Default::default()
    };

    let Some(paging) = paging else {
        let patients = Patient::list_by_user(&state.db, auth.user_id, &filter).await?;
        return Ok(ApiResponse::data(patients));
    };

    filter.limit = Some(paging.limit);
    filter.offset = Some(paging.offset());

    let (patients, total) = tokio::try_join!(
        Patient::list_by_user(&state.db, auth.user_id, &filter),
        Patient::count_by_user(&state.db, auth.user_id, &filter),
    )?;

    Ok(ApiResponse::paginated(
        patients,
        PageMeta::new(total, paging.page, paging.limit),
    ))
}

pub async fn create_patient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreatePatientRequest>,
) -> ApiResult<Response> {
    validate_all(&req, phone_error(Some(&req.phone)))?;

    let patient = Patient::create(
        &state.db,
        CreatePatient {
            user_id: auth.user_id,
            name: req.name,
            phone: req.phone,
            email: req.email,
            notes: req.notes,
        },
    )
    .await?;

    tracing::info!(user_id = %auth.user_id, patient_id = %patient.id, "Patient created");

    let created = PatientWithCount {
        patient,
        appointment_count: 0,
    };

    Ok(ApiResponse::with_message(created, "Paciente criado com sucesso").created())
}

pub async fn get_patient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<PatientWithCount>> {
    let patient = Patient::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::data(patient))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdatePatientRequest>,
) -> ApiResult<ApiResponse<PatientWithCount>> {
    if !Patient::belongs_to_user(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }

    let email_error = match &req.email {
        Some(Some(email)) if !email.validate_email() => {
            Some(ValidationErrorDetail::new("email", "Email inválido"))
        }
        _ => None,
    };
    validate_all(&req, phone_error(req.phone.as_deref()).into_iter().chain(email_error))?;

    Patient::update(
        &state.db,
        id,
        auth.user_id,
        UpdatePatient {
            name: req.name,
            phone: req.phone,
            email: req.email,
            notes: req.notes,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    let patient = Patient::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::with_message(patient, "Paciente atualizado com sucesso"))
}

/// Deletes a patient and, by cascade, their appointments
///
/// # Errors
///
/// - `400 Bad Request`: the patient still has an upcoming active appointment
/// - `404 Not Found`: no such patient for this clinic
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Option<()>>> {
    if !Patient::belongs_to_user(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }

    if Patient::has_active_future_appointments(&state.db, id, Utc::now()).await? {
        return Err(ApiError::BadRequest(
            "Não é possível excluir paciente com agendamentos futuros".to_string(),
        ));
    }

    if !Patient::delete(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = %auth.user_id, patient_id = %id, "Patient deleted");

    Ok(ApiResponse::with_message(None, "Paciente excluído com sucesso"))
}
