/// Appointment endpoints
///
/// - `GET /api/appointments?date=&startDate=&endDate=&status=&patientId=`
/// - `POST /api/appointments`
/// - `GET /api/appointments/:id`
/// - `PUT /api/appointments/:id`
/// - `DELETE /api/appointments/:id`
///
/// Responses embed the patient summary and the message history.

use super::{nullable, patients::PATIENT_NOT_FOUND_MESSAGE, validate_all};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
};
use axum::{
    extract::{Query, State},
    response::Response,
    Extension,
};
use chrono::{DateTime, Utc};
use confirmaai_shared::{
    auth::middleware::AuthContext,
    clinic_time::ClinicTime,
    models::{
        appointment::{
            Appointment, AppointmentDetails, AppointmentFilter, AppointmentStatus,
            CreateAppointment, UpdateAppointment,
        },
        patient::Patient,
    },
    validation::{parse_date, parse_date_time, parse_range_bound, INVALID_DATE_TIME_MESSAGE},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const APPOINTMENT_NOT_FOUND_MESSAGE: &str = "Agendamento não encontrado";
const SLOT_TAKEN_MESSAGE: &str = "Já existe um agendamento neste horário";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAppointmentsQuery {
    /// Clinic-local day, `YYYY-MM-DD`; wins over the range
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1, message = "Paciente é obrigatório"))]
    pub patient_id: String,

    /// RFC 3339
    pub date_time: String,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    #[validate(length(min = 1, message = "Paciente é obrigatório"))]
    pub patient_id: Option<String>,

    pub date_time: Option<String>,

    pub status: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

fn not_found() -> ApiError {
    ApiError::NotFound(APPOINTMENT_NOT_FOUND_MESSAGE.to_string())
}

fn date_time_field(value: &str) -> Result<DateTime<Utc>, ValidationErrorDetail> {
    parse_date_time(value).ok_or_else(|| ValidationErrorDetail::new("dateTime", INVALID_DATE_TIME_MESSAGE))
}

fn status_field(value: &str) -> Result<AppointmentStatus, ValidationErrorDetail> {
    value
        .parse()
        .map_err(|_| ValidationErrorDetail::new("status", "Status inválido"))
}

/// Translates query parameters into a repository filter
///
/// Unknown `status` values are ignored. A patient id that isn't a UUID
/// can't match anything and is rejected.
pub fn build_filter(query: &ListAppointmentsQuery, clinic: ClinicTime) -> ApiResult<AppointmentFilter> {
    let mut filter = AppointmentFilter::default();

    if let Some(date) = query.date.as_deref().filter(|d| !d.trim().is_empty()) {
        let day = parse_date(date)
            .ok_or_else(|| ApiError::invalid_field("date", "Data inválida"))?;
        let (start, end) = clinic.day_bounds(day);
        filter.from = Some(start);
        filter.to = Some(end);
    } else {
        if let Some(start) = query.start_date.as_deref().filter(|d| !d.trim().is_empty()) {
            filter.from = Some(
                parse_range_bound(start, clinic, false)
                    .ok_or_else(|| ApiError::invalid_field("startDate", "Data inválida"))?,
            );
        }
        if let Some(end) = query.end_date.as_deref().filter(|d| !d.trim().is_empty()) {
            filter.to = Some(
                parse_range_bound(end, clinic, true)
                    .ok_or_else(|| ApiError::invalid_field("endDate", "Data inválida"))?,
            );
        }
    }

    filter.status = query.status.as_deref().and_then(|s| s.parse().ok());

    if let Some(patient_id) = query.patient_id.as_deref().filter(|p| !p.is_empty()) {
        filter.patient_id = Some(
            patient_id
                .parse()
                .map_err(|_| ApiError::invalid_field("patientId", "Paciente inválido"))?,
        );
    }

    Ok(filter)
}

/// Resolves a patient id from a request body to one of the caller's patients
fn patient_not_found() -> ApiError {
    ApiError::BadRequest(PATIENT_NOT_FOUND_MESSAGE.to_string())
}

/// An unparsable patient id answers like an unknown one
fn parse_patient_id(raw: &str) -> ApiResult<Uuid> {
    raw.trim().parse().map_err(|_| patient_not_found())
}

async fn ensure_owned_patient(state: &AppState, user_id: Uuid, patient_id: Uuid) -> ApiResult<()> {
    if !Patient::belongs_to_user(&state.db, patient_id, user_id).await? {
        return Err(patient_not_found());
    }
    Ok(())
}

async fn owned_patient_id(state: &AppState, user_id: Uuid, raw: &str) -> ApiResult<Uuid> {
    let patient_id = parse_patient_id(raw)?;
    ensure_owned_patient(state, user_id, patient_id).await?;
    Ok(patient_id)
}

async fn details(state: &AppState, appointment: Appointment) -> ApiResult<AppointmentDetails> {
    Appointment::with_details(&state.db, vec![appointment])
        .await?
        .into_iter()
        .next()
        .ok_or_else(not_found)
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListAppointmentsQuery>,
) -> ApiResult<ApiResponse<Vec<AppointmentDetails>>> {
    let filter = build_filter(&query, state.clinic)?;

    let appointments = Appointment::list_by_user(&state.db, auth.user_id, &filter).await?;
    let appointments = Appointment::with_details(&state.db, appointments).await?;

    Ok(ApiResponse::data(appointments))
}

/// Books an appointment
///
/// # Errors
///
/// - `400 Bad Request`: invalid body, unknown patient, or the slot is taken
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<Response> {
    let date_time = date_time_field(&req.date_time);
    validate_all(&req, date_time.clone().err())?;
    let date_time = date_time.map_err(|e| ApiError::ValidationError(vec![e]))?;

    let patient_id = owned_patient_id(&state, auth.user_id, &req.patient_id).await?;

    if Appointment::has_conflict(&state.db, auth.user_id, date_time, None).await? {
        return Err(ApiError::BadRequest(SLOT_TAKEN_MESSAGE.to_string()));
    }

    let appointment = Appointment::create(
        &state.db,
        CreateAppointment {
            user_id: auth.user_id,
            patient_id,
            date_time,
            notes: req.notes,
        },
    )
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        appointment_id = %appointment.id,
        date_time = %appointment.date_time,
        "Appointment created"
    );

    let created = details(&state, appointment).await?;

    Ok(ApiResponse::with_message(created, "Agendamento criado com sucesso").created())
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<AppointmentDetails>> {
    let appointment = Appointment::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::data(details(&state, appointment).await?))
}

/// Partial update
///
/// Patient ownership is re-checked only when the patient changes, and the
/// slot only when the time changes.
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAppointmentRequest>,
) -> ApiResult<ApiResponse<AppointmentDetails>> {
    let existing = Appointment::find_by_id_and_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let date_time = req.date_time.as_deref().map(date_time_field).transpose();
    let status = req.status.as_deref().map(status_field).transpose();
    validate_all(
        &req,
        date_time.clone().err().into_iter().chain(status.clone().err()),
    )?;
    let date_time = date_time.map_err(|e| ApiError::ValidationError(vec![e]))?;
    let status = status.map_err(|e| ApiError::ValidationError(vec![e]))?;

    let mut patient_id = None;
    if let Some(raw) = req.patient_id.as_deref() {
        let requested = parse_patient_id(raw)?;
        if requested != existing.patient_id {
            ensure_owned_patient(&state, auth.user_id, requested).await?;
            patient_id = Some(requested);
        }
    }

    if let Some(date_time) = date_time.filter(|dt| *dt != existing.date_time) {
        if Appointment::has_conflict(&state.db, auth.user_id, date_time, Some(id)).await? {
            return Err(ApiError::BadRequest(SLOT_TAKEN_MESSAGE.to_string()));
        }
    }

    let updated = Appointment::update(
        &state.db,
        id,
        auth.user_id,
        UpdateAppointment {
            patient_id,
            date_time,
            status,
            notes: req.notes,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    tracing::info!(
        user_id = %auth.user_id,
        appointment_id = %id,
        status = %updated.status,
        "Appointment updated"
    );

    Ok(ApiResponse::with_message(
        details(&state, updated).await?,
        "Agendamento atualizado com sucesso",
    ))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Option<()>>> {
    if !Appointment::delete(&state.db, id, auth.user_id).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = %auth.user_id, appointment_id = %id, "Appointment deleted");

    Ok(ApiResponse::with_message(None, "Agendamento excluído com sucesso"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clinic() -> ClinicTime {
        ClinicTime::from_hours(-3).unwrap()
    }

    #[test]
    fn test_date_takes_precedence_over_range() {
        let query = ListAppointmentsQuery {
            date: Some("2025-02-17".to_string()),
            start_date: Some("2025-01-01".to_string()),
            ..Default::default()
        };

        let filter = build_filter(&query, clinic()).unwrap();
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2025, 2, 17, 3, 0, 0).unwrap()));
        assert!(filter.to.unwrap() > Utc.with_ymd_and_hms(2025, 2, 18, 2, 59, 59).unwrap());
        assert!(filter.to.unwrap() < Utc.with_ymd_and_hms(2025, 2, 18, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_range_accepts_timestamps_and_dates() {
        let query = ListAppointmentsQuery {
            start_date: Some("2025-02-01T10:00:00Z".to_string()),
            end_date: Some("2025-02-28".to_string()),
            ..Default::default()
        };

        let filter = build_filter(&query, clinic()).unwrap();
        assert_eq!(filter.from, Some(Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()));
        assert!(filter.to.unwrap() > Utc.with_ymd_and_hms(2025, 3, 1, 2, 59, 59).unwrap());
    }

    #[test]
    fn test_unknown_status_is_ignored() {
        let query = ListAppointmentsQuery {
            status: Some("WHATEVER".to_string()),
            ..Default::default()
        };
        assert_eq!(build_filter(&query, clinic()).unwrap().status, None);

        let query = ListAppointmentsQuery {
            status: Some("NO_SHOW".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_filter(&query, clinic()).unwrap().status,
            Some(AppointmentStatus::NoShow)
        );
    }

    #[test]
    fn test_parse_patient_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_patient_id(&format!(" {} ", id)).unwrap(), id);
        assert!(matches!(
            parse_patient_id("not-a-uuid"),
            Err(ApiError::BadRequest(msg)) if msg == PATIENT_NOT_FOUND_MESSAGE
        ));
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let query = ListAppointmentsQuery {
            date: Some("17/02/2025".to_string()),
            ..Default::default()
        };
        assert!(build_filter(&query, clinic()).is_err());

        let query = ListAppointmentsQuery {
            patient_id: Some("not-a-uuid".to_string()),
            ..Default::default()
        };
        assert!(build_filter(&query, clinic()).is_err());
    }

    #[test]
    fn test_body_field_parsers() {
        assert!(date_time_field("2025-02-17T14:30:00-03:00").is_ok());
        assert_eq!(
            date_time_field("amanhã").unwrap_err().message,
            INVALID_DATE_TIME_MESSAGE
        );
        assert_eq!(status_field("CONFIRMED").unwrap(), AppointmentStatus::Confirmed);
        assert!(status_field("confirmed").is_err());
    }
}
