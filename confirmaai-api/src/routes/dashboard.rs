/// Dashboard endpoint
///
/// `GET /api/dashboard`: confirmation and no-show figures for the current
/// month in clinic time, with a weekly breakdown.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, UNAUTHORIZED_MESSAGE},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::Utc;
use confirmaai_shared::{
    auth::middleware::AuthContext,
    dashboard::{self, DashboardStats},
    models::{appointment::Appointment, user::User},
};

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<DashboardStats>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()))?;

    let (month_start, month_end) = state.clinic.month_bounds(Utc::now());
    let snapshots =
        Appointment::snapshots_in_range(&state.db, auth.user_id, month_start, month_end).await?;

    let stats = dashboard::compute(
        &snapshots,
        user.avg_appointment_value,
        month_start,
        month_end,
        state.clinic,
    );

    Ok(ApiResponse::data(stats))
}
