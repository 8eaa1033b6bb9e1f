/// Monthly dashboard metrics
///
/// Aggregates a clinic's appointments for the current clinic-local month into
/// status counts, confirmation / no-show rates, the revenue lost to
/// no-shows and a per-week breakdown (weeks start on Sunday).

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use crate::clinic_time::ClinicTime;
use crate::models::appointment::AppointmentStatus;

/// Status and time of one appointment, as loaded for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct AppointmentSnapshot {
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

/// One week of the chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyBucket {
    /// Label such as `Sem 1/02`
    pub week: String,
    pub total: u32,
    pub no_show: u32,
    pub confirmed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_appointments: u32,
    pub confirmed: u32,
    /// NOT_CONFIRMED plus still PENDING
    pub not_confirmed: u32,
    pub no_show: u32,
    pub canceled: u32,
    /// Rounded percentage, 0 when there are no appointments
    pub confirmation_rate: u32,
    pub no_show_rate: u32,
    /// `no_show × avg_appointment_value`, rounded to cents
    pub estimated_loss: f64,
    pub weekly_data: Vec<WeeklyBucket>,
}

fn rate(part: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        (f64::from(part) / f64::from(total) * 100.0).round() as u32
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the dashboard for the month `[month_start, month_end]`
///
/// `appointments` should already be limited to the month; anything outside
/// the bounds is ignored anyway.
pub fn compute(
    appointments: &[AppointmentSnapshot],
    avg_appointment_value: f64,
    month_start: DateTime<Utc>,
    month_end: DateTime<Utc>,
    clinic: ClinicTime,
) -> DashboardStats {
    let in_month: Vec<&AppointmentSnapshot> = appointments
        .iter()
        .filter(|a| a.date_time >= month_start && a.date_time <= month_end)
        .collect();

    let count = |status: AppointmentStatus| -> u32 {
        in_month.iter().filter(|a| a.status == status).count() as u32
    };

    let total_appointments = in_month.len() as u32;
    let confirmed = count(AppointmentStatus::Confirmed);
    let not_confirmed = count(AppointmentStatus::NotConfirmed) + count(AppointmentStatus::Pending);
    let no_show = count(AppointmentStatus::NoShow);
    let canceled = count(AppointmentStatus::Canceled);

    DashboardStats {
        total_appointments,
        confirmed,
        not_confirmed,
        no_show,
        canceled,
        confirmation_rate: rate(confirmed, total_appointments),
        no_show_rate: rate(no_show, total_appointments),
        estimated_loss: round_cents(f64::from(no_show) * avg_appointment_value),
        weekly_data: weekly_buckets(&in_month, month_start, month_end, clinic),
    }
}

fn weekly_buckets(
    appointments: &[&AppointmentSnapshot],
    month_start: DateTime<Utc>,
    month_end: DateTime<Utc>,
    clinic: ClinicTime,
) -> Vec<WeeklyBucket> {
    let first_day = clinic.local_date(month_start);
    let mut week_date =
        first_day - Duration::days(i64::from(first_day.weekday().num_days_from_sunday()));

    let mut buckets = Vec::new();
    loop {
        let week_start = clinic.start_of_day(week_date);
        if week_start > month_end {
            break;
        }
        let week_end = week_start + Duration::weeks(1) - Duration::microseconds(1);

        let in_week: Vec<&&AppointmentSnapshot> = appointments
            .iter()
            .filter(|a| a.date_time >= week_start && a.date_time <= week_end)
            .collect();

        buckets.push(WeeklyBucket {
            week: format!("Sem {}/{:02}", week_date.day(), week_date.month()),
            total: in_week.len() as u32,
            no_show: in_week
                .iter()
                .filter(|a| a.status == AppointmentStatus::NoShow)
                .count() as u32,
            confirmed: in_week
                .iter()
                .filter(|a| a.status == AppointmentStatus::Confirmed)
                .count() as u32,
        });

        week_date += Duration::weeks(1);
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn snap(date_time: DateTime<Utc>, status: AppointmentStatus) -> AppointmentSnapshot {
        AppointmentSnapshot { date_time, status }
    }

    fn february() -> (DateTime<Utc>, DateTime<Utc>, ClinicTime) {
        let clinic = ClinicTime::default();
        let (start, end) = clinic.month_bounds(utc(2026, 2, 10, 12));
        (start, end, clinic)
    }

    #[test]
    fn test_empty_month() {
        let (start, end, clinic) = february();
        let stats = compute(&[], 150.0, start, end, clinic);

        assert_eq!(stats.total_appointments, 0);
        assert_eq!(stats.confirmation_rate, 0);
        assert_eq!(stats.no_show_rate, 0);
        assert_eq!(stats.estimated_loss, 0.0);
        // February 2026 starts on a Sunday and spans exactly four weeks
        assert_eq!(stats.weekly_data.len(), 4);
        assert!(stats.weekly_data.iter().all(|w| w.total == 0));
    }

    #[test]
    fn test_counts_and_rates() {
        let (start, end, clinic) = february();
        let appointments = vec![
            snap(utc(2026, 2, 2, 13), AppointmentStatus::Confirmed),
            snap(utc(2026, 2, 3, 13), AppointmentStatus::Confirmed),
            snap(utc(2026, 2, 4, 13), AppointmentStatus::NoShow),
            snap(utc(2026, 2, 10, 13), AppointmentStatus::Pending),
            snap(utc(2026, 2, 11, 13), AppointmentStatus::NotConfirmed),
            snap(utc(2026, 2, 12, 13), AppointmentStatus::Canceled),
        ];

        let stats = compute(&appointments, 33.333, start, end, clinic);

        assert_eq!(stats.total_appointments, 6);
        assert_eq!(stats.confirmed, 2);
        assert_eq!(stats.not_confirmed, 2);
        assert_eq!(stats.no_show, 1);
        assert_eq!(stats.canceled, 1);
        assert_eq!(stats.confirmation_rate, 33);
        assert_eq!(stats.no_show_rate, 17);
        assert_eq!(stats.estimated_loss, 33.33);
    }

    #[test]
    fn test_appointments_outside_month_are_ignored() {
        let (start, end, clinic) = february();
        let appointments = vec![
            // 23:00 on Jan 31st in Brasília
            snap(utc(2026, 2, 1, 2), AppointmentStatus::Confirmed),
            snap(utc(2026, 3, 1, 4), AppointmentStatus::Confirmed),
            snap(utc(2026, 2, 15, 12), AppointmentStatus::Confirmed),
        ];

        let stats = compute(&appointments, 0.0, start, end, clinic);
        assert_eq!(stats.total_appointments, 1);
    }

    #[test]
    fn test_weekly_buckets() {
        let clinic = ClinicTime::default();
        // March 2026 starts on a Sunday too; April starts on a Wednesday
        let (start, end) = clinic.month_bounds(utc(2026, 4, 15, 12));
        let appointments = vec![
            snap(utc(2026, 4, 1, 13), AppointmentStatus::NoShow),
            snap(utc(2026, 4, 4, 13), AppointmentStatus::Confirmed),
            snap(utc(2026, 4, 5, 13), AppointmentStatus::Confirmed),
            snap(utc(2026, 4, 30, 13), AppointmentStatus::Pending),
        ];

        let stats = compute(&appointments, 100.0, start, end, clinic);
        let labels: Vec<&str> = stats.weekly_data.iter().map(|w| w.week.as_str()).collect();

        assert_eq!(labels, vec!["Sem 29/03", "Sem 5/04", "Sem 12/04", "Sem 19/04", "Sem 26/04"]);
        assert_eq!(stats.weekly_data[0].total, 2);
        assert_eq!(stats.weekly_data[0].no_show, 1);
        assert_eq!(stats.weekly_data[0].confirmed, 1);
        assert_eq!(stats.weekly_data[1].confirmed, 1);
        assert_eq!(stats.weekly_data[4].total, 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let (start, end, clinic) = february();
        let json = serde_json::to_value(compute(&[], 0.0, start, end, clinic)).unwrap();

        assert!(json.get("totalAppointments").is_some());
        assert!(json.get("noShowRate").is_some());
        assert!(json.get("estimatedLoss").is_some());
        assert!(json["weeklyData"][0].get("noShow").is_some());
    }
}
