/// Field checks that `validator` derives don't cover
///
/// Brazilian mobile/landline numbers are stored in E.164 form (`+55`, area
/// code, 8 or 9 digit number). Appointment times travel as RFC 3339
/// strings; list filters also accept plain `YYYY-MM-DD` dates.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::clinic_time::ClinicTime;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+55[0-9]{10,11}$").expect("phone pattern is a valid regex")
});

pub const INVALID_PHONE_MESSAGE: &str = "Telefone inválido. Use formato +55XXXXXXXXXXX";
pub const INVALID_DATE_TIME_MESSAGE: &str = "Data/hora inválida";

/// `+55` followed by 10 or 11 digits
///
/// # Example
///
/// ```
/// use confirmaai_shared::validation::is_valid_phone;
///
/// assert!(is_valid_phone("+5511999998888"));
/// assert!(!is_valid_phone("11999998888"));
/// ```
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Parses an RFC 3339 timestamp into UTC
pub fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Range-filter bound: a full timestamp, or a clinic-local date
///
/// A bare date means the start of that day for a lower bound and the end of
/// that day for an upper bound.
pub fn parse_range_bound(value: &str, clinic: ClinicTime, upper: bool) -> Option<DateTime<Utc>> {
    if let Some(at) = parse_date_time(value) {
        return Some(at);
    }

    let (start, end) = clinic.day_bounds(parse_date(value)?);
    Some(if upper { end } else { start })
}
