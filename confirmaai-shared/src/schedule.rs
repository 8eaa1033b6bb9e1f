/// Send-window rules used by the notification scheduler
///
/// A message for an appointment may go out once "now" has entered the
/// window that opens `hours_before` ahead of the appointment and closes at
/// the appointment itself. The scheduler runs every half hour, so the
/// window is checked on each run rather than hitting an exact instant.

use chrono::{DateTime, Duration, Utc};

/// True iff `appointment_at − hours_before ≤ now ≤ appointment_at`
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use confirmaai_shared::schedule::send_window_open;
///
/// let now = Utc::now();
/// assert!(send_window_open(now, now + Duration::hours(23), 24));
/// assert!(!send_window_open(now, now + Duration::hours(25), 24));
/// ```
pub fn send_window_open(now: DateTime<Utc>, appointment_at: DateTime<Utc>, hours_before: i32) -> bool {
    let opens_at = appointment_at - Duration::hours(i64::from(hours_before));
    opens_at <= now && now <= appointment_at
}

/// An appointment still PENDING after this point is a no-show
pub fn is_past(now: DateTime<Utc>, appointment_at: DateTime<Utc>) -> bool {
    appointment_at < now
}
