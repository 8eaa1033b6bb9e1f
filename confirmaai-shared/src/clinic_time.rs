/// Clinic-local time
///
/// Timestamps are stored and compared in UTC, but patients read dates in the
/// clinic's wall-clock time and "this month" / "this day" are clinic-local
/// notions. [`ClinicTime`] carries the clinic's fixed UTC offset
/// (Brasília, UTC−3, unless configured otherwise) and converts between the two.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use confirmaai_shared::clinic_time::ClinicTime;
///
/// let clinic = ClinicTime::default();
/// let (start, _end) = clinic.day_bounds(NaiveDate::from_ymd_opt(2026, 2, 17).unwrap());
/// assert_eq!(start, Utc.with_ymd_and_hms(2026, 2, 17, 3, 0, 0).unwrap());
/// ```

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeZone, Utc,
};

/// Default clinic offset: Brasília time
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Fixed clinic timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClinicTime {
    offset: FixedOffset,
}

impl Default for ClinicTime {
    fn default() -> Self {
        Self::from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or(Self { offset: Utc.fix() })
    }
}

impl ClinicTime {
    /// Builds a clinic timezone from a whole-hour UTC offset
    ///
    /// Returns `None` when the offset is outside −23..=23.
    pub fn from_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours.checked_mul(3600)?).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Converts a UTC instant to clinic wall-clock time
    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    /// Clinic-local calendar date of a UTC instant
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.to_local(at).date_naive()
    }

    /// UTC instant of a clinic-local wall-clock time
    pub fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }

    /// UTC instant of local midnight at the start of `date`
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_to_utc(date.and_time(NaiveTime::MIN))
    }

    /// Inclusive bounds of a clinic-local day
    ///
    /// The end is the last microsecond of the day, the finest precision
    /// PostgreSQL stores.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of_day(date);
        (start, start + Duration::days(1) - Duration::microseconds(1))
    }

    /// Inclusive bounds of the clinic-local month containing `at`
    pub fn month_bounds(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(at);
        let first = date - Duration::days(i64::from(date.day0()));
        let next_first = first
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);

        (
            self.start_of_day(first),
            self.start_of_day(next_first) - Duration::microseconds(1),
        )
    }
}
