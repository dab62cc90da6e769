use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Converts between UTC storage timestamps and the clinic's configured local
/// offset, and computes the calendar-day windows behind the "today" vs
/// "upcoming" appointment buckets.
#[derive(Debug, Clone, Copy)]
pub struct ClinicClock {
    offset: FixedOffset,
}

impl ClinicClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Interprets a clinic-local wall-clock datetime as a UTC instant.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        let utc_naive = local - Duration::seconds(self.offset.local_minus_utc() as i64);
        Utc.from_utc_datetime(&utc_naive)
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        utc.with_timezone(&self.offset)
    }

    /// The clinic-local calendar date at the given instant.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.to_local(at).date_naive()
    }

    /// Half-open UTC window `[local midnight, next local midnight)` for a
    /// clinic-local calendar date.
    pub fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_utc(date.and_hms_opt(0, 0, 0).unwrap_or_default());
        (start, start + Duration::days(1))
    }

    /// The window covering "today" as seen from the clinic at `now`.
    pub fn today_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        self.day_window(self.local_date(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ist() -> ClinicClock {
        ClinicClock::new(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap())
    }

    #[test]
    fn booking_round_trip_preserves_local_wall_clock() {
        let clock = ist();
        let local = "2026-08-10T14:30:00".parse::<NaiveDateTime>().unwrap();
        let stored = clock.to_utc(local);
        assert_eq!(stored.to_rfc3339(), "2026-08-10T09:00:00+00:00");
        assert_eq!(clock.to_local(stored).naive_local(), local);
    }

    // 20:00 UTC is already past midnight in IST, so "today" is the next
    // calendar date.
    #[test_case("2026-08-06T20:00:00Z", "2026-08-07"; "evening utc rolls over")]
    #[test_case("2026-08-06T10:00:00Z", "2026-08-06"; "midday utc stays")]
    #[test_case("2026-08-06T18:29:59Z", "2026-08-06"; "just before local midnight")]
    #[test_case("2026-08-06T18:30:00Z", "2026-08-07"; "exactly local midnight")]
    fn local_date_follows_clinic_offset(now: &str, expected: &str) {
        let now = now.parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            ist().local_date(now),
            expected.parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn today_window_brackets_the_local_day() {
        let clock = ist();
        let now = "2026-08-06T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let (start, end) = clock.today_window(now);
        assert_eq!(start.to_rfc3339(), "2026-08-05T18:30:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-08-06T18:30:00+00:00");
        assert!(start <= now && now < end);
    }

    #[test]
    fn window_in_western_offset() {
        let clock = ClinicClock::new(FixedOffset::east_opt(-8 * 3600).unwrap());
        let now = "2026-08-06T03:00:00Z".parse::<DateTime<Utc>>().unwrap();
        // 03:00 UTC is still Aug 5 in UTC-8.
        let (start, end) = clock.today_window(now);
        assert_eq!(start.to_rfc3339(), "2026-08-05T08:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-08-06T08:00:00+00:00");
    }
}
