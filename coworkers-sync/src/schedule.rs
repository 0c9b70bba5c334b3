//! Next-run computation and the scheduler seam.
//!
//! Passes start at 10:00 local time on a Monday:
//! - weekly: the first Monday strictly after today
//! - monthly: the first Monday strictly after the last day of this month

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use coworkers_core::SyncFrequency;

/// Hour of day (local time) at which scheduled passes start.
pub const RUN_HOUR: u32 = 10;

/// Date of the next pass, given today's local date.
pub fn next_run_date(frequency: SyncFrequency, today: NaiveDate) -> NaiveDate {
    let from = match frequency {
        SyncFrequency::Weekly => today,
        SyncFrequency::Monthly => last_day_of_month(today),
    };
    next_monday_after(from)
}

/// Local wall-clock instant of the next pass.
pub fn next_run_local(frequency: SyncFrequency, today: NaiveDate) -> NaiveDateTime {
    let date = next_run_date(frequency, today);
    date.and_hms_opt(RUN_HOUR, 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::default()))
}

/// Instant of the next pass after `now`.
pub fn next_run(frequency: SyncFrequency, now: DateTime<Local>) -> DateTime<Utc> {
    let at = next_run_local(frequency, now.date_naive());
    match Local.from_local_datetime(&at).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // 10:00 skipped by a DST jump; an hour later always exists.
        None => Local
            .from_local_datetime(&(at + Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&at)),
    }
}

fn next_monday_after(date: NaiveDate) -> NaiveDate {
    let days = 7 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(days)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Registers the next pass with whatever drives periodic runs.
pub trait Scheduler {
    fn schedule(&mut self, at: DateTime<Utc>);
}

/// Remembers the requested instant; the pipeline persists it in the run
/// state where the daemon picks it up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NextRun(pub Option<DateTime<Utc>>);

impl Scheduler for NextRun {
    fn schedule(&mut self, at: DateTime<Utc>) {
        tracing::debug!("next sync scheduled at {at}");
        self.0 = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    // Wednesday -> following Monday
    #[case(date(2024, 5, 15), date(2024, 5, 20))]
    // Monday -> a week later, never today
    #[case(date(2024, 5, 20), date(2024, 5, 27))]
    // Sunday -> tomorrow
    #[case(date(2024, 5, 26), date(2024, 5, 27))]
    // across a year boundary
    #[case(date(2024, 12, 31), date(2025, 1, 6))]
    fn weekly(#[case] today: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(next_run_date(SyncFrequency::Weekly, today), expected);
    }

    #[rstest]
    // May 2024 ends on a Friday -> Monday June 3
    #[case(date(2024, 5, 2), date(2024, 6, 3))]
    // September 2024 ends on a Monday -> the Monday after
    #[case(date(2024, 9, 10), date(2024, 10, 7))]
    // December rolls over into January
    #[case(date(2024, 12, 1), date(2025, 1, 6))]
    // leap-year February
    #[case(date(2024, 2, 29), date(2024, 3, 4))]
    fn monthly(#[case] today: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(next_run_date(SyncFrequency::Monthly, today), expected);
    }

    #[test]
    fn runs_start_at_ten_on_a_monday() {
        let at = next_run_local(SyncFrequency::Weekly, date(2024, 5, 15));
        assert_eq!(at.weekday(), Weekday::Mon);
        assert_eq!(at.time(), chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn next_run_is_in_the_future() {
        let now = Local::now();
        assert!(next_run(SyncFrequency::Weekly, now) > now.with_timezone(&Utc));
    }

    #[test]
    fn next_run_scheduler_records_instant() {
        let mut scheduler = NextRun::default();
        let at = Utc::now();
        scheduler.schedule(at);
        assert_eq!(scheduler, NextRun(Some(at)));
    }
}
