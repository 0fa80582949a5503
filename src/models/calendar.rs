//! Working-day calendar.
//!
//! Date arithmetic on a fixed Monday–Friday work week with no holiday
//! calendar. Durations are counted in whole working days and end dates
//! are inclusive: a 1-day task starting Monday ends Monday.
//!
//! # Ordinal Model
//! Every date maps to a working-day ordinal (the number of working days
//! since a Monday epoch). Weekend dates share the ordinal of the following
//! Monday, so all working-day arithmetic reduces to integer arithmetic
//! on ordinals. Lags expressed in working days are exact in this model.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Working days per week.
const WEEK_LEN: i64 = 5;

/// Largest duration or lag magnitude, in days, the engine accepts.
pub const MAX_SPAN_DAYS: i64 = 100_000;

/// Unit in which dependency lags are expressed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LagUnit {
    /// Lags count working days (Mon–Fri).
    #[default]
    WorkingDays,
    /// Lags count calendar days; the shifted date snaps forward to a working day.
    CalendarDays,
}

/// Fixed 5-day work week calendar.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkCalendar {
    /// Unit applied by [`WorkCalendar::shift`].
    pub lag_unit: LagUnit,
}

impl WorkCalendar {
    /// Creates a calendar that interprets lags in working days.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lag unit.
    pub fn with_lag_unit(mut self, lag_unit: LagUnit) -> Self {
        self.lag_unit = lag_unit;
        self
    }

    /// Whether the date falls on Monday through Friday.
    #[inline]
    pub fn is_working_day(date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Working-day ordinal of a date. Weekends map to the following Monday.
    pub fn ordinal(date: NaiveDate) -> i64 {
        let days = (date - epoch()).num_days();
        let week = days.div_euclid(7);
        let day = days.rem_euclid(7).min(WEEK_LEN);
        week * WEEK_LEN + day
    }

    /// Date of a working-day ordinal (a working day within chrono's date
    /// range; saturates at its ends).
    pub fn from_ordinal(ordinal: i64) -> NaiveDate {
        let week = ordinal.div_euclid(WEEK_LEN);
        let day = ordinal.rem_euclid(WEEK_LEN);
        offset(epoch(), week.saturating_mul(7).saturating_add(day))
    }

    /// The date itself if it is a working day, else the following Monday.
    pub fn next_working_day(date: NaiveDate) -> NaiveDate {
        Self::from_ordinal(Self::ordinal(date))
    }

    /// Moves a date by `days` working days (negative moves backwards).
    ///
    /// Weekend dates are snapped forward before moving.
    pub fn add_working_days(date: NaiveDate, days: i64) -> NaiveDate {
        Self::from_ordinal(Self::ordinal(date).saturating_add(days))
    }

    /// Signed number of working-day steps from `from` to `to`.
    pub fn working_days_between(from: NaiveDate, to: NaiveDate) -> i64 {
        Self::ordinal(to) - Self::ordinal(from)
    }

    /// Inclusive count of working days in `[start, end]`.
    ///
    /// Returns `0` when `end < start`; any non-inverted range counts at
    /// least one day, so a same-day task has duration 1.
    pub fn calc_duration(start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        let after_end = Self::ordinal(end) + i64::from(Self::is_working_day(end));
        (after_end - Self::ordinal(start)).max(1)
    }

    /// Last working day of a task of `duration` working days starting at `start`.
    ///
    /// A zero duration (milestone) returns `start` unchanged.
    pub fn calc_end_date(start: NaiveDate, duration: i64) -> NaiveDate {
        if duration <= 0 {
            return start;
        }
        Self::from_ordinal(Self::ordinal(start).saturating_add(duration - 1))
    }

    /// First working day of a task of `duration` working days ending at `end`.
    ///
    /// Inverse of [`calc_end_date`](Self::calc_end_date) on working days.
    pub fn calc_start_date(end: NaiveDate, duration: i64) -> NaiveDate {
        if duration <= 0 {
            return end;
        }
        let end_ordinal = if Self::is_working_day(end) {
            Self::ordinal(end)
        } else {
            // last working day before the weekend
            Self::ordinal(end) - 1
        };
        Self::from_ordinal(end_ordinal.saturating_sub(duration - 1))
    }

    /// Shifts a date by a dependency lag (`calendarAdd`).
    ///
    /// The result is always a working day.
    pub fn shift(&self, date: NaiveDate, lag: i64) -> NaiveDate {
        match self.lag_unit {
            LagUnit::WorkingDays => Self::add_working_days(date, lag),
            LagUnit::CalendarDays => Self::next_working_day(offset(date, lag)),
        }
    }

    /// Lag converted to working days, measured from `anchor`.
    ///
    /// Identity under [`LagUnit::WorkingDays`].
    pub fn lag_in_working_days(&self, anchor: NaiveDate, lag: i64) -> i64 {
        match self.lag_unit {
            LagUnit::WorkingDays => lag,
            LagUnit::CalendarDays => {
                Self::working_days_between(Self::next_working_day(anchor), self.shift(anchor, lag))
            }
        }
    }
}

/// Monday, 1 January 2001.
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2001, 1, 1).unwrap_or_default()
}

/// `date + days`, clamped to the representable range.
fn offset(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // 2024-01-01 is a Monday.
    const MON: (i32, u32, u32) = (2024, 1, 1);

    fn mon() -> NaiveDate {
        d(MON.0, MON.1, MON.2)
    }

    #[test]
    fn test_is_working_day() {
        assert!(WorkCalendar::is_working_day(mon()));
        assert!(WorkCalendar::is_working_day(d(2024, 1, 5))); // Fri
        assert!(!WorkCalendar::is_working_day(d(2024, 1, 6))); // Sat
        assert!(!WorkCalendar::is_working_day(d(2024, 1, 7))); // Sun
    }

    #[test]
    fn test_ordinal_weekend_snaps_to_monday() {
        let sat = d(2024, 1, 6);
        let next_mon = d(2024, 1, 8);
        assert_eq!(WorkCalendar::ordinal(sat), WorkCalendar::ordinal(next_mon));
        assert_eq!(WorkCalendar::next_working_day(sat), next_mon);
        assert_eq!(WorkCalendar::next_working_day(mon()), mon());
    }

    #[test]
    fn test_ordinal_round_trip_before_epoch() {
        let old = d(1999, 12, 31); // Friday
        let o = WorkCalendar::ordinal(old);
        assert!(o < 0);
        assert_eq!(WorkCalendar::from_ordinal(o), old);
    }

    #[test]
    fn test_calc_duration() {
        assert_eq!(WorkCalendar::calc_duration(mon(), mon()), 1);
        assert_eq!(WorkCalendar::calc_duration(mon(), d(2024, 1, 3)), 3);
        // Mon..next Mon spans a weekend
        assert_eq!(WorkCalendar::calc_duration(mon(), d(2024, 1, 8)), 6);
        // Weekend-only range still counts as one day
        assert_eq!(WorkCalendar::calc_duration(d(2024, 1, 6), d(2024, 1, 7)), 1);
        assert_eq!(WorkCalendar::calc_duration(d(2024, 1, 3), mon()), 0);
    }

    #[test]
    fn test_calc_end_date() {
        assert_eq!(WorkCalendar::calc_end_date(mon(), 1), mon());
        assert_eq!(WorkCalendar::calc_end_date(mon(), 3), d(2024, 1, 3));
        assert_eq!(WorkCalendar::calc_end_date(d(2024, 1, 4), 3), d(2024, 1, 8));
        assert_eq!(WorkCalendar::calc_end_date(mon(), 0), mon());
    }

    #[test]
    fn test_end_date_and_duration_agree() {
        for duration in 1..30 {
            let end = WorkCalendar::calc_end_date(d(2024, 1, 3), duration);
            assert_eq!(WorkCalendar::calc_duration(d(2024, 1, 3), end), duration);
            assert_eq!(WorkCalendar::calc_start_date(end, duration), d(2024, 1, 3));
        }
    }

    #[test]
    fn test_calc_start_date_from_weekend_end() {
        // A 2-day task ending on Saturday occupies Thu–Fri.
        assert_eq!(
            WorkCalendar::calc_start_date(d(2024, 1, 6), 2),
            d(2024, 1, 4)
        );
    }

    #[test]
    fn test_add_working_days() {
        assert_eq!(WorkCalendar::add_working_days(d(2024, 1, 4), 2), d(2024, 1, 8));
        assert_eq!(WorkCalendar::add_working_days(d(2024, 1, 8), -1), d(2024, 1, 5));
        assert_eq!(WorkCalendar::add_working_days(mon(), 0), mon());
        assert_eq!(WorkCalendar::working_days_between(mon(), d(2024, 1, 8)), 5);
    }

    #[test]
    fn test_shift_working_vs_calendar() {
        let thu = d(2024, 1, 4);
        let working = WorkCalendar::new();
        let calendar = WorkCalendar::new().with_lag_unit(LagUnit::CalendarDays);

        assert_eq!(working.shift(thu, 2), d(2024, 1, 8)); // Mon
        assert_eq!(calendar.shift(thu, 2), d(2024, 1, 8)); // Sat -> Mon
        assert_eq!(calendar.shift(thu, 1), d(2024, 1, 5)); // Fri
        assert_eq!(working.shift(thu, -3), mon());
    }

    #[test]
    fn test_lag_in_working_days() {
        let thu = d(2024, 1, 4);
        let working = WorkCalendar::new();
        let calendar = WorkCalendar::new().with_lag_unit(LagUnit::CalendarDays);

        assert_eq!(working.lag_in_working_days(thu, 7), 7);
        assert_eq!(calendar.lag_in_working_days(thu, 7), 5);
        assert_eq!(calendar.lag_in_working_days(thu, 2), 2);
    }

    #[test]
    fn test_out_of_range_dates_saturate() {
        let far = WorkCalendar::calc_end_date(mon(), 200_000_000);
        assert!(far > d(9999, 12, 31));
        let calendar = WorkCalendar::new().with_lag_unit(LagUnit::CalendarDays);
        assert!(calendar.shift(mon(), -200_000_000) < d(1, 1, 1));
        assert_eq!(WorkCalendar::from_ordinal(i64::MAX), NaiveDate::MAX);
        assert!(calendar.shift(mon(), i64::MIN) < d(1, 1, 1));
    }
}
