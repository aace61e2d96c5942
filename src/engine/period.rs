//! Period calculator: how many accrual periods a position has earned.
//!
//! Period boundaries are anchored to the position's start timestamp, not to
//! wall-clock midnight or the top of the hour: period n's key is
//! `start + n x unit`. The first profit accrues one full period after
//! opening, so period numbering begins at 1.

use crate::domain::{PositionKind, TimeMs};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// The fixed accrual unit for a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    /// One day — investments.
    Day,
    /// One hour — live trades.
    Hour,
}

impl PeriodUnit {
    /// Accrual unit for a position kind.
    pub fn for_kind(kind: PositionKind) -> Self {
        match kind {
            PositionKind::Investment => PeriodUnit::Day,
            PositionKind::LiveTrade => PeriodUnit::Hour,
        }
    }

    /// Length of one period in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match self {
            PeriodUnit::Day => MS_PER_DAY,
            PeriodUnit::Hour => MS_PER_HOUR,
        }
    }

    /// Human label for a period key, used in audit descriptions.
    ///
    /// Days render as a calendar date, hours as an hour bucket.
    pub fn format_key(&self, key: TimeMs) -> String {
        match chrono::DateTime::from_timestamp_millis(key.as_ms()) {
            Some(dt) => match self {
                PeriodUnit::Day => dt.format("%Y-%m-%d").to_string(),
                PeriodUnit::Hour => dt.format("%Y-%m-%d %H:%M").to_string(),
            },
            None => format!("{}ms", key.as_ms()),
        }
    }
}

/// Scheduled timestamp of period `n` (1-based) for a position started at
/// `start`.
pub fn period_key(start: TimeMs, n: i64, unit: PeriodUnit) -> TimeMs {
    TimeMs::new(start.as_ms() + n * unit.duration_ms())
}

/// Whole periods elapsed between `start` and `now`. Zero when `now` is
/// before `start`.
pub fn elapsed_periods(start: TimeMs, now: TimeMs, unit: PeriodUnit) -> i64 {
    let delta = now.as_ms() - start.as_ms();
    if delta < 0 {
        return 0;
    }
    delta / unit.duration_ms()
}

/// What a position has earned as of `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSchedule {
    pub start: TimeMs,
    pub unit: PeriodUnit,
    /// Whole periods elapsed since start, uncapped.
    pub elapsed: i64,
    /// Periods eligible for payout: min(elapsed, period_count).
    pub payable: i64,
    /// True once elapsed >= period_count; the position is due for
    /// completion after its final period is paid.
    pub duration_reached: bool,
}

impl PeriodSchedule {
    /// Compute the schedule for a position's start time and configured
    /// duration as of `now`.
    pub fn compute(start: TimeMs, now: TimeMs, unit: PeriodUnit, period_count: i64) -> Self {
        let elapsed = elapsed_periods(start, now, unit);
        PeriodSchedule {
            start,
            unit,
            elapsed,
            payable: elapsed.min(period_count),
            duration_reached: elapsed >= period_count,
        }
    }

    /// Scheduled timestamp of period `n` (1-based).
    pub fn key_for(&self, n: i64) -> TimeMs {
        period_key(self.start, n, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_periods_before_one_unit_passes() {
        let start = TimeMs::new(1_000);
        let just_before = TimeMs::new(1_000 + MS_PER_DAY - 1);
        assert_eq!(elapsed_periods(start, just_before, PeriodUnit::Day), 0);

        let exactly_one = TimeMs::new(1_000 + MS_PER_DAY);
        assert_eq!(elapsed_periods(start, exactly_one, PeriodUnit::Day), 1);
    }

    #[test]
    fn test_now_before_start_is_zero() {
        let start = TimeMs::new(10_000);
        let now = TimeMs::new(5_000);
        assert_eq!(elapsed_periods(start, now, PeriodUnit::Hour), 0);
    }

    #[test]
    fn test_elapsed_counts_whole_periods_only() {
        let start = TimeMs::new(0);
        let now = TimeMs::new(5 * MS_PER_HOUR + MS_PER_HOUR / 2);
        assert_eq!(elapsed_periods(start, now, PeriodUnit::Hour), 5);
    }

    #[test]
    fn test_keys_are_anchored_to_start_not_calendar() {
        // Start mid-day; keys land mid-day too, one unit apart.
        let start = TimeMs::new(MS_PER_DAY / 2);
        let k1 = period_key(start, 1, PeriodUnit::Day);
        let k2 = period_key(start, 2, PeriodUnit::Day);
        assert_eq!(k1.as_ms(), start.as_ms() + MS_PER_DAY);
        assert_eq!(k2.as_ms() - k1.as_ms(), MS_PER_DAY);
    }

    #[test]
    fn test_schedule_caps_payable_at_period_count() {
        let start = TimeMs::new(0);
        let now = TimeMs::new(45 * MS_PER_DAY);
        let schedule = PeriodSchedule::compute(start, now, PeriodUnit::Day, 30);
        assert_eq!(schedule.elapsed, 45);
        assert_eq!(schedule.payable, 30);
        assert!(schedule.duration_reached);
    }

    #[test]
    fn test_schedule_mid_life() {
        let start = TimeMs::new(0);
        let now = TimeMs::new(5 * MS_PER_DAY);
        let schedule = PeriodSchedule::compute(start, now, PeriodUnit::Day, 30);
        assert_eq!(schedule.payable, 5);
        assert!(!schedule.duration_reached);
    }

    #[test]
    fn test_duration_reached_at_exact_boundary() {
        let start = TimeMs::new(0);
        let now = TimeMs::new(30 * MS_PER_DAY);
        let schedule = PeriodSchedule::compute(start, now, PeriodUnit::Day, 30);
        assert_eq!(schedule.payable, 30);
        assert!(schedule.duration_reached);
    }

    #[test]
    fn test_unit_for_kind() {
        assert_eq!(
            PeriodUnit::for_kind(PositionKind::Investment),
            PeriodUnit::Day
        );
        assert_eq!(
            PeriodUnit::for_kind(PositionKind::LiveTrade),
            PeriodUnit::Hour
        );
    }

    #[test]
    fn test_format_key_day_and_hour() {
        // 2021-01-01 00:00:00 UTC
        let key = TimeMs::new(1_609_459_200_000);
        assert_eq!(PeriodUnit::Day.format_key(key), "2021-01-01");
        assert_eq!(PeriodUnit::Hour.format_key(key), "2021-01-01 00:00");
    }
}
