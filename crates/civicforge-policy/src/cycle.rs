//! Cycle providers - the calendar windows policy counts against
//!
//! Mint caps count per daily UTC cycle; the treasury budget counts per
//! ISO week (Monday UTC 00:00 inclusive to next Monday exclusive).

use chrono::{DateTime, Datelike, Days, NaiveTime, Utc};

/// A half-open calendar window `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleWindow {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CycleWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Maps an instant to the cycle window containing it
pub trait CycleProvider: Send + Sync {
    fn cycle(&self, now: DateTime<Utc>) -> CycleWindow;
}

/// Daily cycles aligned to UTC midnight
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyUtcCycle;

impl CycleProvider for DailyUtcCycle {
    fn cycle(&self, now: DateTime<Utc>) -> CycleWindow {
        let date = now.date_naive();
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Days::new(1);
        CycleWindow {
            id: date.format("%Y-%m-%d").to_string(),
            start,
            end,
        }
    }
}

/// ISO-week cycles: Monday UTC 00:00 inclusive to next Monday exclusive
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoWeekCycle;

impl CycleProvider for IsoWeekCycle {
    fn cycle(&self, now: DateTime<Utc>) -> CycleWindow {
        let date = now.date_naive();
        let monday = date - Days::new(date.weekday().num_days_from_monday() as u64);
        let start = monday.and_time(NaiveTime::MIN).and_utc();
        let end = start + Days::new(7);
        let iso = date.iso_week();
        CycleWindow {
            id: format!("{}-W{:02}", iso.year(), iso.week()),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_daily_cycle_aligns_to_utc_midnight() {
        let window = DailyUtcCycle.cycle(at("2025-06-02T15:30:00Z"));
        assert_eq!(window.id, "2025-06-02");
        assert_eq!(window.start, at("2025-06-02T00:00:00Z"));
        assert_eq!(window.end, at("2025-06-03T00:00:00Z"));
        assert!(window.contains(at("2025-06-02T23:59:59Z")));
        assert!(!window.contains(at("2025-06-03T00:00:00Z")));
    }

    #[test]
    fn test_weekly_cycle_starts_monday() {
        // 2025-06-05 is a Thursday; its ISO week starts Monday 2025-06-02
        let window = IsoWeekCycle.cycle(at("2025-06-05T12:00:00Z"));
        assert_eq!(window.id, "2025-W23");
        assert_eq!(window.start, at("2025-06-02T00:00:00Z"));
        assert_eq!(window.end, at("2025-06-09T00:00:00Z"));
    }

    #[test]
    fn test_weekly_cycle_on_monday_midnight() {
        let window = IsoWeekCycle.cycle(at("2025-06-02T00:00:00Z"));
        assert_eq!(window.start, at("2025-06-02T00:00:00Z"));
        assert!(window.contains(at("2025-06-02T00:00:00Z")));
    }

    #[test]
    fn test_next_monday_is_a_new_week() {
        let this_week = IsoWeekCycle.cycle(at("2025-06-05T12:00:00Z"));
        let next_week = IsoWeekCycle.cycle(at("2025-06-09T00:00:01Z"));
        assert_ne!(this_week.id, next_week.id);
        assert_eq!(this_week.end, next_week.start);
    }
}
