//! Tick counters for the main loop.
//!
//! Both schedules are polled from the same base tick; neither owns a timer.

use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Fires on every `every`-th base tick.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    every: u32,
    ticks: u32,
}

impl TickSchedule {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            ticks: 0,
        }
    }

    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.every {
            self.ticks = 0;
            true
        } else {
            false
        }
    }
}

/// Fires once per day on the first poll at or after `at` (local time).
#[derive(Debug, Clone)]
pub struct DailySchedule {
    at: NaiveTime,
    next_due: NaiveDateTime,
}

impl DailySchedule {
    /// First due time is the next occurrence of `at` strictly after `start`.
    pub fn new(at: NaiveTime, start: NaiveDateTime) -> Self {
        Self {
            at,
            next_due: next_occurrence(at, start),
        }
    }

    pub fn next_due(&self) -> NaiveDateTime {
        self.next_due
    }

    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = next_occurrence(self.at, now);
        true
    }
}

fn next_occurrence(at: NaiveTime, after: NaiveDateTime) -> NaiveDateTime {
    let today = after.date().and_time(at);
    if today > after {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn report_time() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 30, 0).unwrap()
    }

    #[test]
    fn test_tick_schedule_every_tenth() {
        let mut s = TickSchedule::new(10);
        let fired: Vec<usize> = (1..=30).filter(|_| s.tick()).collect();
        assert_eq!(fired, vec![10, 20, 30]);
    }

    #[test]
    fn test_tick_schedule_zero_means_every_tick() {
        let mut s = TickSchedule::new(0);
        assert!(s.tick());
        assert!(s.tick());
    }

    #[test]
    fn test_daily_first_due_after_start() {
        let s = DailySchedule::new(report_time(), at(1, 6, 0, 0));
        assert_eq!(s.next_due(), at(1, 7, 30, 0));

        let s = DailySchedule::new(report_time(), at(1, 7, 30, 0));
        assert_eq!(s.next_due(), at(2, 7, 30, 0));

        let s = DailySchedule::new(report_time(), at(1, 12, 0, 0));
        assert_eq!(s.next_due(), at(2, 7, 30, 0));
    }

    #[test]
    fn test_daily_fires_once_per_day() {
        let mut s = DailySchedule::new(report_time(), at(1, 7, 29, 58));
        assert!(!s.poll(at(1, 7, 29, 59)));
        assert!(s.poll(at(1, 7, 30, 0)));
        assert!(!s.poll(at(1, 7, 30, 1)));
        assert!(!s.poll(at(1, 23, 59, 59)));
        assert!(s.poll(at(2, 7, 30, 1)));
        assert_eq!(s.next_due(), at(3, 7, 30, 0));
    }
}
