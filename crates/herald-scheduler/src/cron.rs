//! Cron expression helpers.
//!
//! Expressions follow the `cron` crate's seconds-first format:
//! `sec min hour day-of-month month day-of-week [year]`. Occurrences are
//! computed in the process-local time zone, matching `scheduled_time`.

use std::str::FromStr;

use chrono::{DateTime, Local};
use cron::Schedule;

use crate::error::{Result, SchedulerError};

/// Syntactic validity check, used before a recurring trigger is armed.
pub fn is_valid_expression(expr: &str) -> bool {
    parse_expression(expr).is_ok()
}

/// Parse `expr`, rejecting empty and malformed expressions.
pub fn parse_expression(expr: &str) -> Result<Schedule> {
    if expr.trim().is_empty() {
        return Err(SchedulerError::InvalidCron("empty expression".to_string()));
    }
    Schedule::from_str(expr).map_err(|e| SchedulerError::InvalidCron(e.to_string()))
}

/// Next fire time strictly after `after`, or `None` when the schedule is
/// exhausted (possible for expressions carrying an explicit year field).
pub fn next_occurrence(schedule: &Schedule, after: DateTime<Local>) -> Option<DateTime<Local>> {
    schedule.after(&after).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_second_is_valid() {
        assert!(is_valid_expression("*/1 * * * * *"));
    }

    #[test]
    fn daily_nine_am_is_valid() {
        assert!(is_valid_expression("0 0 9 * * *"));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(!is_valid_expression("not a cron"));
        assert!(!is_valid_expression("* * *"));
    }

    #[test]
    fn empty_expression_is_invalid() {
        assert!(!is_valid_expression(""));
        assert!(!is_valid_expression("   "));
    }

    #[test]
    fn next_occurrence_is_in_the_future() {
        let schedule = parse_expression("*/1 * * * * *").unwrap();
        let now = Local::now();
        let next = next_occurrence(&schedule, now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn exhausted_schedule_has_no_occurrence() {
        // Year field pinned to the past: nothing left to fire.
        let schedule = parse_expression("0 0 0 1 1 * 2000").unwrap();
        assert!(next_occurrence(&schedule, Local::now()).is_none());
    }
}
