use chrono::{Datelike, NaiveDate, Weekday};

use crate::engine::error::WorkflowError;
use crate::model::leave::LeavePolicy;

pub fn is_working_day(day: NaiveDate) -> bool {
    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Count Mon-Fri days between `start` and `end`, both inclusive.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0u32;
    let mut day = start;
    while day <= end {
        if is_working_day(day) {
            count += 1;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    count
}

/// Validate a leave candidate against a policy.
///
/// The role check is a ceiling: staff above the policy's role level are
/// rejected, lower or equal levels pass. Returns the computed working-day
/// count on success so callers can persist/notify with it.
pub fn evaluate(
    subject_role_level: u32,
    policy: &LeavePolicy,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<u32, WorkflowError> {
    if end_date < start_date {
        return Err(WorkflowError::InvalidDateRange);
    }

    if subject_role_level > policy.role_level {
        return Err(WorkflowError::RoleNotAuthorized {
            subject_level: subject_role_level,
            policy_level: policy.role_level,
        });
    }

    let requested = working_days(start_date, end_date);
    if requested > policy.duration {
        return Err(WorkflowError::DurationExceeded {
            requested,
            allowed: policy.duration,
        });
    }

    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(duration: u32, role_level: u32) -> LeavePolicy {
        LeavePolicy {
            id: 1,
            organization_id: 1,
            name: "Annual Leave".into(),
            leave_type: "paid".into(),
            duration,
            applicable_to: "both".into(),
            role_level,
        }
    }

    #[test]
    fn working_days_skip_weekends() {
        // 2026-01-05 is a Monday.
        let mon = date(2026, 1, 5);
        let fri = date(2026, 1, 9);
        let sun = date(2026, 1, 11);
        let next_mon = date(2026, 1, 12);

        assert_eq!(working_days(mon, fri), 5);
        assert_eq!(working_days(mon, sun), 5);
        assert_eq!(working_days(mon, next_mon), 6);
        assert_eq!(working_days(mon, mon), 1);
    }

    #[test]
    fn weekend_only_span_counts_zero_days() {
        let sat = date(2026, 1, 10);
        let sun = date(2026, 1, 11);
        assert_eq!(working_days(sat, sun), 0);
        // A zero-day span still passes any positive duration cap.
        assert_eq!(evaluate(0, &policy(5, 2), sat, sun).unwrap(), 0);
    }

    #[test]
    fn duration_cap_is_inclusive() {
        let p = policy(5, 2);
        let mon = date(2026, 1, 5);

        // Exactly D working days is accepted.
        assert_eq!(evaluate(2, &p, mon, date(2026, 1, 9)).unwrap(), 5);

        // D+1 working days (Mon week 1 through Mon week 2) is rejected.
        match evaluate(2, &p, mon, date(2026, 1, 12)) {
            Err(WorkflowError::DurationExceeded {
                requested: 6,
                allowed: 5,
            }) => {}
            other => panic!("expected DurationExceeded, got {other:?}"),
        }
    }

    #[test]
    fn role_gate_is_a_ceiling() {
        let p = policy(10, 2);
        let mon = date(2026, 1, 5);
        let fri = date(2026, 1, 9);

        assert!(evaluate(0, &p, mon, fri).is_ok());
        assert!(evaluate(2, &p, mon, fri).is_ok());
        match evaluate(3, &p, mon, fri) {
            Err(WorkflowError::RoleNotAuthorized {
                subject_level: 3,
                policy_level: 2,
            }) => {}
            other => panic!("expected RoleNotAuthorized, got {other:?}"),
        }
    }

    #[test]
    fn role_gate_runs_before_duration() {
        // Both gates would fail; the role gate is reported first.
        let p = policy(1, 0);
        match evaluate(5, &p, date(2026, 1, 5), date(2026, 1, 30)) {
            Err(WorkflowError::RoleNotAuthorized { .. }) => {}
            other => panic!("expected RoleNotAuthorized, got {other:?}"),
        }
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let p = policy(5, 2);
        match evaluate(0, &p, date(2026, 1, 9), date(2026, 1, 5)) {
            Err(WorkflowError::InvalidDateRange) => {}
            other => panic!("expected InvalidDateRange, got {other:?}"),
        }
    }

    #[test]
    fn span_crossing_a_weekend_excludes_it() {
        // Wed through next Tue: Wed, Thu, Fri, Mon, Tue = 5 working days.
        let wed = date(2026, 1, 7);
        let tue = date(2026, 1, 13);
        assert_eq!(working_days(wed, tue), 5);
        assert_eq!(evaluate(0, &policy(5, 0), wed, tue).unwrap(), 5);
    }
}
