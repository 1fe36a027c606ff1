use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::error::WorkflowError;
use crate::engine::leave::is_working_day;
use crate::model::loan::LoanPolicy;
use crate::model::staff::Subject;

/// Largest loan amount the policy allows for a given monthly salary.
pub fn max_allowed(monthly_salary: f64, max_percentage: f64) -> f64 {
    monthly_salary * max_percentage / 100.0
}

/// Validate a loan candidate against the organization's policy.
///
/// Gate order matches the observed behavior: count first, then amount, then
/// repayment period. The count gate compares the subject's all-time
/// application count (any status) against `number_of_times`.
pub fn evaluate(
    subject: &Subject,
    policy: &LoanPolicy,
    amount: f64,
    repayment_period: u32,
) -> Result<(), WorkflowError> {
    let salary = match subject.amount_per_month {
        Some(s) if s > 0.0 => s,
        _ => return Err(WorkflowError::SalaryMissing),
    };

    if subject.number_of_loans >= policy.number_of_times {
        return Err(WorkflowError::LoanLimitReached {
            taken: subject.number_of_loans,
            allowed: policy.number_of_times,
        });
    }

    let cap = max_allowed(salary, policy.max_percentage);
    if amount > cap {
        return Err(WorkflowError::AmountExceedsCap { max_allowed: cap });
    }

    if repayment_period > policy.max_repayment_months {
        return Err(WorkflowError::RepaymentPeriodExceedsCap {
            requested: repayment_period,
            allowed: policy.max_repayment_months,
        });
    }

    Ok(())
}

/// Re-validate an edited application against the amount and period caps.
/// The count gate does not apply to edits; the application already exists.
pub fn revalidate_caps(
    subject: &Subject,
    policy: &LoanPolicy,
    amount: f64,
    repayment_period: u32,
) -> Result<(), WorkflowError> {
    let salary = match subject.amount_per_month {
        Some(s) if s > 0.0 => s,
        _ => return Err(WorkflowError::SalaryMissing),
    };

    let cap = max_allowed(salary, policy.max_percentage);
    if amount > cap {
        return Err(WorkflowError::AmountExceedsCap { max_allowed: cap });
    }

    if repayment_period > policy.max_repayment_months {
        return Err(WorkflowError::RepaymentPeriodExceedsCap {
            requested: repayment_period,
            allowed: policy.max_repayment_months,
        });
    }

    Ok(())
}

/// UI-facing derived view of how many loans a subject has left.
///
/// `next_window_opens` is display text only: the first working day of the
/// next calendar year. The backend gate itself stays an all-time count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Allowance {
    #[schema(example = 1)]
    pub remaining: i64,
    pub has_reached_limit: bool,
    pub is_last_loan: bool,
    #[schema(example = "2027-01-01", format = "date", value_type = String)]
    pub next_window_opens: NaiveDate,
}

pub fn allowance(subject: &Subject, policy: &LoanPolicy, today: NaiveDate) -> Allowance {
    let remaining = policy.number_of_times as i64 - subject.number_of_loans as i64;
    Allowance {
        remaining,
        has_reached_limit: remaining <= 0,
        is_last_loan: remaining == 1,
        next_window_opens: first_working_day_of_next_year(today),
    }
}

pub fn first_working_day_of_next_year(today: NaiveDate) -> NaiveDate {
    let mut day = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
        .unwrap_or(NaiveDate::MAX);
    while !is_working_day(day) {
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(salary: Option<f64>, loans: u32) -> Subject {
        Subject {
            staff_id: 10,
            user_id: 42,
            full_name: "Jane Doe".into(),
            amount_per_month: salary,
            role_level: 1,
            number_of_loans: loans,
        }
    }

    fn policy(pct: f64, months: u32, times: u32) -> LoanPolicy {
        LoanPolicy {
            id: 1,
            organization_id: 1,
            max_percentage: pct,
            max_repayment_months: months,
            number_of_times: times,
        }
    }

    #[test]
    fn amount_cap_boundary() {
        let s = subject(Some(100_000.0), 0);
        let p = policy(50.0, 12, 2);
        let cap = (100_000.0 * 50.0 / 100.0_f64).floor();

        assert!(evaluate(&s, &p, cap, 12).is_ok());
        match evaluate(&s, &p, cap + 1.0, 12) {
            Err(WorkflowError::AmountExceedsCap { max_allowed }) => {
                assert_eq!(max_allowed, 50_000.0);
            }
            other => panic!("expected AmountExceedsCap, got {other:?}"),
        }
    }

    #[test]
    fn repayment_period_cap_boundary() {
        let s = subject(Some(100_000.0), 0);
        let p = policy(50.0, 12, 2);

        assert!(evaluate(&s, &p, 1000.0, 12).is_ok());
        match evaluate(&s, &p, 1000.0, 13) {
            Err(WorkflowError::RepaymentPeriodExceedsCap {
                requested: 13,
                allowed: 12,
            }) => {}
            other => panic!("expected RepaymentPeriodExceedsCap, got {other:?}"),
        }
    }

    #[test]
    fn count_gate_fires_regardless_of_amount() {
        // Prior applications count whatever their status was.
        let s = subject(Some(100_000.0), 2);
        let p = policy(50.0, 12, 2);
        match evaluate(&s, &p, 1.0, 1) {
            Err(WorkflowError::LoanLimitReached {
                taken: 2,
                allowed: 2,
            }) => {}
            other => panic!("expected LoanLimitReached, got {other:?}"),
        }
    }

    #[test]
    fn missing_or_zero_salary_is_rejected_first() {
        let p = policy(50.0, 12, 2);
        for s in [subject(None, 0), subject(Some(0.0), 0)] {
            match evaluate(&s, &p, 1.0, 1) {
                Err(WorkflowError::SalaryMissing) => {}
                other => panic!("expected SalaryMissing, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_cap_policy_permits_nothing() {
        // The lazily created default policy has all caps at zero.
        let s = subject(Some(100_000.0), 0);
        let p = policy(0.0, 0, 0);
        match evaluate(&s, &p, 1.0, 1) {
            Err(WorkflowError::LoanLimitReached { .. }) => {}
            other => panic!("expected LoanLimitReached, got {other:?}"),
        }
    }

    #[test]
    fn last_allowed_loan_then_limit() {
        // policy {50%, 12, 2}, salary 100000, one loan already taken.
        let p = policy(50.0, 12, 2);
        let before = subject(Some(100_000.0), 1);
        assert!(evaluate(&before, &p, 50_000.0, 12).is_ok());

        let after = subject(Some(100_000.0), 2);
        match evaluate(&after, &p, 50_000.0, 12) {
            Err(WorkflowError::LoanLimitReached { .. }) => {}
            other => panic!("expected LoanLimitReached, got {other:?}"),
        }
    }

    #[test]
    fn revalidate_skips_count_gate() {
        let s = subject(Some(100_000.0), 5);
        let p = policy(50.0, 12, 2);
        assert!(revalidate_caps(&s, &p, 40_000.0, 10).is_ok());
        assert!(revalidate_caps(&s, &p, 60_000.0, 10).is_err());
    }

    #[test]
    fn allowance_derivation() {
        let p = policy(50.0, 12, 2);
        let today = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();

        let a = allowance(&subject(Some(1.0), 0), &p, today);
        assert_eq!(a.remaining, 2);
        assert!(!a.has_reached_limit);
        assert!(!a.is_last_loan);

        let a = allowance(&subject(Some(1.0), 1), &p, today);
        assert_eq!(a.remaining, 1);
        assert!(a.is_last_loan);

        let a = allowance(&subject(Some(1.0), 2), &p, today);
        assert_eq!(a.remaining, 0);
        assert!(a.has_reached_limit);

        // Over the cap still reads as reached, never underflows.
        let a = allowance(&subject(Some(1.0), 3), &p, today);
        assert_eq!(a.remaining, -1);
        assert!(a.has_reached_limit);
    }

    #[test]
    fn next_window_skips_the_weekend() {
        // 2027-01-01 is a Friday: already a working day.
        let d = first_working_day_of_next_year(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        assert_eq!(d, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());

        // 2028-01-01 is a Saturday: the window opens Monday the 3rd.
        let d = first_working_day_of_next_year(NaiveDate::from_ymd_opt(2027, 3, 1).unwrap());
        assert_eq!(d, NaiveDate::from_ymd_opt(2028, 1, 3).unwrap());
    }
}
