use derive_more::Display;

/// How an error should be surfaced to the caller.
///
/// Precondition errors are misconfiguration (generic message to the user,
/// full detail in the server log). Rule errors are actionable user mistakes
/// and are shown verbatim. State errors mean the application is not in a
/// state that permits the operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorClass {
    Precondition,
    Rule,
    State,
    Internal,
}

/// Every way a leave or loan workflow operation can fail.
#[derive(Debug, Display)]
pub enum WorkflowError {
    #[display(fmt = "Policy not found for this organization")]
    PolicyNotFound,

    #[display(fmt = "Staff profile not found for applicant")]
    SubjectNotFound,

    #[display(fmt = "end_date cannot be before start_date")]
    InvalidDateRange,

    #[display(
        fmt = "Your role level ({}) is not eligible for this leave policy (allowed up to level {})",
        subject_level,
        policy_level
    )]
    RoleNotAuthorized {
        subject_level: u32,
        policy_level: u32,
    },

    #[display(
        fmt = "Leave duration of {} working day(s) exceeds the policy limit of {} day(s)",
        requested,
        allowed
    )]
    DurationExceeded { requested: u32, allowed: u32 },

    #[display(fmt = "No monthly salary is configured for this staff profile")]
    SalaryMissing,

    #[display(
        fmt = "Loan limit reached: {} of {} allowed loan application(s) used",
        taken,
        allowed
    )]
    LoanLimitReached { taken: u32, allowed: u32 },

    #[display(
        fmt = "Loan amount exceeds maximum allowed. Maximum allowed: {:.2}",
        max_allowed
    )]
    AmountExceedsCap { max_allowed: f64 },

    #[display(
        fmt = "Repayment period of {} month(s) exceeds the maximum of {} month(s)",
        requested,
        allowed
    )]
    RepaymentPeriodExceedsCap { requested: u32, allowed: u32 },

    #[display(fmt = "Application not found")]
    ApplicationNotFound,

    #[display(fmt = "Application is no longer pending and cannot be edited")]
    ApplicationLocked,

    #[display(fmt = "Application is not pending; status can no longer change")]
    InvalidTransition,

    #[display(fmt = "database error: {}", _0)]
    Db(sqlx::Error),
}

impl WorkflowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::PolicyNotFound | WorkflowError::SubjectNotFound => {
                ErrorClass::Precondition
            }
            WorkflowError::InvalidDateRange
            | WorkflowError::RoleNotAuthorized { .. }
            | WorkflowError::DurationExceeded { .. }
            | WorkflowError::SalaryMissing
            | WorkflowError::LoanLimitReached { .. }
            | WorkflowError::AmountExceedsCap { .. }
            | WorkflowError::RepaymentPeriodExceedsCap { .. } => ErrorClass::Rule,
            WorkflowError::ApplicationNotFound
            | WorkflowError::ApplicationLocked
            | WorkflowError::InvalidTransition => ErrorClass::State,
            WorkflowError::Db(_) => ErrorClass::Internal,
        }
    }
}

impl std::error::Error for WorkflowError {}

impl From<sqlx::Error> for WorkflowError {
    fn from(e: sqlx::Error) -> Self {
        WorkflowError::Db(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_are_not_rule_errors() {
        assert_eq!(WorkflowError::PolicyNotFound.class(), ErrorClass::Precondition);
        assert_eq!(WorkflowError::SubjectNotFound.class(), ErrorClass::Precondition);
    }

    #[test]
    fn cap_violations_are_rule_errors() {
        assert_eq!(
            WorkflowError::AmountExceedsCap { max_allowed: 1.0 }.class(),
            ErrorClass::Rule
        );
        assert_eq!(
            WorkflowError::DurationExceeded {
                requested: 6,
                allowed: 5
            }
            .class(),
            ErrorClass::Rule
        );
        assert_eq!(WorkflowError::SalaryMissing.class(), ErrorClass::Rule);
    }

    #[test]
    fn lifecycle_guards_are_state_errors() {
        assert_eq!(WorkflowError::ApplicationLocked.class(), ErrorClass::State);
        assert_eq!(WorkflowError::InvalidTransition.class(), ErrorClass::State);
        assert_eq!(WorkflowError::ApplicationNotFound.class(), ErrorClass::State);
    }

    #[test]
    fn rule_messages_carry_the_numbers() {
        let msg = WorkflowError::AmountExceedsCap { max_allowed: 50000.0 }.to_string();
        assert!(msg.contains("50000.00"), "{msg}");

        let msg = WorkflowError::LoanLimitReached {
            taken: 2,
            allowed: 2,
        }
        .to_string();
        assert!(msg.contains("2 of 2"), "{msg}");
    }
}
