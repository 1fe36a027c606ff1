use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle status shared by leave and loan applications.
///
/// `FullyRepaid` only ever appears on loans and is written by the repayment
/// ledger, never by this service; it still parses so loan rows round-trip.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    FullyRepaid,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::FullyRepaid => "fully_repaid",
        }
    }

    /// Anything past `pending` is immutable through the ordinary update path.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    /// The only transitions this service performs: pending -> approved,
    /// pending -> rejected.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        matches!(self, ApplicationStatus::Pending)
            && matches!(
                next,
                ApplicationStatus::Approved | ApplicationStatus::Rejected
            )
    }
}

/// The decision an admin can take on a pending application.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_status(&self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approved => ApplicationStatus::Approved,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn transitions_only_leave_pending() {
        let pending = ApplicationStatus::Pending;
        assert!(pending.can_transition_to(ApplicationStatus::Approved));
        assert!(pending.can_transition_to(ApplicationStatus::Rejected));
        assert!(!pending.can_transition_to(ApplicationStatus::Pending));
        assert!(!pending.can_transition_to(ApplicationStatus::FullyRepaid));
    }

    #[test]
    fn approved_and_rejected_are_terminal() {
        for terminal in [
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::FullyRepaid,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(ApplicationStatus::Approved));
            assert!(!terminal.can_transition_to(ApplicationStatus::Rejected));
            assert!(!terminal.can_transition_to(ApplicationStatus::Pending));
        }
        assert!(!ApplicationStatus::Pending.is_terminal());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
            ApplicationStatus::FullyRepaid,
        ] {
            let text = status.to_string();
            assert_eq!(text, status.as_str());
            assert_eq!(ApplicationStatus::from_str(&text).unwrap(), status);
        }
    }

    #[test]
    fn review_decision_maps_to_status() {
        assert_eq!(
            ReviewDecision::Approved.as_status(),
            ApplicationStatus::Approved
        );
        assert_eq!(
            ReviewDecision::Rejected.as_status(),
            ApplicationStatus::Rejected
        );
    }
}
