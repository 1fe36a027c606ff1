use chrono::NaiveDate;
use sqlx::MySqlPool;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::model::role::Role;
use crate::model::status::ApplicationStatus;

/// Leave submissions go to HR and Admin; loans are reviewed by Admin only.
const LEAVE_REVIEWER_ROLES: [u8; 2] = [Role::Admin as u8, Role::Hr as u8];
const LOAN_REVIEWER_ROLES: [u8; 1] = [Role::Admin as u8];

/// Domain events emitted by the lifecycle services after a successful write.
///
/// Delivery is decoupled from persistence: the originating transaction has
/// already committed by the time an event is published, and a failed
/// delivery is logged, never propagated back.
#[derive(Debug)]
pub enum NotificationEvent {
    LeaveSubmitted {
        organization_id: u64,
        applicant_name: String,
        policy_name: String,
        working_days: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    LeaveDecided {
        organization_id: u64,
        applicant_user_id: u64,
        policy_name: String,
        status: ApplicationStatus,
    },
    LoanSubmitted {
        organization_id: u64,
        applicant_name: String,
        amount: f64,
        repayment_period: u32,
        reason: Option<String>,
    },
    LoanDecided {
        organization_id: u64,
        applicant_user_id: u64,
        status: ApplicationStatus,
    },
}

/// Cheap cloneable handle the services publish through.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl Notifier {
    pub fn publish(&self, event: NotificationEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!(error = %e, "Notification dispatcher is gone; event dropped");
        }
    }
}

/// Spawn the dispatcher task and hand back the publishing side.
pub fn spawn_dispatcher(pool: MySqlPool) -> Notifier {
    let (tx, mut rx) = mpsc::unbounded_channel();

    actix_web::rt::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = deliver(&pool, &event).await {
                error!(error = %e, ?event, "Failed to deliver notification");
            }
        }
    });

    Notifier { tx }
}

async fn deliver(pool: &MySqlPool, event: &NotificationEvent) -> anyhow::Result<()> {
    match event {
        NotificationEvent::LeaveSubmitted {
            organization_id,
            applicant_name,
            policy_name,
            working_days,
            start_date,
            end_date,
        } => {
            let body = format!(
                "{} applied for {} working day(s) of {} ({} to {})",
                applicant_name, working_days, policy_name, start_date, end_date
            );
            notify_reviewers(pool, *organization_id, &LEAVE_REVIEWER_ROLES, &body).await
        }

        NotificationEvent::LeaveDecided {
            organization_id,
            applicant_user_id,
            policy_name,
            status,
        } => {
            let body = format!("Your {} application has been {}", policy_name, status);
            notify_user(pool, *organization_id, *applicant_user_id, &body).await
        }

        NotificationEvent::LoanSubmitted {
            organization_id,
            applicant_name,
            amount,
            repayment_period,
            reason,
        } => {
            let body = format!(
                "{} applied for a loan of {:.2} over {} month(s). Reason: {}",
                applicant_name,
                amount,
                repayment_period,
                reason.as_deref().unwrap_or("not given")
            );
            notify_reviewers(pool, *organization_id, &LOAN_REVIEWER_ROLES, &body).await
        }

        // Loan decisions carry fixed generic text, no per-application detail.
        NotificationEvent::LoanDecided {
            organization_id,
            applicant_user_id,
            status,
        } => {
            let body = match status {
                ApplicationStatus::Approved => "Your loan application has been approved",
                _ => "Your loan application has been rejected",
            };
            notify_user(pool, *organization_id, *applicant_user_id, body).await
        }
    }
}

/// Fan a message out to every user holding one of the given roles.
async fn notify_reviewers(
    pool: &MySqlPool,
    organization_id: u64,
    role_ids: &[u8],
    body: &str,
) -> anyhow::Result<()> {
    let placeholders = role_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT id FROM users WHERE organization_id = ? AND role_id IN ({})",
        placeholders
    );

    let mut query = sqlx::query_scalar::<_, u64>(&sql).bind(organization_id);
    for role_id in role_ids {
        query = query.bind(*role_id);
    }
    let recipients = query.fetch_all(pool).await?;

    for recipient in recipients {
        notify_user(pool, organization_id, recipient, body).await?;
    }
    Ok(())
}

async fn notify_user(
    pool: &MySqlPool,
    organization_id: u64,
    recipient_user_id: u64,
    body: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (organization_id, recipient_user_id, body)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(organization_id)
    .bind(recipient_user_id)
    .bind(body)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewer_fanout_targets_known_reviewer_roles() {
        for id in LEAVE_REVIEWER_ROLES.iter().chain(LOAN_REVIEWER_ROLES.iter()) {
            let role = Role::from_id(*id);
            assert!(role.is_some());
            assert_ne!(role, Some(Role::Staff));
        }
        assert!(LEAVE_REVIEWER_ROLES.contains(&(Role::Hr as u8)));
        assert!(!LOAN_REVIEWER_ROLES.contains(&(Role::Hr as u8)));
    }
}
