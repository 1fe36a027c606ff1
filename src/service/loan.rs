use chrono::{NaiveDate, Utc};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{info, warn};

use crate::engine;
use crate::engine::error::WorkflowError;
use crate::engine::loan::Allowance;
use crate::model::loan::{LoanApplication, LoanPolicy};
use crate::model::status::{ApplicationStatus, ReviewDecision};
use crate::service::notifier::{NotificationEvent, Notifier};
use crate::utils::db_utils::{PatchSet, SqlValue, build_guarded_update, execute_update};
use crate::utils::policy_cache;

pub struct SubmitLoan {
    pub user_id: u64,
    pub amount: f64,
    pub repayment_period: u32,
    pub monthly_deduction: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Default)]
pub struct LoanPatch {
    pub amount: Option<f64>,
    pub repayment_period: Option<u32>,
    pub monthly_deduction: Option<f64>,
    pub reason: Option<String>,
}

/// Submit a loan application.
///
/// The policy row is read `FOR UPDATE` inside the transaction, which
/// serializes same-organization submissions: a second submission blocks on
/// the row lock until the first commits, so its application count includes
/// the freshly inserted row and the count gate cannot be passed twice on
/// the same snapshot.
pub async fn submit(
    pool: &MySqlPool,
    notifier: &Notifier,
    organization_id: u64,
    input: SubmitLoan,
) -> Result<LoanApplication, WorkflowError> {
    let mut tx = pool.begin().await?;

    let policy = lock_policy(&mut *tx, organization_id).await?;

    let subject = super::fetch_subject(&mut *tx, organization_id, input.user_id)
        .await?
        .ok_or(WorkflowError::SubjectNotFound)?;

    engine::loan::evaluate(&subject, &policy, input.amount, input.repayment_period)?;

    let result = sqlx::query(
        r#"
        INSERT INTO loan_applications
            (organization_id, user_id, amount, repayment_period, monthly_deduction, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(organization_id)
    .bind(input.user_id)
    .bind(input.amount)
    .bind(input.repayment_period)
    .bind(input.monthly_deduction)
    .bind(&input.reason)
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_id();
    let application = fetch_application_conn(&mut *tx, organization_id, id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)?;

    tx.commit().await?;

    info!(
        application_id = id,
        user_id = input.user_id,
        amount = input.amount,
        "Loan application submitted"
    );

    notifier.publish(NotificationEvent::LoanSubmitted {
        organization_id,
        applicant_name: subject.full_name,
        amount: input.amount,
        repayment_period: input.repayment_period,
        reason: input.reason,
    });

    Ok(application)
}

/// Update a pending loan application.
///
/// Caps are re-checked only when the patch carries both `amount` and
/// `repayment_period`; a single-field patch skips re-validation. That
/// matches the long-standing behavior callers rely on, so it is kept and
/// logged rather than silently tightened.
pub async fn update(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
    patch: LoanPatch,
) -> Result<LoanApplication, WorkflowError> {
    if let (Some(amount), Some(period)) = (patch.amount, patch.repayment_period) {
        let mut tx = pool.begin().await?;
        let policy = get_or_create_policy(&mut *tx, organization_id).await?;

        let applicant = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT user_id FROM loan_applications
            WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(application_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)?;

        let subject = super::fetch_subject(&mut *tx, organization_id, applicant)
            .await?
            .ok_or(WorkflowError::SubjectNotFound)?;

        engine::loan::revalidate_caps(&subject, &policy, amount, period)?;
        tx.commit().await?;
    } else if patch.amount.is_some() || patch.repayment_period.is_some() {
        warn!(
            application_id,
            "Partial loan patch bypasses cap re-validation"
        );
    }

    let mut set = PatchSet::new();
    set.set_opt("amount", patch.amount, SqlValue::F64);
    set.set_opt("repayment_period", patch.repayment_period, SqlValue::U32);
    set.set_opt("monthly_deduction", patch.monthly_deduction, SqlValue::F64);
    set.set_opt("reason", patch.reason, SqlValue::String);

    if set.is_empty() {
        return fetch_application(pool, organization_id, application_id)
            .await?
            .ok_or(WorkflowError::ApplicationNotFound);
    }

    let update = build_guarded_update(
        "loan_applications",
        set,
        "id = ? AND organization_id = ? AND status = 'pending' AND deleted_at IS NULL",
        vec![SqlValue::U64(application_id), SqlValue::U64(organization_id)],
    );

    let affected = execute_update(pool, update).await?;
    if affected == 0 {
        let status = super::leave::current_status(
            pool,
            "loan_applications",
            organization_id,
            application_id,
        )
        .await?;
        return Err(match status {
            Some(s) if s != ApplicationStatus::Pending => WorkflowError::ApplicationLocked,
            _ => WorkflowError::ApplicationNotFound,
        });
    }

    fetch_application(pool, organization_id, application_id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)
}

/// Approve or reject a pending loan; same conditional-update guard as leave.
/// The decision notification is intentionally generic.
pub async fn change_status(
    pool: &MySqlPool,
    notifier: &Notifier,
    organization_id: u64,
    application_id: u64,
    decision: ReviewDecision,
    reviewed_by: u64,
) -> Result<LoanApplication, WorkflowError> {
    let status = decision.as_status();

    let affected = sqlx::query(
        r#"
        UPDATE loan_applications
        SET status = ?, reviewed_by = ?, reviewed_at = NOW()
        WHERE id = ? AND organization_id = ? AND status = 'pending' AND deleted_at IS NULL
        "#,
    )
    .bind(status.as_str())
    .bind(reviewed_by)
    .bind(application_id)
    .bind(organization_id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        let current = super::leave::current_status(
            pool,
            "loan_applications",
            organization_id,
            application_id,
        )
        .await?;
        return Err(match current {
            Some(s) if s != ApplicationStatus::Pending => WorkflowError::InvalidTransition,
            _ => WorkflowError::ApplicationNotFound,
        });
    }

    let application = fetch_application(pool, organization_id, application_id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)?;

    info!(
        application_id,
        reviewed_by,
        status = %status,
        "Loan application reviewed"
    );

    notifier.publish(NotificationEvent::LoanDecided {
        organization_id,
        applicant_user_id: application.user_id,
        status,
    });

    Ok(application)
}

pub async fn soft_delete(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<(), WorkflowError> {
    let affected = sqlx::query(
        r#"
        UPDATE loan_applications
        SET deleted_at = NOW()
        WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(application_id)
    .bind(organization_id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(WorkflowError::ApplicationNotFound);
    }
    Ok(())
}

/// "How many loans do I have left" for the UI; reads the policy through the
/// cache since nothing here writes.
pub async fn allowance(
    pool: &MySqlPool,
    organization_id: u64,
    user_id: u64,
) -> Result<Allowance, WorkflowError> {
    let policy = match policy_cache::get(organization_id).await {
        Some(p) => p,
        None => {
            let mut conn = pool.acquire().await?;
            let policy = get_or_create_policy(&mut conn, organization_id).await?;
            policy_cache::put(policy.clone()).await;
            policy
        }
    };

    let mut conn = pool.acquire().await?;
    let subject = super::fetch_subject(&mut conn, organization_id, user_id)
        .await?
        .ok_or(WorkflowError::SubjectNotFound)?;

    let today: NaiveDate = Utc::now().date_naive();
    Ok(engine::loan::allowance(&subject, &policy, today))
}

pub async fn fetch_application(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<Option<LoanApplication>, WorkflowError> {
    let mut conn = pool.acquire().await?;
    Ok(fetch_application_conn(&mut conn, organization_id, application_id).await?)
}

async fn fetch_application_conn(
    conn: &mut MySqlConnection,
    organization_id: u64,
    application_id: u64,
) -> Result<Option<LoanApplication>, sqlx::Error> {
    sqlx::query_as::<_, LoanApplication>(
        r#"
        SELECT id, organization_id, user_id, amount, repayment_period, monthly_deduction,
               reason, status, reviewed_by, reviewed_at, created_at
        FROM loan_applications
        WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(application_id)
    .bind(organization_id)
    .fetch_optional(conn)
    .await
}

/// Every organization has exactly one loan policy row. A missing row is
/// created with zero caps, which forbids all loans until configured.
pub async fn get_or_create_policy(
    conn: &mut MySqlConnection,
    organization_id: u64,
) -> Result<LoanPolicy, WorkflowError> {
    if let Some(policy) = fetch_policy(conn, organization_id).await? {
        return Ok(policy);
    }

    sqlx::query(
        r#"
        INSERT INTO loan_settings (organization_id, max_percentage, max_repayment_months, number_of_times)
        VALUES (?, 0, 0, 0)
        "#,
    )
    .bind(organization_id)
    .execute(&mut *conn)
    .await?;

    fetch_policy(conn, organization_id)
        .await?
        .ok_or(WorkflowError::PolicyNotFound)
}

async fn fetch_policy(
    conn: &mut MySqlConnection,
    organization_id: u64,
) -> Result<Option<LoanPolicy>, sqlx::Error> {
    sqlx::query_as::<_, LoanPolicy>(
        r#"
        SELECT id, organization_id, max_percentage, max_repayment_months, number_of_times
        FROM loan_settings
        WHERE organization_id = ?
        "#,
    )
    .bind(organization_id)
    .fetch_optional(conn)
    .await
}

const POLICY_LOCK_SQL: &str = r#"
        SELECT id, organization_id, max_percentage, max_repayment_months, number_of_times
        FROM loan_settings
        WHERE organization_id = ?
        FOR UPDATE"#;

/// Policy read for the submit path. The exclusive row lock acts as a
/// per-organization mutex; the later count read in the same transaction
/// takes its snapshot after the lock is granted, so it sees every committed
/// application.
async fn lock_policy(
    conn: &mut MySqlConnection,
    organization_id: u64,
) -> Result<LoanPolicy, WorkflowError> {
    if let Some(policy) = sqlx::query_as::<_, LoanPolicy>(POLICY_LOCK_SQL)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok(policy);
    }

    // First submission for this organization; create the zero-cap row.
    // INSERT IGNORE tolerates a concurrent creator racing past the select.
    sqlx::query(
        r#"
        INSERT IGNORE INTO loan_settings (organization_id, max_percentage, max_repayment_months, number_of_times)
        VALUES (?, 0, 0, 0)
        "#,
    )
    .bind(organization_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query_as::<_, LoanPolicy>(POLICY_LOCK_SQL)
        .bind(organization_id)
        .fetch_optional(conn)
        .await?
        .ok_or(WorkflowError::PolicyNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_path_reads_policy_under_exclusive_lock() {
        assert!(POLICY_LOCK_SQL.contains("FROM loan_settings"));
        assert!(POLICY_LOCK_SQL.trim_end().ends_with("FOR UPDATE"));
    }
}
