use chrono::NaiveDate;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::info;

use crate::engine;
use crate::engine::error::WorkflowError;
use crate::model::leave::{LeaveApplication, LeavePolicy};
use crate::model::status::{ApplicationStatus, ReviewDecision};
use crate::service::notifier::{NotificationEvent, Notifier};
use crate::utils::db_utils::{PatchSet, SqlValue, build_guarded_update, execute_update};

pub struct SubmitLeave {
    pub user_id: u64,
    pub leave_setting_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Default)]
pub struct LeavePatch {
    pub leave_setting_id: Option<u64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

/// Submit a leave application.
///
/// Policy fetch, subject fetch, rule evaluation, and the insert all run in
/// one transaction, so a failed rule leaves nothing behind and concurrent
/// submissions cannot interleave between check and write. The notification
/// is published only after commit.
pub async fn submit(
    pool: &MySqlPool,
    notifier: &Notifier,
    organization_id: u64,
    input: SubmitLeave,
) -> Result<LeaveApplication, WorkflowError> {
    let mut tx = pool.begin().await?;

    let policy = fetch_policy(&mut *tx, organization_id, input.leave_setting_id)
        .await?
        .ok_or(WorkflowError::PolicyNotFound)?;

    let subject = super::fetch_subject(&mut *tx, organization_id, input.user_id)
        .await?
        .ok_or(WorkflowError::SubjectNotFound)?;

    let working_days =
        engine::leave::evaluate(subject.role_level, &policy, input.start_date, input.end_date)?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_applications
            (organization_id, user_id, leave_setting_id, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(organization_id)
    .bind(input.user_id)
    .bind(input.leave_setting_id)
    .bind(input.start_date)
    .bind(input.end_date)
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
        working_days,
        "Leave application submitted"
    );

    notifier.publish(NotificationEvent::LeaveSubmitted {
        organization_id,
        applicant_name: subject.full_name,
        policy_name: policy.name,
        working_days,
        start_date: input.start_date,
        end_date: input.end_date,
    });

    Ok(application)
}

/// Edit an application that is still pending.
///
/// The pending guard lives in the UPDATE's WHERE clause, so an application
/// that was decided in the meantime matches zero rows instead of being
/// silently overwritten.
pub async fn edit(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
    patch: LeavePatch,
) -> Result<LeaveApplication, WorkflowError> {
    let mut set = PatchSet::new();
    set.set_opt("leave_setting_id", patch.leave_setting_id, SqlValue::U64);
    set.set_opt("start_date", patch.start_date, SqlValue::Date);
    set.set_opt("end_date", patch.end_date, SqlValue::Date);
    set.set_opt("reason", patch.reason, SqlValue::String);

    if set.is_empty() {
        return fetch_application(pool, organization_id, application_id)
            .await?
            .ok_or(WorkflowError::ApplicationNotFound);
    }

    let update = build_guarded_update(
        "leave_applications",
        set,
        "id = ? AND organization_id = ? AND status = 'pending' AND deleted_at IS NULL",
        vec![SqlValue::U64(application_id), SqlValue::U64(organization_id)],
    );

    let affected = execute_update(pool, update).await?;
    if affected == 0 {
        return Err(edit_failure(pool, organization_id, application_id).await?);
    }

    fetch_application(pool, organization_id, application_id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)
}

/// Approve or reject a pending application.
///
/// The transition is a conditional update: only a row still in `pending`
/// is touched, which also closes the read-then-write race on the guard.
pub async fn change_status(
    pool: &MySqlPool,
    notifier: &Notifier,
    organization_id: u64,
    application_id: u64,
    decision: ReviewDecision,
    reviewed_by: u64,
) -> Result<LeaveApplication, WorkflowError> {
    let status = decision.as_status();

    let affected = sqlx::query(
        r#"
        UPDATE leave_applications
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
        return Err(transition_failure(pool, organization_id, application_id).await?);
    }

    let application = fetch_application(pool, organization_id, application_id)
        .await?
        .ok_or(WorkflowError::ApplicationNotFound)?;

    let policy_name = sqlx::query_scalar::<_, String>(
        "SELECT name FROM leave_settings WHERE id = ?",
    )
    .bind(application.leave_setting_id)
    .fetch_optional(pool)
    .await?
    .unwrap_or_else(|| "leave".to_string());

    info!(
        application_id,
        reviewed_by,
        status = %status,
        "Leave application reviewed"
    );

    notifier.publish(NotificationEvent::LeaveDecided {
        organization_id,
        applicant_user_id: application.user_id,
        policy_name,
        status,
    });

    Ok(application)
}

/// Logical delete; the row stays for history and audit.
pub async fn soft_delete(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<(), WorkflowError> {
    let affected = sqlx::query(
        r#"
        UPDATE leave_applications
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

pub async fn fetch_application(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<Option<LeaveApplication>, WorkflowError> {
    let mut conn = pool.acquire().await?;
    Ok(fetch_application_conn(&mut conn, organization_id, application_id).await?)
}

async fn fetch_application_conn(
    conn: &mut MySqlConnection,
    organization_id: u64,
    application_id: u64,
) -> Result<Option<LeaveApplication>, sqlx::Error> {
    sqlx::query_as::<_, LeaveApplication>(
        r#"
        SELECT id, organization_id, user_id, leave_setting_id, start_date, end_date,
               reason, status, reviewed_by, reviewed_at, created_at
        FROM leave_applications
        WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(application_id)
    .bind(organization_id)
    .fetch_optional(conn)
    .await
}

async fn fetch_policy(
    tx: &mut MySqlConnection,
    organization_id: u64,
    leave_setting_id: u64,
) -> Result<Option<LeavePolicy>, sqlx::Error> {
    sqlx::query_as::<_, LeavePolicy>(
        r#"
        SELECT id, organization_id, name, leave_type, duration, applicable_to, role_level
        FROM leave_settings
        WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(leave_setting_id)
    .bind(organization_id)
    .fetch_optional(tx)
    .await
}

/// Distinguish "no such application" from "exists but no longer pending".
async fn edit_failure(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<WorkflowError, WorkflowError> {
    match current_status(pool, "leave_applications", organization_id, application_id).await? {
        Some(status) if status != ApplicationStatus::Pending => Ok(WorkflowError::ApplicationLocked),
        Some(_) | None => Ok(WorkflowError::ApplicationNotFound),
    }
}

async fn transition_failure(
    pool: &MySqlPool,
    organization_id: u64,
    application_id: u64,
) -> Result<WorkflowError, WorkflowError> {
    match current_status(pool, "leave_applications", organization_id, application_id).await? {
        Some(status) if status != ApplicationStatus::Pending => Ok(WorkflowError::InvalidTransition),
        Some(_) | None => Ok(WorkflowError::ApplicationNotFound),
    }
}

pub(crate) async fn current_status(
    pool: &MySqlPool,
    table: &str,
    organization_id: u64,
    application_id: u64,
) -> Result<Option<ApplicationStatus>, WorkflowError> {
    let sql = format!(
        "SELECT status FROM {} WHERE id = ? AND organization_id = ? AND deleted_at IS NULL",
        table
    );
    let raw = sqlx::query_scalar::<_, String>(&sql)
        .bind(application_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

    Ok(raw.and_then(|s| s.parse::<ApplicationStatus>().ok()))
}
