use crate::api::error_response;
use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveApplication;
use crate::model::status::ReviewDecision;
use crate::service::leave::{LeavePatch, SubmitLeave};
use crate::service::notifier::Notifier;
use crate::service::leave as leave_service;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Applicant; defaults to the caller. Only HR/Admin may submit for
    /// someone else.
    #[schema(example = 42)]
    pub user_id: Option<u64>,
    #[schema(example = 1)]
    pub leave_setting_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family visit")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = 2)]
    pub leave_setting_id: Option<u64>,
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "Dates moved")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by applicant user ID
    #[schema(example = 42)]
    pub user_id: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Submit leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = CreateLeave,
    responses(
        (status = 200, description = "Leave application submitted", body = LeaveApplication),
        (status = 400, description = "Eligibility rule violated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let user_id = match payload.user_id {
        Some(id) if id != auth.user_id => {
            auth.require_hr_or_admin()?;
            id
        }
        _ => auth.user_id,
    };

    let input = SubmitLeave {
        user_id,
        leave_setting_id: payload.leave_setting_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        reason: payload.reason,
    };

    match leave_service::submit(pool.get_ref(), notifier.get_ref(), auth.organization_id, input)
        .await
    {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Edit leave application (only while pending)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave application updated", body = LeaveApplication),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is no longer pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateLeave>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    if let Err(resp) = require_owner_or_reviewer(&auth, pool.get_ref(), leave_id).await {
        return Ok(resp);
    }

    let body = body.into_inner();
    let patch = LeavePatch {
        leave_setting_id: body.leave_setting_id,
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason,
    };

    match leave_service::edit(pool.get_ref(), auth.organization_id, leave_id, patch).await {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave approved", body = LeaveApplication),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review_leave(auth, pool, notifier, path.into_inner(), ReviewDecision::Approved).await
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveApplication),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review_leave(auth, pool, notifier, path.into_inner(), ReviewDecision::Rejected).await
}

async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    leave_id: u64,
    decision: ReviewDecision,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    match leave_service::change_status(
        pool.get_ref(),
        notifier.get_ref(),
        auth.organization_id,
        leave_id,
        decision,
        auth.user_id,
    )
    .await
    {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    match leave_service::fetch_application(pool.get_ref(), auth.organization_id, leave_id).await {
        Ok(Some(application)) => {
            if application.user_id != auth.user_id {
                auth.require_hr_or_admin()?;
            }
            Ok(HttpResponse::Ok().json(application))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave application not found"
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Soft delete
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    if let Err(resp) = require_owner_or_reviewer(&auth, pool.get_ref(), leave_id).await {
        return Ok(resp);
    }

    match leave_service::soft_delete(pool.get_ref(), auth.organization_id, leave_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Successfully deleted"
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // Staff may list their own applications; anything wider needs HR/Admin.
    match query.user_id {
        Some(id) if id == auth.user_id => {}
        _ => auth.require_hr_or_admin()?,
    }

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE organization_id = ? AND deleted_at IS NULL");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_applications{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(auth.organization_id);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count leave applications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT id, organization_id, user_id, leave_setting_id, start_date, end_date,
               reason, status, reviewed_by, reviewed_at, created_at
        FROM leave_applications
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q =
        sqlx::query_as::<_, LeaveApplication>(&data_sql).bind(auth.organization_id);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let applications = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: applications,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// Applicants may touch their own applications; reviewers anyone's.
async fn require_owner_or_reviewer(
    auth: &AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
) -> Result<(), HttpResponse> {
    match leave_service::fetch_application(pool, auth.organization_id, leave_id).await {
        Ok(Some(application)) if application.user_id == auth.user_id => Ok(()),
        Ok(Some(_)) => auth
            .require_hr_or_admin()
            .map_err(HttpResponse::from_error),
        Ok(None) => Err(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave application not found"
        }))),
        Err(e) => Err(error_response(&e)),
    }
}
