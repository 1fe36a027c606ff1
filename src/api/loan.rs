use crate::api::error_response;
use crate::auth::auth::AuthUser;
use crate::engine::loan::Allowance;
use crate::model::loan::LoanApplication;
use crate::model::status::ReviewDecision;
use crate::service::loan as loan_service;
use crate::service::loan::{LoanPatch, SubmitLoan};
use crate::service::notifier::Notifier;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLoan {
    /// Applicant; defaults to the caller. Only HR/Admin may submit for
    /// someone else.
    #[schema(example = 42)]
    pub user_id: Option<u64>,
    #[schema(example = 50000.0)]
    pub amount: f64,
    /// Repayment period in months
    #[schema(example = 12)]
    pub repayment_period: u32,
    #[schema(example = 4200.0)]
    pub monthly_deduction: Option<f64>,
    #[schema(example = "Medical expenses")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLoan {
    #[schema(example = 45000.0)]
    pub amount: Option<f64>,
    #[schema(example = 10)]
    pub repayment_period: Option<u32>,
    #[schema(example = 4500.0)]
    pub monthly_deduction: Option<f64>,
    #[schema(example = "Revised amount")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LoanFilter {
    /// Filter by applicant user ID
    #[schema(example = 42)]
    pub user_id: Option<u64>,
    /// Filter by status
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct LoanListResponse {
    pub data: Vec<LoanApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Submit loan application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/loan",
    request_body = CreateLoan,
    responses(
        (status = 200, description = "Loan application submitted", body = LoanApplication),
        (status = 400, description = "Eligibility rule violated"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn create_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    payload: web::Json<CreateLoan>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();

    let user_id = match payload.user_id {
        Some(id) if id != auth.user_id => {
            auth.require_hr_or_admin()?;
            id
        }
        _ => auth.user_id,
    };

    let input = SubmitLoan {
        user_id,
        amount: payload.amount,
        repayment_period: payload.repayment_period,
        monthly_deduction: payload.monthly_deduction,
        reason: payload.reason,
    };

    match loan_service::submit(pool.get_ref(), notifier.get_ref(), auth.organization_id, input)
        .await
    {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Update loan application (only while pending)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/loan/{loan_id}",
    params(("loan_id" = u64, Path, description = "Loan application ID")),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan application updated", body = LoanApplication),
        (status = 400, description = "Cap violated"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application is no longer pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn update_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateLoan>,
) -> actix_web::Result<impl Responder> {
    let loan_id = path.into_inner();

    if let Err(resp) = require_owner_or_admin(&auth, pool.get_ref(), loan_id).await {
        return Ok(resp);
    }

    let body = body.into_inner();
    let patch = LoanPatch {
        amount: body.amount,
        repayment_period: body.repayment_period,
        monthly_deduction: body.monthly_deduction,
        reason: body.reason,
    };

    match loan_service::update(pool.get_ref(), auth.organization_id, loan_id, patch).await {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Approve loan (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/loan/{loan_id}/approve",
    params(("loan_id" = u64, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Loan approved", body = LoanApplication),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn approve_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review_loan(auth, pool, notifier, path.into_inner(), ReviewDecision::Approved).await
}

/* =========================
Reject loan (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/loan/{loan_id}/reject",
    params(("loan_id" = u64, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Loan rejected", body = LoanApplication),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn reject_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review_loan(auth, pool, notifier, path.into_inner(), ReviewDecision::Rejected).await
}

async fn review_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    notifier: web::Data<Notifier>,
    loan_id: u64,
    decision: ReviewDecision,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    match loan_service::change_status(
        pool.get_ref(),
        notifier.get_ref(),
        auth.organization_id,
        loan_id,
        decision,
        auth.user_id,
    )
    .await
    {
        Ok(application) => Ok(HttpResponse::Ok().json(application)),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Remaining-loans allowance (for UI gating)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/loan/allowance",
    responses(
        (status = 200, description = "Remaining loan allowance", body = Allowance),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn loan_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    match loan_service::allowance(pool.get_ref(), auth.organization_id, auth.user_id).await {
        Ok(allowance) => Ok(HttpResponse::Ok().json(allowance)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/loan/{loan_id}",
    params(("loan_id" = u64, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Loan application found", body = LoanApplication),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn get_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let loan_id = path.into_inner();

    match loan_service::fetch_application(pool.get_ref(), auth.organization_id, loan_id).await {
        Ok(Some(application)) => {
            if application.user_id != auth.user_id {
                auth.require_admin()?;
            }
            Ok(HttpResponse::Ok().json(application))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Loan application not found"
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

/* =========================
Soft delete
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/loan/{loan_id}",
    params(("loan_id" = u64, Path, description = "Loan application ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn delete_loan(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let loan_id = path.into_inner();

    if let Err(resp) = require_owner_or_admin(&auth, pool.get_ref(), loan_id).await {
        return Ok(resp);
    }

    match loan_service::soft_delete(pool.get_ref(), auth.organization_id, loan_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Successfully deleted"
        }))),
        Err(e) => Ok(error_response(&e)),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/loan",
    params(LoanFilter),
    responses(
        (status = 200, description = "Paginated loan list", body = LoanListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Loan"
)]
pub async fn loan_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LoanFilter>,
) -> actix_web::Result<impl Responder> {
    match query.user_id {
        Some(id) if id == auth.user_id => {}
        _ => auth.require_admin()?,
    }

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

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

    let count_sql = format!("SELECT COUNT(*) FROM loan_applications{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(auth.organization_id);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count loan applications");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, organization_id, user_id, amount, repayment_period, monthly_deduction,
               reason, status, reviewed_by, reviewed_at, created_at
        FROM loan_applications
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LoanApplication>(&data_sql).bind(auth.organization_id);
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
            tracing::error!(error = %e, "Failed to fetch loan list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LoanListResponse {
        data: applications,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

async fn require_owner_or_admin(
    auth: &AuthUser,
    pool: &MySqlPool,
    loan_id: u64,
) -> Result<(), HttpResponse> {
    match loan_service::fetch_application(pool, auth.organization_id, loan_id).await {
        Ok(Some(application)) if application.user_id == auth.user_id => Ok(()),
        Ok(Some(_)) => auth.require_admin().map_err(HttpResponse::from_error),
        Ok(None) => Err(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Loan application not found"
        }))),
        Err(e) => Err(error_response(&e)),
    }
}
