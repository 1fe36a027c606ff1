use crate::api::error_response;
use crate::auth::auth::AuthUser;
use crate::model::leave::LeavePolicy;
use crate::model::loan::LoanPolicy;
use crate::service::loan as loan_service;
use crate::utils::db_utils::{PatchSet, SqlValue, build_guarded_update, execute_update};
use crate::utils::policy_cache;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeavePolicy {
    #[schema(example = "Annual Leave")]
    pub name: String,
    #[schema(example = "paid")]
    pub leave_type: Option<String>,
    #[schema(example = 20)]
    pub duration: u32,
    #[schema(example = "both")]
    pub applicable_to: Option<String>,
    /// Role-level ceiling; defaults to 0 (unrestricted level).
    #[schema(example = 2)]
    pub role_level: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeavePolicy {
    pub name: Option<String>,
    pub leave_type: Option<String>,
    pub duration: Option<u32>,
    pub applicable_to: Option<String>,
    pub role_level: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpsertLoanPolicy {
    #[schema(example = 50.0)]
    pub max_percentage: f64,
    #[schema(example = 12)]
    pub max_repayment_months: u32,
    #[schema(example = 2)]
    pub number_of_times: u32,
}

/* =========================
Leave policies
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/policy/leave",
    responses(
        (status = 200, description = "Leave policies for the organization", body = [LeavePolicy])
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn list_leave_policies(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let policies = sqlx::query_as::<_, LeavePolicy>(
        r#"
        SELECT id, organization_id, name, leave_type, duration, applicable_to, role_level
        FROM leave_settings
        WHERE organization_id = ? AND deleted_at IS NULL
        ORDER BY name
        "#,
    )
    .bind(auth.organization_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list leave policies");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(policies))
}

#[utoipa::path(
    post,
    path = "/api/v1/policy/leave",
    request_body = CreateLeavePolicy,
    responses(
        (status = 201, description = "Leave policy created"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn create_leave_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeavePolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payload = payload.into_inner();

    sqlx::query(
        r#"
        INSERT INTO leave_settings
            (organization_id, name, leave_type, duration, applicable_to, role_level)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.organization_id)
    .bind(&payload.name)
    .bind(payload.leave_type.as_deref().unwrap_or("paid"))
    .bind(payload.duration)
    .bind(payload.applicable_to.as_deref().unwrap_or("both"))
    .bind(payload.role_level.unwrap_or(0))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create leave policy");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave policy created"
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/policy/leave/{policy_id}",
    params(("policy_id" = u64, Path, description = "Leave policy ID")),
    request_body = UpdateLeavePolicy,
    responses(
        (status = 200, description = "Leave policy updated"),
        (status = 404, description = "Policy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn update_leave_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateLeavePolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let policy_id = path.into_inner();
    let body = body.into_inner();

    let mut set = PatchSet::new();
    set.set_opt("name", body.name, SqlValue::String);
    set.set_opt("leave_type", body.leave_type, SqlValue::String);
    set.set_opt("duration", body.duration, SqlValue::U32);
    set.set_opt("applicable_to", body.applicable_to, SqlValue::String);
    set.set_opt("role_level", body.role_level, SqlValue::U32);

    if set.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No fields provided for update"
        })));
    }

    let update = build_guarded_update(
        "leave_settings",
        set,
        "id = ? AND organization_id = ? AND deleted_at IS NULL",
        vec![
            SqlValue::U64(policy_id),
            SqlValue::U64(auth.organization_id),
        ],
    );

    let affected = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, policy_id, "Failed to update leave policy");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave policy not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave policy updated"
    })))
}

/// Policies referenced by applications are tombstoned, never removed.
#[utoipa::path(
    delete,
    path = "/api/v1/policy/leave/{policy_id}",
    params(("policy_id" = u64, Path, description = "Leave policy ID")),
    responses(
        (status = 200, description = "Leave policy deleted"),
        (status = 404, description = "Policy not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn delete_leave_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let policy_id = path.into_inner();

    let affected = sqlx::query(
        r#"
        UPDATE leave_settings
        SET deleted_at = NOW()
        WHERE id = ? AND organization_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(policy_id)
    .bind(auth.organization_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, policy_id, "Failed to delete leave policy");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?
    .rows_affected();

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Leave policy not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave policy deleted"
    })))
}

/* =========================
Loan policy (one per organization)
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/policy/loan",
    responses(
        (status = 200, description = "The organization's loan policy", body = LoanPolicy)
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn get_loan_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match loan_service::get_or_create_policy(&mut conn, auth.organization_id).await {
        Ok(policy) => Ok(HttpResponse::Ok().json(policy)),
        Err(e) => Ok(error_response(&e)),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/policy/loan",
    request_body = UpsertLoanPolicy,
    responses(
        (status = 200, description = "Loan policy saved", body = LoanPolicy),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Policy"
)]
pub async fn upsert_loan_policy(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpsertLoanPolicy>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let payload = payload.into_inner();

    sqlx::query(
        r#"
        INSERT INTO loan_settings
            (organization_id, max_percentage, max_repayment_months, number_of_times)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            max_percentage = VALUES(max_percentage),
            max_repayment_months = VALUES(max_repayment_months),
            number_of_times = VALUES(number_of_times)
        "#,
    )
    .bind(auth.organization_id)
    .bind(payload.max_percentage)
    .bind(payload.max_repayment_months)
    .bind(payload.number_of_times)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to upsert loan policy");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Stale cap reads only confuse the allowance endpoint.
    policy_cache::invalidate(auth.organization_id).await;

    let mut conn = pool.acquire().await.map_err(|e| {
        error!(error = %e, "Failed to acquire connection");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match loan_service::get_or_create_policy(&mut conn, auth.organization_id).await {
        Ok(policy) => Ok(HttpResponse::Ok().json(policy)),
        Err(e) => Ok(error_response(&e)),
    }
}
