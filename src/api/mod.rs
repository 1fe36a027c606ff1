pub mod leave;
pub mod loan;
pub mod policy;

use actix_web::HttpResponse;
use serde_json::json;
use tracing::error;

use crate::engine::error::{ErrorClass, WorkflowError};

/// Map a workflow failure onto an HTTP response.
///
/// Rule violations are actionable, so the user sees the exact message.
/// Precondition failures are configuration problems: the user gets a
/// generic answer and the detail goes to the server log.
pub(crate) fn error_response(err: &WorkflowError) -> HttpResponse {
    match err.class() {
        ErrorClass::Precondition => {
            error!(error = %err, "Workflow precondition failed");
            HttpResponse::InternalServerError().json(json!({
                "message": "Something went wrong, please try again later"
            }))
        }
        ErrorClass::Rule => HttpResponse::BadRequest().json(json!({
            "message": err.to_string()
        })),
        ErrorClass::State => match err {
            WorkflowError::ApplicationNotFound => HttpResponse::NotFound().json(json!({
                "message": err.to_string()
            })),
            _ => HttpResponse::Conflict().json(json!({
                "message": err.to_string()
            })),
        },
        ErrorClass::Internal => {
            error!(error = %err, "Workflow operation failed");
            HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            }))
        }
    }
}
