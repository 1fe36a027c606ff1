use crate::api::leave::{CreateLeave, LeaveFilter, LeaveListResponse, UpdateLeave};
use crate::api::loan::{CreateLoan, LoanFilter, LoanListResponse, UpdateLoan};
use crate::api::policy::{CreateLeavePolicy, UpdateLeavePolicy, UpsertLoanPolicy};
use crate::engine::loan::Allowance;
use crate::model::leave::{LeaveApplication, LeavePolicy};
use crate::model::loan::{LoanApplication, LoanPolicy};
use crate::model::status::{ApplicationStatus, ReviewDecision};
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StaffOps API",
        version = "1.0.0",
        description = r#"
## Staff Operations (Leave & Loan) Service

Multi-tenant HR operations backend focused on the leave and loan
application workflows.

### Key Features
- **Leave Applications**
  - Policy-gated submission (role-level ceiling, working-day duration cap)
  - Approve/reject with review audit fields
- **Loan Applications**
  - Salary-percentage, repayment-period, and per-subject count caps
  - Remaining-allowance lookup for UI gating
- **Policy Administration**
  - Named leave policies (soft-deleted), single per-organization loan policy

### Security
Endpoints are protected with **JWT Bearer authentication**; review
operations require **Admin** or **HR** roles.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::create_leave,
        crate::api::leave::update_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::delete_leave,

        crate::api::loan::loan_list,
        crate::api::loan::get_loan,
        crate::api::loan::create_loan,
        crate::api::loan::update_loan,
        crate::api::loan::approve_loan,
        crate::api::loan::reject_loan,
        crate::api::loan::delete_loan,
        crate::api::loan::loan_allowance,

        crate::api::policy::list_leave_policies,
        crate::api::policy::create_leave_policy,
        crate::api::policy::update_leave_policy,
        crate::api::policy::delete_leave_policy,
        crate::api::policy::get_loan_policy,
        crate::api::policy::upsert_loan_policy
    ),
    components(
        schemas(
            ApplicationStatus,
            ReviewDecision,
            LeavePolicy,
            LeaveApplication,
            CreateLeave,
            UpdateLeave,
            LeaveFilter,
            LeaveListResponse,
            LoanPolicy,
            LoanApplication,
            CreateLoan,
            UpdateLoan,
            LoanFilter,
            LoanListResponse,
            Allowance,
            CreateLeavePolicy,
            UpdateLeavePolicy,
            UpsertLoanPolicy
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave application workflow APIs"),
        (name = "Loan", description = "Loan application workflow APIs"),
        (name = "Policy", description = "Leave/loan policy administration APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_PREFIX;

    #[test]
    fn documented_paths_live_under_the_default_prefix() {
        let doc = ApiDoc::openapi();
        for path in doc.paths.paths.keys() {
            assert!(
                path.starts_with(DEFAULT_API_PREFIX),
                "documented path {} is outside {}",
                path,
                DEFAULT_API_PREFIX
            );
        }
    }
}
