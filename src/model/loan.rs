use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The single per-organization loan policy.
///
/// A missing row means the organization has not configured loans yet; the
/// service lazily creates it with zero caps, which disallows all loans until
/// an admin edits it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LoanPolicy {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub organization_id: u64,
    /// Cap on the loan amount as a percentage of monthly salary (0-100).
    #[schema(example = 50.0)]
    pub max_percentage: f64,
    #[schema(example = 12)]
    pub max_repayment_months: u32,
    /// Cap on the number of loan applications per subject.
    #[schema(example = 2)]
    pub number_of_times: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LoanApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub organization_id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = 50000.0)]
    pub amount: f64,
    /// Repayment period in months.
    #[schema(example = 12)]
    pub repayment_period: u32,
    #[schema(example = 4200.0, nullable = true)]
    pub monthly_deduction: Option<f64>,
    #[schema(example = "Medical expenses", nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(example = 7, nullable = true)]
    pub reviewed_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
