use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named leave policy configured by an organization.
///
/// `role_level` is a ceiling: staff whose designation level is above it may
/// not use this policy. `duration` caps the working days a single
/// application may span.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeavePolicy {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub organization_id: u64,
    #[schema(example = "Annual Leave")]
    pub name: String,
    #[schema(example = "paid")]
    pub leave_type: String,
    /// Maximum working days a single application may cover.
    #[schema(example = 20)]
    pub duration: u32,
    #[schema(example = "both")]
    pub applicable_to: String,
    /// Highest designation role level allowed to use this policy; 0 means
    /// unrestricted (only level-0 staff qualify under the ceiling rule).
    #[schema(example = 2)]
    pub role_level: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub organization_id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = 1)]
    pub leave_setting_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family visit", nullable = true)]
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
