use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The slice of a staff profile the eligibility engines evaluate.
///
/// `role_level` comes from the profile's designation (0 when the profile has
/// no designation). `number_of_loans` is the all-time count of the subject's
/// loan applications, any status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    #[schema(example = 10)]
    pub staff_id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = 100000.0, nullable = true)]
    pub amount_per_month: Option<f64>,
    #[schema(example = 2)]
    pub role_level: u32,
    #[schema(example = 1)]
    pub number_of_loans: u32,
}
