pub mod leave;
pub mod loan;
pub mod notifier;

use sqlx::MySqlConnection;

use crate::model::staff::Subject;

/// Load the applicant's evaluable profile: salary, designation role level,
/// and the all-time (non-deleted) loan application count.
pub(crate) async fn fetch_subject(
    conn: &mut MySqlConnection,
    organization_id: u64,
    user_id: u64,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        r#"
        SELECT
            sp.id AS staff_id,
            sp.user_id,
            sp.full_name,
            sp.amount_per_month,
            CAST(COALESCE(d.role_level, 0) AS UNSIGNED) AS role_level,
            CAST((SELECT COUNT(*)
                  FROM loan_applications la
                  WHERE la.user_id = sp.user_id
                    AND la.organization_id = sp.organization_id
                    AND la.deleted_at IS NULL) AS UNSIGNED) AS number_of_loans
        FROM staff_profiles sp
        LEFT JOIN designations d ON d.id = sp.designation_id
        WHERE sp.organization_id = ? AND sp.user_id = ?
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}
