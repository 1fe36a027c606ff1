use chrono::NaiveDate;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    U64(u64),
    U32(u32),
    F64(f64),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// Typed patch for a guarded UPDATE
/// ===============================
///
/// Columns are compile-time literals supplied by the caller, never derived
/// from request payloads, so the generated SQL only ever touches whitelisted
/// fields.
#[derive(Debug, Default)]
pub struct PatchSet {
    assignments: Vec<(&'static str, SqlValue)>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: SqlValue) {
        self.assignments.push((column, value));
    }

    /// Convenience for Option-typed patch fields.
    pub fn set_opt<T, F>(&mut self, column: &'static str, value: Option<T>, into: F)
    where
        F: FnOnce(T) -> SqlValue,
    {
        if let Some(v) = value {
            self.assignments.push((column, into(v)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Build `UPDATE {table} SET ... WHERE {guard}`.
///
/// The guard carries the precondition (row identity, tenancy, and the
/// status='pending' check), so a stale row simply matches zero rows instead
/// of racing a separate read.
pub fn build_guarded_update(
    table: &str,
    patch: PatchSet,
    guard: &str,
    guard_values: Vec<SqlValue>,
) -> SqlUpdate {
    let set_clause = patch
        .assignments
        .iter()
        .map(|(col, _)| format!("{} = ?", col))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {}", table, set_clause, guard);

    let mut values: Vec<SqlValue> = patch.assignments.into_iter().map(|(_, v)| v).collect();
    values.extend(guard_values);

    SqlUpdate { sql, values }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::U32(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_update_with_guard_binds_appended() {
        let mut patch = PatchSet::new();
        patch.set("reason", SqlValue::String("moved dates".into()));
        patch.set_opt("start_date", Some(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()), SqlValue::Date);
        patch.set_opt("end_date", None::<NaiveDate>, SqlValue::Date);

        let update = build_guarded_update(
            "leave_applications",
            patch,
            "id = ? AND organization_id = ? AND status = 'pending' AND deleted_at IS NULL",
            vec![SqlValue::U64(9), SqlValue::U64(1)],
        );

        assert_eq!(
            update.sql,
            "UPDATE leave_applications SET reason = ?, start_date = ? \
             WHERE id = ? AND organization_id = ? AND status = 'pending' AND deleted_at IS NULL"
        );
        assert_eq!(update.values.len(), 4);
    }

    #[test]
    fn empty_patch_is_detectable() {
        assert!(PatchSet::new().is_empty());
        let mut patch = PatchSet::new();
        patch.set_opt("amount", None::<f64>, SqlValue::F64);
        assert!(patch.is_empty());
        patch.set("amount", SqlValue::F64(1.0));
        assert!(!patch.is_empty());
    }
}
