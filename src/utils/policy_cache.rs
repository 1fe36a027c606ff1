use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::loan::LoanPolicy;

/// organization_id => its single loan policy.
///
/// Read-mostly config, so a short TTL is enough; writes go through
/// `invalidate` anyway. Only the read-only allowance path uses this cache;
/// submissions read the policy inside their own transaction.
pub static LOAN_POLICY_CACHE: Lazy<Cache<u64, LoanPolicy>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(600)) // 10 min TTL
        .build()
});

pub async fn get(organization_id: u64) -> Option<LoanPolicy> {
    LOAN_POLICY_CACHE.get(&organization_id).await
}

pub async fn put(policy: LoanPolicy) {
    LOAN_POLICY_CACHE
        .insert(policy.organization_id, policy)
        .await;
}

/// Drop the cached entry after an admin edits the policy.
pub async fn invalidate(organization_id: u64) {
    LOAN_POLICY_CACHE.invalidate(&organization_id).await;
}

/// Load every configured loan policy into the cache at boot (streamed).
pub async fn warmup_loan_policy_cache(pool: &MySqlPool) -> Result<()> {
    let mut stream = sqlx::query_as::<_, LoanPolicy>(
        r#"
        SELECT id, organization_id, max_percentage, max_repayment_months, number_of_times
        FROM loan_settings
        "#,
    )
    .fetch(pool);

    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let policy = row?;
        put(policy).await;
        total += 1;
    }

    log::info!("Loan policy cache warmup complete: {} organizations", total);

    Ok(())
}
