//! # Repository Module
//!
//! SQLite implementations of the tax engine's read collaborators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TaxRateResolver                                                        │
//! │       │                                                                 │
//! │       ├── ProductTaxLookup ──► ProductRepository                        │
//! │       │                          insert / get_by_id / count             │
//! │       │                          tax_categories: one IN (...) query     │
//! │       │                                                                 │
//! │       └── TaxRuleLookup ─────► TaxRuleRepository                        │
//! │                                  insert / list_for_category / count     │
//! │                                  rules_for_categories: one IN (...)     │
//! │                                                                         │
//! │  Every query: tenant scoped, wrapped in tokio::time::timeout            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{DbError, DbResult};

pub mod product;
pub mod tax_rule;

/// Runs a query future with an upper bound on its duration.
///
/// Expiry drops the future (cancelling the query) and yields
/// [`DbError::Timeout`]; sqlx errors are mapped through `From<sqlx::Error>`.
pub(crate) async fn with_timeout<T, F>(
    timeout: Duration,
    operation: &'static str,
    query: F,
) -> DbResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, query).await {
        Ok(result) => result.map_err(DbError::from),
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!(operation, timeout_ms, "Query timed out");
            Err(DbError::Timeout {
                operation,
                timeout_ms,
            })
        }
    }
}
