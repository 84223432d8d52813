//! # Tax Rule Repository
//!
//! Date-effective tax rules per category.
//!
//! ## Storage
//! ```text
//! tax_rules
//! ┌──────────┬──────────┬──────────┬────────────────┐
//! │ tenant   │ category │ rate_bps │ effective_date │
//! ├──────────┼──────────┼──────────┼────────────────┤
//! │ t1       │ FOOD     │ 1200     │ 2022-01-01     │
//! │ t1       │ FOOD     │ 1800     │ 2023-01-01     │ ← legislative change
//! │ t1       │ ALCOHOL  │ 2500     │ 2022-01-01     │
//! └──────────┴──────────┴──────────┴────────────────┘
//!   UNIQUE (tenant_id, category, effective_date)
//! ```
//!
//! The repository returns every rule of a category; choosing the one in
//! force at `as_of` is done by the resolver, not in SQL.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use tavola_core::validation::validate_rate_bps;
use tavola_core::{LookupResult, TaxCategory, TaxRate, TaxRule, TaxRuleLookup};

use crate::error::{DbError, DbResult};
use crate::repository::with_timeout;

const STORE: &str = "tax_rules";

const SELECT_RULES: &str = "SELECT id, tenant_id, category, rate_bps, effective_date, created_at \
                            FROM tax_rules WHERE tenant_id = ";

#[derive(Debug, sqlx::FromRow)]
struct TaxRuleRow {
    id: String,
    tenant_id: String,
    category: String,
    rate_bps: i64,
    effective_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaxRuleRow> for TaxRule {
    type Error = DbError;

    fn try_from(row: TaxRuleRow) -> Result<Self, Self::Error> {
        let category =
            TaxCategory::new(&row.category).map_err(|e| DbError::malformed("tax_rule", &row.id, e))?;
        validate_rate_bps(row.rate_bps).map_err(|e| DbError::malformed("tax_rule", &row.id, e))?;

        Ok(TaxRule {
            id: row.id,
            tenant_id: row.tenant_id,
            category,
            rate: TaxRate::from_bps(row.rate_bps as u32),
            effective_date: row.effective_date,
            created_at: row.created_at,
        })
    }
}

/// Repository for tax rule database operations.
#[derive(Debug, Clone)]
pub struct TaxRuleRepository {
    pool: SqlitePool,
    tenant_id: String,
    query_timeout: Duration,
}

impl TaxRuleRepository {
    pub fn new(pool: SqlitePool, tenant_id: impl Into<String>, query_timeout: Duration) -> Self {
        TaxRuleRepository {
            pool,
            tenant_id: tenant_id.into(),
            query_timeout,
        }
    }

    /// Inserts a rule under this repository's tenant.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - a rule already exists for this
    ///   category and effective date
    /// * `DbError::Malformed` - rate above 100%
    pub async fn insert(&self, rule: &TaxRule) -> DbResult<TaxRule> {
        validate_rate_bps(i64::from(rule.rate.bps()))
            .map_err(|e| DbError::malformed("tax_rule", &rule.id, e))?;

        let stored = TaxRule {
            tenant_id: self.tenant_id.clone(),
            ..rule.clone()
        };

        debug!(
            id = %stored.id,
            category = %stored.category,
            rate = %stored.rate,
            effective_date = %stored.effective_date,
            "Inserting tax rule"
        );

        let result = with_timeout(
            self.query_timeout,
            "tax_rules.insert",
            sqlx::query(
                r#"
                INSERT INTO tax_rules (
                    id, tenant_id, category, rate_bps, effective_date, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&stored.id)
            .bind(&stored.tenant_id)
            .bind(&stored.category)
            .bind(i64::from(stored.rate.bps()))
            .bind(stored.effective_date)
            .bind(stored.created_at)
            .execute(&self.pool),
        )
        .await;

        match result {
            Ok(_) => Ok(stored),
            Err(DbError::UniqueViolation { field, .. }) => Err(DbError::duplicate(
                field,
                format!("{}@{}", stored.category, stored.effective_date.to_rfc3339()),
            )),
            Err(other) => Err(other),
        }
    }

    /// Lists every rule of a category, oldest first.
    pub async fn list_for_category(&self, category: &TaxCategory) -> DbResult<Vec<TaxRule>> {
        let categories = BTreeSet::from([category.clone()]);
        let mut rules = self.fetch_rules(&categories).await?;
        Ok(rules.remove(category).unwrap_or_default())
    }

    /// Counts rules for this tenant.
    pub async fn count(&self) -> DbResult<i64> {
        with_timeout(
            self.query_timeout,
            "tax_rules.count",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tax_rules WHERE tenant_id = ?1")
                .bind(&self.tenant_id)
                .fetch_one(&self.pool),
        )
        .await
    }

    async fn fetch_rules(
        &self,
        categories: &BTreeSet<TaxCategory>,
    ) -> DbResult<BTreeMap<TaxCategory, Vec<TaxRule>>> {
        let mut rules: BTreeMap<TaxCategory, Vec<TaxRule>> = categories
            .iter()
            .map(|category| (category.clone(), Vec::new()))
            .collect();
        if categories.is_empty() {
            return Ok(rules);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_RULES);
        builder.push_bind(self.tenant_id.clone());
        builder.push(" AND category IN (");
        let mut labels = builder.separated(", ");
        for category in categories {
            labels.push_bind(category.clone());
        }
        labels.push_unseparated(")");
        builder.push(" ORDER BY category, effective_date");

        let rows = with_timeout(
            self.query_timeout,
            "tax_rules.for_categories",
            builder.build_query_as::<TaxRuleRow>().fetch_all(&self.pool),
        )
        .await?;

        debug!(
            categories = categories.len(),
            rules = rows.len(),
            "Fetched tax rules"
        );

        for row in rows {
            let rule = TaxRule::try_from(row)?;
            rules.entry(rule.category.clone()).or_default().push(rule);
        }
        Ok(rules)
    }
}

impl TaxRuleLookup for TaxRuleRepository {
    async fn rules_for_category(&self, category: &TaxCategory) -> LookupResult<Vec<TaxRule>> {
        self.list_for_category(category)
            .await
            .map_err(|e| e.into_data_access(STORE))
    }

    async fn rules_for_categories(
        &self,
        categories: &BTreeSet<TaxCategory>,
    ) -> LookupResult<BTreeMap<TaxCategory, Vec<TaxRule>>> {
        self.fetch_rules(categories)
            .await
            .map_err(|e| e.into_data_access(STORE))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
