//! # In-Memory Tax Store
//!
//! A [`ProductTaxLookup`] + [`TaxRuleLookup`] implementation backed by
//! process memory. Used by unit tests, previews and tooling that should not
//! need SQLite.
//!
//! It enforces the same `(tenant_id, category, effective_date)` uniqueness
//! as the database and can be told to fail lookups, which lets callers
//! exercise their data-access error paths.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::{DataAccessError, ValidationError};
use crate::lookup::{LookupResult, ProductTaxLookup, TaxRuleLookup};
use crate::types::{TaxCategory, TaxRule};
use crate::validation::{validate_rate_bps, ValidationResult};

#[derive(Debug, Default)]
struct StoreState {
    products: HashMap<String, Option<TaxCategory>>,
    rules: Vec<TaxRule>,
    product_failure: Option<DataAccessError>,
    rule_failure: Option<DataAccessError>,
}

/// Thread-safe in-memory product and rule store.
#[derive(Debug, Default)]
pub struct InMemoryTaxStore {
    state: RwLock<StoreState>,
    product_lookups: AtomicUsize,
    rule_lookups: AtomicUsize,
}

impl InMemoryTaxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a product and its category (`None` = untaxed).
    pub fn set_product_category(&self, product_id: impl Into<String>, category: Option<TaxCategory>) {
        self.write().products.insert(product_id.into(), category);
    }

    /// Adds a rule, rejecting rates above 100% and a second rule for the
    /// same tenant, category and effective date.
    pub fn insert_rule(&self, rule: TaxRule) -> ValidationResult<()> {
        validate_rate_bps(i64::from(rule.rate.bps()))?;
        let mut state = self.write();

        let clash = state.rules.iter().any(|existing| {
            existing.tenant_id == rule.tenant_id
                && existing.category == rule.category
                && existing.effective_date == rule.effective_date
        });
        if clash {
            return Err(ValidationError::Duplicate {
                field: "tax_rule".to_string(),
                value: format!("{}@{}", rule.category, rule.effective_date.to_rfc3339()),
            });
        }

        state.rules.push(rule);
        Ok(())
    }

    /// Makes every following product lookup fail with `error`.
    pub fn fail_product_lookups(&self, error: DataAccessError) {
        self.write().product_failure = Some(error);
    }

    /// Makes every following rule lookup fail with `error`.
    pub fn fail_rule_lookups(&self, error: DataAccessError) {
        self.write().rule_failure = Some(error);
    }

    /// Clears injected failures.
    pub fn heal(&self) {
        let mut state = self.write();
        state.product_failure = None;
        state.rule_failure = None;
    }

    /// Number of product lookup calls served (a batch counts once).
    pub fn product_lookups(&self) -> usize {
        self.product_lookups.load(Ordering::Relaxed)
    }

    /// Number of rule lookup calls served (a batch counts once).
    pub fn rule_lookups(&self) -> usize {
        self.rule_lookups.load(Ordering::Relaxed)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn category_of(&self, product_id: &str) -> LookupResult<Option<TaxCategory>> {
        let state = self.read();
        if let Some(err) = &state.product_failure {
            return Err(err.clone());
        }
        Ok(state.products.get(product_id).cloned().flatten())
    }

    fn rules_of(&self, category: &TaxCategory) -> LookupResult<Vec<TaxRule>> {
        let state = self.read();
        if let Some(err) = &state.rule_failure {
            return Err(err.clone());
        }
        Ok(state
            .rules
            .iter()
            .filter(|rule| &rule.category == category)
            .cloned()
            .collect())
    }
}

impl ProductTaxLookup for InMemoryTaxStore {
    async fn tax_category(&self, product_id: &str) -> LookupResult<Option<TaxCategory>> {
        self.product_lookups.fetch_add(1, Ordering::Relaxed);
        self.category_of(product_id)
    }

    async fn tax_categories(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> LookupResult<BTreeMap<String, Option<TaxCategory>>> {
        self.product_lookups.fetch_add(1, Ordering::Relaxed);
        product_ids
            .iter()
            .map(|id| Ok((id.clone(), self.category_of(id)?)))
            .collect()
    }
}

impl TaxRuleLookup for InMemoryTaxStore {
    async fn rules_for_category(&self, category: &TaxCategory) -> LookupResult<Vec<TaxRule>> {
        self.rule_lookups.fetch_add(1, Ordering::Relaxed);
        self.rules_of(category)
    }

    async fn rules_for_categories(
        &self,
        categories: &BTreeSet<TaxCategory>,
    ) -> LookupResult<BTreeMap<TaxCategory, Vec<TaxRule>>> {
        self.rule_lookups.fetch_add(1, Ordering::Relaxed);
        categories
            .iter()
            .map(|category| Ok((category.clone(), self.rules_of(category)?)))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
