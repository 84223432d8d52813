//! # Rate Resolver
//!
//! Maps `(product_id, as_of)` to the single tax rule in effect.
//!
//! ## Resolution Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve("burger-01", 2023-06-01)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductTaxLookup::tax_category ──► None ──────────► Untaxed (0%)       │
//! │       │ Some(FOOD)                                                      │
//! │       ▼                                                                 │
//! │  TaxRuleLookup::rules_for_category(FOOD)                                │
//! │       │   [12% @2022-01-01, 18% @2023-01-01, 20% @2025-01-01]           │
//! │       ▼                                                                 │
//! │  select_effective_rule: drop future rules, keep max effective_date      │
//! │       │                                                                 │
//! │       ├── found ──────────────────────────────► Applied(18%)            │
//! │       └── none  ──────────────────────────────► Unconfigured (0%)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookup failures are returned as [`TaxError::DataAccess`]; they are never
//! turned into a zero rate.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::TaxResult;
use crate::lookup::{ProductTaxLookup, TaxRuleLookup};
use crate::types::{RateResolution, TaxCategory, TaxRate, TaxRule};
use crate::validation::validate_product_id;

// =============================================================================
// Rule Selection
// =============================================================================

/// Picks the rule in effect at `as_of`.
///
/// Among rules with `effective_date <= as_of`, the one with the latest
/// `effective_date` wins. Rules sharing that date are ordered by highest
/// rate, then lowest id, so the pick never depends on input order.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use tavola_core::resolver::select_effective_rule;
/// use tavola_core::types::{TaxCategory, TaxRate, TaxRule};
///
/// let food = TaxCategory::new("FOOD").unwrap();
/// let rules = vec![
///     TaxRule::new(food.clone(), TaxRate::from_whole_percent(12), Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap()),
///     TaxRule::new(food, TaxRate::from_whole_percent(18), Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
/// ];
///
/// let as_of = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
/// assert_eq!(select_effective_rule(&rules, as_of).unwrap().rate.bps(), 1200);
/// ```
pub fn select_effective_rule(rules: &[TaxRule], as_of: DateTime<Utc>) -> Option<&TaxRule> {
    rules
        .iter()
        .filter(|rule| rule.is_effective_at(as_of))
        .max_by(|a, b| {
            a.effective_date
                .cmp(&b.effective_date)
                .then_with(|| a.rate.cmp(&b.rate))
                // reversed: lowest id wins among otherwise equal rules
                .then_with(|| b.id.cmp(&a.id))
        })
}

fn resolution_for(
    category: Option<&TaxCategory>,
    rules: &[TaxRule],
    as_of: DateTime<Utc>,
) -> RateResolution {
    let Some(category) = category else {
        return RateResolution::Untaxed;
    };

    match select_effective_rule(rules, as_of) {
        Some(rule) => RateResolution::Applied { rule: rule.clone() },
        None => {
            warn!(
                category = %category,
                as_of = %as_of,
                rule_count = rules.len(),
                "No tax rule in effect for category, charging 0%"
            );
            RateResolution::Unconfigured {
                category: category.clone(),
            }
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves effective tax rates through injected collaborators.
///
/// ## Usage
/// ```rust,ignore
/// let resolver = TaxRateResolver::new(db.products(), db.tax_rules());
/// let rate = resolver.resolve_rate("burger-01", None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TaxRateResolver<P, R> {
    products: P,
    rules: R,
}

impl<P, R> TaxRateResolver<P, R>
where
    P: ProductTaxLookup,
    R: TaxRuleLookup,
{
    /// Creates a resolver over the given product and rule stores.
    pub fn new(products: P, rules: R) -> Self {
        TaxRateResolver { products, rules }
    }

    /// Resolves the rate for one product.
    ///
    /// `as_of` defaults to the current time.
    pub async fn resolve(
        &self,
        product_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> TaxResult<RateResolution> {
        validate_product_id(product_id)?;
        let as_of = as_of.unwrap_or_else(Utc::now);

        let category = self.products.tax_category(product_id).await?;
        let rules = match &category {
            Some(category) => self.rules.rules_for_category(category).await?,
            None => Vec::new(),
        };

        let resolution = resolution_for(category.as_ref(), &rules, as_of);
        debug!(
            product_id = %product_id,
            as_of = %as_of,
            rate = %resolution.rate(),
            "Resolved tax rate"
        );
        Ok(resolution)
    }

    /// Resolves the rate as a plain percentage; zero when untaxed or
    /// unconfigured.
    pub async fn resolve_rate(
        &self,
        product_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> TaxResult<TaxRate> {
        Ok(self.resolve(product_id, as_of).await?.rate())
    }

    /// Resolves many products under one `as_of` snapshot.
    ///
    /// Issues one batched product lookup and one batched rule lookup for the
    /// distinct categories involved, however many ids are passed. Duplicate
    /// ids are resolved once.
    pub async fn resolve_many<I, S>(
        &self,
        product_ids: I,
        as_of: DateTime<Utc>,
    ) -> TaxResult<HashMap<String, RateResolution>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct = BTreeSet::new();
        for product_id in product_ids {
            let product_id = product_id.as_ref();
            validate_product_id(product_id)?;
            distinct.insert(product_id.to_string());
        }

        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        let categories = self.products.tax_categories(&distinct).await?;
        let wanted: BTreeSet<TaxCategory> = categories.values().flatten().cloned().collect();

        let rules_by_category = if wanted.is_empty() {
            BTreeMap::new()
        } else {
            self.rules.rules_for_categories(&wanted).await?
        };

        debug!(
            products = distinct.len(),
            categories = wanted.len(),
            as_of = %as_of,
            "Resolving tax rates in batch"
        );

        let resolutions = distinct
            .into_iter()
            .map(|product_id| {
                let category = categories.get(&product_id).and_then(Option::as_ref);
                let rules = category
                    .and_then(|c| rules_by_category.get(c))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let resolution = resolution_for(category, rules, as_of);
                (product_id, resolution)
            })
            .collect();

        Ok(resolutions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataAccessError, TaxError, ValidationError};
    use crate::memory::InMemoryTaxStore;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn food() -> TaxCategory {
        TaxCategory::new("FOOD").unwrap()
    }

    fn rule(percent: u32, date: DateTime<Utc>) -> TaxRule {
        TaxRule::new(food(), TaxRate::from_whole_percent(percent), date)
    }

    fn store_with_legislative_change() -> InMemoryTaxStore {
        let store = InMemoryTaxStore::new();
        store.set_product_category("burger", Some(food()));
        store.insert_rule(rule(12, ymd(2022, 1, 1))).unwrap();
        store.insert_rule(rule(18, ymd(2023, 1, 1))).unwrap();
        store
    }

    #[test]
    fn test_select_latest_rule_not_after_as_of() {
        let rules = vec![
            rule(18, ymd(2023, 1, 1)),
            rule(12, ymd(2022, 1, 1)),
            rule(20, ymd(2025, 1, 1)),
        ];
        let picked = select_effective_rule(&rules, ymd(2024, 1, 1)).unwrap();
        assert_eq!(picked.rate.bps(), 1800);
    }

    #[test]
    fn test_select_none_when_all_rules_in_future() {
        let rules = vec![rule(18, ymd(2030, 1, 1))];
        assert!(select_effective_rule(&rules, ymd(2024, 1, 1)).is_none());
        assert!(select_effective_rule(&[], ymd(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_select_effective_date_is_inclusive() {
        let rules = vec![rule(12, ymd(2022, 1, 1)), rule(18, ymd(2023, 1, 1))];
        let picked = select_effective_rule(&rules, ymd(2023, 1, 1)).unwrap();
        assert_eq!(picked.rate.bps(), 1800);
    }

    #[test]
    fn test_select_tie_break_is_order_independent() {
        let mut low = rule(10, ymd(2023, 1, 1));
        let mut high = rule(15, ymd(2023, 1, 1));
        low.id = "b".to_string();
        high.id = "a".to_string();

        let forward = vec![low.clone(), high.clone()];
        let backward = vec![high.clone(), low.clone()];
        assert_eq!(select_effective_rule(&forward, ymd(2024, 1, 1)).unwrap().id, "a");
        assert_eq!(select_effective_rule(&backward, ymd(2024, 1, 1)).unwrap().id, "a");

        // same date and rate: lowest id wins
        let mut twin = high.clone();
        twin.id = "0".to_string();
        let twins = vec![high, twin];
        assert_eq!(select_effective_rule(&twins, ymd(2024, 1, 1)).unwrap().id, "0");
    }

    #[tokio::test]
    async fn test_resolve_across_legislative_change() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let before = resolver.resolve_rate("burger", Some(ymd(2022, 6, 1))).await.unwrap();
        let after = resolver.resolve_rate("burger", Some(ymd(2023, 6, 1))).await.unwrap();

        assert_eq!(before, TaxRate::from_whole_percent(12));
        assert_eq!(after, TaxRate::from_whole_percent(18));
    }

    #[tokio::test]
    async fn test_resolve_before_first_rule_is_unconfigured() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let resolution = resolver.resolve("burger", Some(ymd(2021, 1, 1))).await.unwrap();
        assert_eq!(resolution, RateResolution::Unconfigured { category: food() });
        assert!(resolution.rate().is_zero());
    }

    #[tokio::test]
    async fn test_resolve_product_without_category_is_untaxed() {
        let store = store_with_legislative_change();
        store.set_product_category("water", None);
        let resolver = TaxRateResolver::new(&store, &store);

        let water = resolver.resolve("water", Some(ymd(2024, 1, 1))).await.unwrap();
        let unknown = resolver.resolve("ghost", Some(ymd(2024, 1, 1))).await.unwrap();

        assert_eq!(water, RateResolution::Untaxed);
        assert_eq!(unknown, RateResolution::Untaxed);
        assert_eq!(store.rule_lookups(), 0);
    }

    #[tokio::test]
    async fn test_resolve_defaults_as_of_to_now() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let rate = resolver.resolve_rate("burger", None).await.unwrap();
        assert_eq!(rate, TaxRate::from_whole_percent(18));
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_product_id() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let err = resolver.resolve(" ", None).await.unwrap_err();
        assert!(matches!(
            err,
            TaxError::InvalidInput(ValidationError::Required { .. })
        ));
    }

    #[tokio::test]
    async fn test_padded_product_id_rejected_not_untaxed() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let err = resolver.resolve(" burger", None).await.unwrap_err();
        assert!(matches!(
            err,
            TaxError::InvalidInput(ValidationError::InvalidFormat { .. })
        ));
        assert_eq!(store.product_lookups(), 0);
    }

    #[tokio::test]
    async fn test_rule_store_failure_is_not_zero() {
        let store = store_with_legislative_change();
        store.fail_rule_lookups(DataAccessError::unavailable("tax_rules", "connection refused"));
        let resolver = TaxRateResolver::new(&store, &store);

        let err = resolver.resolve("burger", Some(ymd(2024, 1, 1))).await.unwrap_err();
        assert!(err.is_data_access());
    }

    #[tokio::test]
    async fn test_product_lookup_failure_propagates() {
        let store = store_with_legislative_change();
        store.fail_product_lookups(DataAccessError::timeout("products", 100));
        let resolver = TaxRateResolver::new(&store, &store);

        let err = resolver.resolve("burger", None).await.unwrap_err();
        assert!(matches!(
            err,
            TaxError::DataAccess(DataAccessError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_many_batches_by_category() {
        let store = store_with_legislative_change();
        store.set_product_category("pasta", Some(food()));
        store.set_product_category("wine", Some(TaxCategory::new("ALCOHOL").unwrap()));
        store.set_product_category("water", None);
        let resolver = TaxRateResolver::new(&store, &store);

        let resolutions = resolver
            .resolve_many(["burger", "pasta", "burger", "wine", "water"], ymd(2023, 6, 1))
            .await
            .unwrap();

        assert_eq!(resolutions.len(), 4);
        assert_eq!(resolutions["burger"].rate().bps(), 1800);
        assert_eq!(resolutions["pasta"].rate().bps(), 1800);
        assert!(matches!(resolutions["wine"], RateResolution::Unconfigured { .. }));
        assert_eq!(resolutions["water"], RateResolution::Untaxed);

        // one batch call covering FOOD and ALCOHOL
        assert_eq!(store.rule_lookups(), 1);
        assert_eq!(store.product_lookups(), 1);
    }

    #[tokio::test]
    async fn test_resolve_many_empty_skips_lookups() {
        let store = store_with_legislative_change();
        let resolver = TaxRateResolver::new(&store, &store);

        let resolutions = resolver
            .resolve_many(Vec::<String>::new(), ymd(2023, 6, 1))
            .await
            .unwrap();
        assert!(resolutions.is_empty());
        assert_eq!(store.product_lookups(), 0);
    }
}
