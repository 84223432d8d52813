//! # Collaborator Traits
//!
//! The resolver never touches storage directly. It is handed two read-only
//! collaborators at construction time:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TaxRateResolver<P, R>                                                  │
//! │       │                                                                 │
//! │       ├── P: ProductTaxLookup   product_id  → Option<TaxCategory>       │
//! │       └── R: TaxRuleLookup      category    → Vec<TaxRule>              │
//! │                                                                         │
//! │  Implementations:                                                       │
//! │    InMemoryTaxStore                (tavola-core, tests and tooling)     │
//! │    ProductRepository / TaxRuleRepository   (tavola-db, SQLite)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The batched methods have loop-based defaults; stores that can answer a
//! whole batch in one round trip should override them.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use crate::error::DataAccessError;
use crate::types::{TaxCategory, TaxRule};

/// Result type for collaborator lookups.
pub type LookupResult<T> = Result<T, DataAccessError>;

/// Maps a product to its tax category.
pub trait ProductTaxLookup: Send + Sync {
    /// Returns the product's category, or `None` when the product is unknown
    /// or carries no category.
    fn tax_category(
        &self,
        product_id: &str,
    ) -> impl Future<Output = LookupResult<Option<TaxCategory>>> + Send;

    /// Looks up several products at once.
    ///
    /// Every requested id is present in the returned map.
    fn tax_categories(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> impl Future<Output = LookupResult<BTreeMap<String, Option<TaxCategory>>>> + Send {
        async move {
            let mut categories = BTreeMap::new();
            for product_id in product_ids {
                let category = self.tax_category(product_id).await?;
                categories.insert(product_id.clone(), category);
            }
            Ok(categories)
        }
    }
}

/// Reads tax rules for a category. Order of the returned rules is not
/// significant.
pub trait TaxRuleLookup: Send + Sync {
    fn rules_for_category(
        &self,
        category: &TaxCategory,
    ) -> impl Future<Output = LookupResult<Vec<TaxRule>>> + Send;

    /// Fetches rules for several categories at once.
    ///
    /// Every requested category is present in the returned map, with an
    /// empty list when it has no rules.
    fn rules_for_categories(
        &self,
        categories: &BTreeSet<TaxCategory>,
    ) -> impl Future<Output = LookupResult<BTreeMap<TaxCategory, Vec<TaxRule>>>> + Send {
        async move {
            let mut rules = BTreeMap::new();
            for category in categories {
                let found = self.rules_for_category(category).await?;
                rules.insert(category.clone(), found);
            }
            Ok(rules)
        }
    }
}

impl<T: ProductTaxLookup> ProductTaxLookup for &T {
    fn tax_category(
        &self,
        product_id: &str,
    ) -> impl Future<Output = LookupResult<Option<TaxCategory>>> + Send {
        (**self).tax_category(product_id)
    }

    fn tax_categories(
        &self,
        product_ids: &BTreeSet<String>,
    ) -> impl Future<Output = LookupResult<BTreeMap<String, Option<TaxCategory>>>> + Send {
        (**self).tax_categories(product_ids)
    }
}

impl<T: TaxRuleLookup> TaxRuleLookup for &T {
    fn rules_for_category(
        &self,
        category: &TaxCategory,
    ) -> impl Future<Output = LookupResult<Vec<TaxRule>>> + Send {
        (**self).rules_for_category(category)
    }

    fn rules_for_categories(
        &self,
        categories: &BTreeSet<TaxCategory>,
    ) -> impl Future<Output = LookupResult<BTreeMap<TaxCategory, Vec<TaxRule>>>> + Send {
        (**self).rules_for_categories(categories)
    }
}
