//! # Order Tax Aggregator
//!
//! Computes the tax for every line of an order and sums it.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute([burger 2400, fries 1500], as_of = None)                       │
//! │       │                                                                 │
//! │       ├── 1. validate every line (negative price → InvalidInput)        │
//! │       ├── 2. as_of = now, captured ONCE for the whole order             │
//! │       ├── 3. resolver.resolve_many(distinct product ids, as_of)         │
//! │       │        one product batch + one rule batch per call              │
//! │       ├── 4. per line: round(price × rate)   2400 → 432, 1500 → 270      │
//! │       └── 5. total = Σ line tax                          → 702           │
//! │                                                                         │
//! │  Any lookup failure aborts the order: no partial totals.                │
//! │  A tax or total that does not fit in i64 cents → InvalidInput.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{DataAccessError, TaxResult, ValidationError};
use crate::lookup::{ProductTaxLookup, TaxRuleLookup};
use crate::money::Money;
use crate::resolver::TaxRateResolver;
use crate::types::{LineTax, OrderTaxResult, RoundingMode, TaxableLineItem};
use crate::validation::validate_line_items;

/// Computes order tax through a [`TaxRateResolver`].
///
/// ## Usage
/// ```rust,ignore
/// let aggregator = OrderTaxAggregator::new(
///     TaxRateResolver::new(db.products(), db.tax_rules()),
///     RoundingMode::HalfUp,
/// );
/// let result = aggregator.compute(&items, None).await?;
/// println!("tax: {}", result.total());
/// ```
#[derive(Debug, Clone)]
pub struct OrderTaxAggregator<P, R> {
    resolver: TaxRateResolver<P, R>,
    rounding: RoundingMode,
}

impl<P, R> OrderTaxAggregator<P, R>
where
    P: ProductTaxLookup,
    R: TaxRuleLookup,
{
    pub fn new(resolver: TaxRateResolver<P, R>, rounding: RoundingMode) -> Self {
        OrderTaxAggregator { resolver, rounding }
    }

    /// Rounding mode applied to every line.
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// The resolver used for rate lookups.
    pub fn resolver(&self) -> &TaxRateResolver<P, R> {
        &self.resolver
    }

    /// Computes tax for `items` with a per-line breakdown.
    ///
    /// All lines share one `as_of` snapshot (now, when `None`). Lines keep
    /// their input order in the result.
    pub async fn compute(
        &self,
        items: &[TaxableLineItem],
        as_of: Option<DateTime<Utc>>,
    ) -> TaxResult<OrderTaxResult> {
        validate_line_items(items)?;
        let as_of = as_of.unwrap_or_else(Utc::now);

        if items.is_empty() {
            return Ok(OrderTaxResult::from_lines(as_of, self.rounding, Vec::new())?);
        }

        let resolutions = self
            .resolver
            .resolve_many(items.iter().map(|item| item.product_id.as_str()), as_of)
            .await?;

        let mut lines = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let resolution = resolutions.get(&item.product_id).cloned().ok_or_else(|| {
                DataAccessError::malformed(
                    "resolver",
                    format!("no resolution returned for product {}", item.product_id),
                )
            })?;
            let rate = resolution.rate();
            let tax = item
                .price()
                .calculate_tax(rate, self.rounding)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: format!("items[{index}].tax_cents"),
                    min: i64::MIN,
                    max: i64::MAX,
                })?;

            debug!(
                product_id = %item.product_id,
                price_cents = item.price_cents,
                rate = %rate,
                tax_cents = tax.cents(),
                "Line tax computed"
            );

            lines.push(LineTax {
                product_id: item.product_id.clone(),
                price_cents: item.price_cents,
                rate,
                resolution,
                tax_cents: tax.cents(),
            });
        }

        let result = OrderTaxResult::from_lines(as_of, self.rounding, lines)?;
        info!(
            lines = result.lines.len(),
            total_tax_cents = result.total_tax_cents,
            rounding = %self.rounding,
            as_of = %as_of,
            "Order tax computed"
        );
        Ok(result)
    }

    /// Computes only the total tax.
    pub async fn compute_total(
        &self,
        items: &[TaxableLineItem],
        as_of: Option<DateTime<Utc>>,
    ) -> TaxResult<Money> {
        Ok(self.compute(items, as_of).await?.total())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
