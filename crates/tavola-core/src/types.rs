//! # Domain Types
//!
//! Core domain types used by the Tavola tax engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    TaxRule      │   │ TaxableLineItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  category       │   │  product_id     │       │
//! │  │  sku            │──►│  rate (bps)     │   │  price_cents    │       │
//! │  │  tax_category?  │   │  effective_date │   └────────┬────────┘       │
//! │  └─────────────────┘   └─────────────────┘            │                 │
//! │                                                       ▼                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ RateResolution  │   │    LineTax      │   │ OrderTaxResult  │       │
//! │  │  Applied(rule)  │──►│  rate, tax_cents│──►│  lines          │       │
//! │  │  Untaxed        │   └─────────────────┘   │  total_tax_cents│       │
//! │  │  Unconfigured   │                         └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{self, ValidationResult};
use crate::DEFAULT_TENANT_ID;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18%, 825 bps = 8.25%
///
/// Unsigned, so a rate can never be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from whole percentage points (18 → 18%).
    ///
    /// Saturates at `u32::MAX` bps; use [`validation::validate_rate_bps`]
    /// to enforce the 100% cap.
    #[inline]
    pub const fn from_whole_percent(percent: u32) -> Self {
        TaxRate(percent.saturating_mul(100))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for TaxRate {
    type Err = ValidationError;

    /// Parses a decimal percentage such as `"18"` or `"8.25"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validation::parse_rate_percent(s)
    }
}

// =============================================================================
// Tax Category
// =============================================================================

/// Classification label on a product that selects which tax rules apply
/// (e.g. `FOOD`, `ALCOHOL`).
///
/// Always upper case; built through [`TaxCategory::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct TaxCategory(String);

impl TaxCategory {
    /// Validates and normalizes a category label.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::types::TaxCategory;
    ///
    /// let food = TaxCategory::new(" food ").unwrap();
    /// assert_eq!(food.as_str(), "FOOD");
    /// assert!(TaxCategory::new("").is_err());
    /// ```
    pub fn new(raw: &str) -> ValidationResult<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        validation::validate_category(&normalized)?;
        Ok(TaxCategory(normalized))
    }

    /// Returns the label.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Rounding Mode
// =============================================================================

/// How a fractional cent of tax is rounded on each line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Exact halves round away from zero (0.5 → 1, 1.5 → 2, 2.5 → 3).
    #[default]
    HalfUp,
    /// Bankers rounding: exact halves round to the even cent (2.5 → 2).
    HalfEven,
}

impl RoundingMode {
    /// Returns the snake_case name used in configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "half_up",
            RoundingMode::HalfEven => "half_even",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_even" | "bankers" => Ok(RoundingMode::HalfEven),
            other => Err(ValidationError::InvalidFormat {
                field: "rounding".to_string(),
                reason: format!("unknown rounding mode '{other}' (expected half_up or half_even)"),
            }),
        }
    }
}

// =============================================================================
// Tax Rule
// =============================================================================

/// A rate that applies to one category from `effective_date` onwards.
///
/// ## Timeline Example
/// ```text
/// FOOD  ──●─────────────────●──────────────────►
///      2022-01-01 (12%)   2023-01-01 (18%)
///             ▲                   ▲
///        as_of 2022-06-01    as_of 2023-06-01
///          → 12%               → 18%
/// ```
///
/// `(tenant_id, category, effective_date)` is unique in every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRule {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this rule belongs to.
    pub tenant_id: String,

    /// Category the rule applies to.
    pub category: TaxCategory,

    /// Rate in basis points.
    pub rate: TaxRate,

    /// First instant the rule applies (inclusive).
    #[ts(as = "String")]
    pub effective_date: DateTime<Utc>,

    /// When the rule was recorded.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TaxRule {
    /// Creates a rule for the default tenant with a fresh id.
    pub fn new(category: TaxCategory, rate: TaxRate, effective_date: DateTime<Utc>) -> Self {
        TaxRule {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            category,
            rate,
            effective_date,
            created_at: Utc::now(),
        }
    }

    /// Checks whether the rule has taken effect at `as_of`.
    #[inline]
    pub fn is_effective_at(&self, as_of: DateTime<Utc>) -> bool {
        self.effective_date <= as_of
    }
}

// =============================================================================
// Product
// =============================================================================

/// A menu item as seen by the tax engine.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name on the menu and receipt.
    pub name: String,

    /// Menu price in cents.
    pub price_cents: i64,

    /// Tax category; `None` means the item is untaxed.
    pub tax_category: Option<TaxCategory>,

    /// Whether the item is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an active product for the default tenant with a fresh id.
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        price_cents: i64,
        tax_category: Option<TaxCategory>,
    ) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            sku: sku.into(),
            name: name.into(),
            price_cents,
            tax_category,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Taxable Line Item
// =============================================================================

/// One priced line of an order, as handed to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxableLineItem {
    pub product_id: String,
    /// Line price in cents; must be ≥ 0.
    pub price_cents: i64,
}

impl TaxableLineItem {
    pub fn new(product_id: impl Into<String>, price_cents: i64) -> Self {
        TaxableLineItem {
            product_id: product_id.into(),
            price_cents,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Rate Resolution
// =============================================================================

/// Outcome of resolving the rate for one product.
///
/// `Untaxed` and `Unconfigured` both yield a zero rate. They are kept apart
/// so callers can tell a legitimately untaxed item from a category whose
/// rules are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateResolution {
    /// A rule is in effect.
    Applied { rule: TaxRule },
    /// Product is unknown or carries no tax category.
    Untaxed,
    /// Category has no rule in effect at the requested instant.
    Unconfigured { category: TaxCategory },
}

impl RateResolution {
    /// Rate to charge: the rule's rate, or zero.
    pub fn rate(&self) -> TaxRate {
        match self {
            RateResolution::Applied { rule } => rule.rate,
            RateResolution::Untaxed | RateResolution::Unconfigured { .. } => TaxRate::zero(),
        }
    }

    /// The rule in effect, if any.
    pub fn rule(&self) -> Option<&TaxRule> {
        match self {
            RateResolution::Applied { rule } => Some(rule),
            _ => None,
        }
    }

    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, RateResolution::Applied { .. })
    }
}

// =============================================================================
// Order Tax Result
// =============================================================================

/// Tax computed for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTax {
    pub product_id: String,
    pub price_cents: i64,
    pub rate: TaxRate,
    pub resolution: RateResolution,
    /// Tax for this line, rounded on its own.
    pub tax_cents: i64,
}

/// Tax for a whole order under one legislative snapshot.
///
/// `total_tax_cents` is the sum of the independently rounded
/// `lines[i].tax_cents`; rounding is never redistributed across lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTaxResult {
    /// Instant every line was taxed at.
    #[ts(as = "String")]
    pub as_of: DateTime<Utc>,
    pub rounding: RoundingMode,
    pub lines: Vec<LineTax>,
    pub total_tax_cents: i64,
}

impl OrderTaxResult {
    /// Builds a result from computed lines, summing their tax.
    ///
    /// Fails with `OutOfRange` when the total does not fit in `i64` cents.
    pub fn from_lines(
        as_of: DateTime<Utc>,
        rounding: RoundingMode,
        lines: Vec<LineTax>,
    ) -> ValidationResult<Self> {
        let total = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(Money::from_cents(l.tax_cents)))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "total_tax_cents".to_string(),
                min: i64::MIN,
                max: i64::MAX,
            })?;

        Ok(OrderTaxResult {
            as_of,
            rounding,
            lines,
            total_tax_cents: total.cents(),
        })
    }

    /// Returns the total tax as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_tax_cents)
    }

    /// Lines whose category had no rule in effect.
    pub fn unconfigured_lines(&self) -> impl Iterator<Item = &LineTax> {
        self.lines
            .iter()
            .filter(|l| matches!(l.resolution, RateResolution::Unconfigured { .. }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tax_rate_display_and_parse() {
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
        assert_eq!(TaxRate::from_whole_percent(18).bps(), 1800);
        assert_eq!(TaxRate::from_whole_percent(u32::MAX).bps(), u32::MAX);
        assert_eq!("18".parse::<TaxRate>().unwrap(), TaxRate::from_bps(1800));
        assert!("-1".parse::<TaxRate>().is_err());
    }

    #[test]
    fn test_category_normalized() {
        let category = TaxCategory::new("alcohol").unwrap();
        assert_eq!(category.to_string(), "ALCOHOL");
        assert!(TaxCategory::new("   ").is_err());
        assert!(TaxCategory::new("FOOD AND DRINK").is_err());
    }

    #[test]
    fn test_rounding_mode_parse_and_serde() {
        assert_eq!("half_even".parse::<RoundingMode>().unwrap(), RoundingMode::HalfEven);
        assert_eq!(" HALF_UP ".parse::<RoundingMode>().unwrap(), RoundingMode::HalfUp);
        assert!("nearest".parse::<RoundingMode>().is_err());
        assert_eq!(RoundingMode::default(), RoundingMode::HalfUp);

        let json = serde_json::to_string(&RoundingMode::HalfEven).unwrap();
        assert_eq!(json, "\"half_even\"");
    }

    #[test]
    fn test_rule_effective_date_inclusive() {
        let effective = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let rule = TaxRule::new(
            TaxCategory::new("FOOD").unwrap(),
            TaxRate::from_whole_percent(18),
            effective,
        );
        assert!(rule.is_effective_at(effective));
        assert!(!rule.is_effective_at(effective - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_resolution_rate_is_zero_unless_applied() {
        let category = TaxCategory::new("FOOD").unwrap();
        assert!(RateResolution::Untaxed.rate().is_zero());
        assert!(RateResolution::Unconfigured { category: category.clone() }
            .rate()
            .is_zero());

        let rule = TaxRule::new(category, TaxRate::from_bps(1200), Utc::now());
        let applied = RateResolution::Applied { rule };
        assert_eq!(applied.rate().bps(), 1200);
        assert!(applied.is_applied());
    }

    #[test]
    fn test_resolution_serializes_with_kind_tag() {
        let json = serde_json::to_value(RateResolution::Untaxed).unwrap();
        assert_eq!(json["kind"], "untaxed");
    }

    #[test]
    fn test_order_result_sums_lines() {
        let lines = vec![
            LineTax {
                product_id: "a".to_string(),
                price_cents: 2400,
                rate: TaxRate::from_bps(1800),
                resolution: RateResolution::Untaxed,
                tax_cents: 432,
            },
            LineTax {
                product_id: "b".to_string(),
                price_cents: 1500,
                rate: TaxRate::from_bps(1800),
                resolution: RateResolution::Untaxed,
                tax_cents: 270,
            },
        ];
        let result = OrderTaxResult::from_lines(Utc::now(), RoundingMode::HalfUp, lines).unwrap();
        assert_eq!(result.total_tax_cents, 702);
        assert_eq!(result.total().to_string(), "$7.02");
    }

    #[test]
    fn test_order_result_total_overflow_is_an_error() {
        let line = LineTax {
            product_id: "a".to_string(),
            price_cents: i64::MAX,
            rate: TaxRate::from_bps(10_000),
            resolution: RateResolution::Untaxed,
            tax_cents: i64::MAX,
        };
        let err = OrderTaxResult::from_lines(Utc::now(), RoundingMode::HalfUp, vec![line.clone(), line])
            .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "total_tax_cents"));
    }
}
