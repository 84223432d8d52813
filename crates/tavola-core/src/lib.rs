//! # tavola-core: Pure Tax Logic for Tavola
//!
//! This crate resolves which tax rate applies to a menu item at a point in
//! time and aggregates tax over an order. All storage is reached through
//! collaborator traits, so every piece here runs without a database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tavola Tax Flow                                  │
//! │                                                                         │
//! │  Checkout / order flow                                                 │
//! │       │  compute(items, as_of)                                          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ tavola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   OrderTaxAggregator ──► TaxRateResolver ──► select_effective   │   │
//! │  │         │                     │                   _rule         │   │
//! │  │         ▼                     ▼                                 │   │
//! │  │   Money::calculate_tax   ProductTaxLookup / TaxRuleLookup       │   │
//! │  └──────────────────────────────┬──────────────────────────────────┘   │
//! │                                 │ (traits)                              │
//! │  ┌──────────────────────────────▼──────────────────────────────────┐   │
//! │  │                 tavola-db (SQLite repositories)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TaxRate, TaxRule, Product, line items)
//! - [`money`] - Money type with integer arithmetic and tax rounding
//! - [`error`] - Validation, data-access and tax errors
//! - [`validation`] - Input validation and parsing
//! - [`lookup`] - Collaborator traits for products and tax rules
//! - [`resolver`] - Date-effective rate resolution
//! - [`aggregator`] - Order tax aggregation
//! - [`memory`] - In-memory rule store
//!
//! ## Example Usage
//!
//! ```rust
//! use tavola_core::money::Money;
//! use tavola_core::types::{RoundingMode, TaxRate};
//!
//! let price = Money::from_cents(8475);
//! let tax = price.calculate_tax(TaxRate::from_bps(1800), RoundingMode::HalfUp).unwrap();
//! assert_eq!(tax.cents(), 1526);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod error;
pub mod lookup;
pub mod memory;
pub mod money;
pub mod resolver;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregator::OrderTaxAggregator;
pub use error::{DataAccessError, TaxError, TaxResult, ValidationError};
pub use lookup::{LookupResult, ProductTaxLookup, TaxRuleLookup};
pub use memory::InMemoryTaxStore;
pub use money::Money;
pub use resolver::{select_effective_rule, TaxRateResolver};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID (single-tenant runtime with multi-tenant schema).
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Highest rate a tax rule may carry, in basis points (100%).
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

/// Maximum line items accepted in one order tax computation.
pub const MAX_ORDER_LINES: usize = 500;
