//! # tavola-db: Database Layer for the Tavola Tax Engine
//!
//! SQLite storage for products and date-effective tax rules, plus the
//! wiring that turns them into a ready-to-use resolver and aggregator.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tavola Tax Data Flow                               │
//! │                                                                         │
//! │  Order service (checkout, quote)                                        │
//! │       │  db.order_tax(rounding).compute(&items, as_of)                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                  tavola-core (pure logic)                       │    │
//! │  │   OrderTaxAggregator ──► TaxRateResolver                        │    │
//! │  └───────────────────────────────┬─────────────────────────────────┘    │
//! │                                  │ ProductTaxLookup / TaxRuleLookup     │
//! │  ┌───────────────────────────────▼─────────────────────────────────┐    │
//! │  │                  tavola-db (THIS CRATE)                         │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────────┐    ┌──────────┐    │    │
//! │  │   │   Database    │    │   Repositories    │    │Migrations│    │    │
//! │  │   │   (pool.rs)   │◄───│ ProductRepository │    │(embedded)│    │    │
//! │  │   │  SqlitePool   │    │ TaxRuleRepository │    │ 001_*.sql│    │    │
//! │  │   └───────────────┘    └───────────────────┘    └──────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - `TAVOLA_*` environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, tax rule)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tavola_db::{Database, TavolaConfig};
//!
//! let config = TavolaConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let quote = db.order_tax(config.rounding).compute(&items, None).await?;
//! println!("tax: {}", quote.total());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, TavolaConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, SqliteOrderTax, SqliteTaxResolver};

pub use repository::product::ProductRepository;
pub use repository::tax_rule::TaxRuleRepository;

// =============================================================================
// End-to-end Tests
// =============================================================================
