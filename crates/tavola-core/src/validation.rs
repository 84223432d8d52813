//! # Validation Module
//!
//! Input validation and parsing for the tax engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Checkout flow (caller)                                       │
//! │  └── Builds TaxableLineItem / parses as-of strings                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Every line validated BEFORE any lookup runs                       │
//! │  └── Negative prices rejected, never clamped                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (rate_bps >= 0)                                             │
//! │  └── UNIQUE (tenant_id, category, effective_date)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;
use crate::types::{TaxRate, TaxableLineItem};
use crate::{MAX_ORDER_LINES, MAX_TAX_RATE_BPS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted category label.
const MAX_CATEGORY_LEN: usize = 50;

/// Longest accepted product identifier.
const MAX_PRODUCT_ID_LEN: usize = 64;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a product identifier.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - No leading or trailing whitespace
/// - At most 64 characters
///
/// ## Example
/// ```rust
/// use tavola_core::validation::validate_product_id;
///
/// assert!(validate_product_id("menu-item-1").is_ok());
/// assert!(validate_product_id("  ").is_err());
/// assert!(validate_product_id(" menu-item-1").is_err());
/// ```
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    let trimmed = product_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    if trimmed.len() != product_id.len() {
        return Err(ValidationError::InvalidFormat {
            field: "product_id".to_string(),
            reason: "must not have leading or trailing whitespace".to_string(),
        });
    }

    if trimmed.len() > MAX_PRODUCT_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "product_id".to_string(),
            max: MAX_PRODUCT_ID_LEN,
        });
    }

    Ok(())
}

/// Validates an already-normalized (upper case) tax category label.
///
/// ## Rules
/// - 1 to 50 characters
/// - ASCII letters, digits, hyphens and underscores only
pub fn validate_category(category: &str) -> ValidationResult<()> {
    if category.is_empty() {
        return Err(ValidationError::Required {
            field: "tax_category".to_string(),
        });
    }

    if category.len() > MAX_CATEGORY_LEN {
        return Err(ValidationError::TooLong {
            field: "tax_category".to_string(),
            max: MAX_CATEGORY_LEN,
        });
    }

    if !category
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "tax_category".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Money Validators
// =============================================================================

/// Validates a line price. Zero is allowed (comped items).
pub fn validate_price_cents(field: &str, price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: price_cents,
        });
    }
    Ok(())
}

/// Validates every line of an order before tax is computed.
///
/// Errors name the offending line, e.g. `items[2].price_cents`.
///
/// ## Example
/// ```rust
/// use tavola_core::types::TaxableLineItem;
/// use tavola_core::validation::validate_line_items;
///
/// let ok = vec![TaxableLineItem::new("p1", 100), TaxableLineItem::new("p2", 0)];
/// assert!(validate_line_items(&ok).is_ok());
///
/// let bad = vec![TaxableLineItem::new("p1", 100), TaxableLineItem::new("p2", -1)];
/// assert!(validate_line_items(&bad).is_err());
/// ```
pub fn validate_line_items(items: &[TaxableLineItem]) -> ValidationResult<()> {
    if items.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 0,
            max: MAX_ORDER_LINES as i64,
        });
    }

    for (index, item) in items.iter().enumerate() {
        validate_product_id(&item.product_id).map_err(|err| prefix_field(err, index))?;
        validate_price_cents(&format!("items[{index}].price_cents"), item.price_cents)?;
    }

    Ok(())
}

fn prefix_field(err: ValidationError, index: usize) -> ValidationError {
    let prefix = |field: String| format!("items[{index}].{field}");
    match err {
        ValidationError::Required { field } => ValidationError::Required {
            field: prefix(field),
        },
        ValidationError::TooLong { field, max } => ValidationError::TooLong {
            field: prefix(field),
            max,
        },
        ValidationError::InvalidFormat { field, reason } => ValidationError::InvalidFormat {
            field: prefix(field),
            reason,
        },
        other => other,
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// Parses a decimal percentage into a [`TaxRate`].
///
/// ## Rules
/// - Plain decimal, at most two fractional digits (`"18"`, `"8.25"`, `"0.5"`)
/// - Not negative, at most 100%
/// - Parsed exactly (no floating point)
///
/// ## Example
/// ```rust
/// use tavola_core::validation::parse_rate_percent;
///
/// assert_eq!(parse_rate_percent("8.25").unwrap().bps(), 825);
/// assert_eq!(parse_rate_percent("18").unwrap().bps(), 1800);
/// assert!(parse_rate_percent("8.255").is_err());
/// assert!(parse_rate_percent("-1").is_err());
/// ```
pub fn parse_rate_percent(raw: &str) -> ValidationResult<TaxRate> {
    let raw = raw.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "rate_percent".to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: "rate_percent".to_string(),
        });
    }

    if raw.starts_with('-') {
        return Err(invalid("must not be negative"));
    }

    let (whole, fraction) = match raw.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (raw, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("expected a decimal number"));
    }
    if fraction.len() > 2 {
        return Err(invalid("at most two decimal places"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected a decimal number"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("value too large"))?
    };
    let fraction_bps: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().map_err(|_| invalid("expected a decimal number"))? * 10,
        _ => fraction.parse().map_err(|_| invalid("expected a decimal number"))?,
    };

    let bps = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(fraction_bps))
        .ok_or_else(|| invalid("value too large"))?;

    validate_rate_bps(bps as i64)?;
    Ok(TaxRate::from_bps(bps as u32))
}

/// Checks a raw basis-point value read from storage or input.
pub fn validate_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=MAX_TAX_RATE_BPS as i64).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "rate_bps".to_string(),
            min: 0,
            max: MAX_TAX_RATE_BPS as i64,
        });
    }
    Ok(())
}

/// Parses an as-of instant.
///
/// Accepts RFC 3339 timestamps (`2024-01-01T12:00:00Z`) or plain dates
/// (`2024-01-01`, taken as midnight UTC).
///
/// ## Example
/// ```rust
/// use tavola_core::validation::parse_as_of;
///
/// assert!(parse_as_of("2024-01-01").is_ok());
/// assert!(parse_as_of("2024-01-01T09:30:00+02:00").is_ok());
/// assert!(parse_as_of("yesterday").is_err());
/// ```
pub fn parse_as_of(raw: &str) -> ValidationResult<DateTime<Utc>> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: "as_of".to_string(),
        });
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "as_of".to_string(),
            reason: "expected RFC 3339 timestamp or YYYY-MM-DD".to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
