//! # Validation Module
//!
//! Boundary validation for cart and discount-admin inputs.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: UI                 basic format checks, instant feedback      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: checkout commands  typed DTOs (serde) + THIS MODULE           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite             NOT NULL / UNIQUE / CHECK constraints      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kassa_core::validation::{validate_quantity, normalize_discount_code};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert_eq!(normalize_discount_code("save10").unwrap(), "SAVE10");
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::discount::{AppliesTo, DiscountRule};
use crate::error::ValidationError;
use crate::money::BPS_PER_WHOLE;
use crate::types::AddItemRequest;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an opaque id (cart, item, product, discount...).
///
/// Ids are not required to be UUIDs; products and registers come from
/// external systems.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::required(field));
    }

    if id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a discount name and returns it trimmed.
pub fn validate_discount_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(name.to_string())
}

/// Validates a discount code and returns it uppercased.
///
/// ## Rules
/// - 3 to 32 characters
/// - letters, digits, hyphen, underscore
///
/// ```rust
/// use kassa_core::validation::normalize_discount_code;
///
/// assert_eq!(normalize_discount_code(" summer-24 ").unwrap(), "SUMMER-24");
/// assert!(normalize_discount_code("no spaces").is_err());
/// assert!(normalize_discount_code("ab").is_err());
/// ```
pub fn normalize_discount_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: 3,
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a custom role name (2-32 of `a-z 0-9 - _`, case-insensitive).
pub fn validate_role_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.len() < 2 {
        return Err(ValidationError::TooShort {
            field: "role".to_string(),
            min: 2,
        });
    }

    if name.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "role".to_string(),
            max: 32,
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "role",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity being added to a cart.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// Setting an existing line's quantity has different rules (0 deletes,
/// negative is rejected); see `Cart::set_item_quantity`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents: 0 (free items) to MAX_PRICE_CENTS.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (0 to 10000, i.e. 0 % to 100 %).
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > BPS_PER_WHOLE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::from(BPS_PER_WHOLE),
        });
    }

    Ok(())
}

/// Validates a line-item tax rate.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    validate_rate_bps("tax_rate", bps)
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates everything in an add-to-cart request.
pub fn validate_add_item(request: &AddItemRequest) -> ValidationResult<()> {
    validate_id("productId", &request.product_id)?;
    validate_product_name(&request.product_name)?;
    validate_price_cents(request.unit_price_cents)?;
    validate_quantity(request.quantity)?;
    validate_tax_rate_bps(request.tax_rate_bps)?;
    Ok(())
}

/// Validates the type-specific values of a discount rule.
pub fn validate_discount_rule(rule: &DiscountRule) -> ValidationResult<()> {
    match rule {
        DiscountRule::Percentage { rate_bps } => validate_rate_bps("value", *rate_bps),
        DiscountRule::Fixed { amount_cents } => {
            if *amount_cents <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "value".to_string(),
                });
            }
            Ok(())
        }
        DiscountRule::BuyXGetY {
            buy_quantity,
            get_quantity,
            reward_bps,
        } => {
            if *buy_quantity == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "buyXQuantity".to_string(),
                });
            }
            if *get_quantity == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "getYQuantity".to_string(),
                });
            }
            validate_rate_bps("value", *reward_bps)
        }
    }
}

/// Scoped discounts need something to scope to.
pub fn validate_discount_scope(
    rule: &DiscountRule,
    applies_to: AppliesTo,
    product_ids: &BTreeSet<String>,
    category_ids: &BTreeSet<String>,
) -> ValidationResult<()> {
    let needs_products = matches!(rule, DiscountRule::BuyXGetY { .. })
        || applies_to == AppliesTo::SpecificProducts;

    if needs_products && product_ids.is_empty() {
        return Err(ValidationError::required("productIds"));
    }

    if applies_to == AppliesTo::SpecificCategories && category_ids.is_empty() {
        return Err(ValidationError::required("categoryIds"));
    }

    product_ids
        .iter()
        .try_for_each(|id| validate_id("productIds", id))?;
    category_ids
        .iter()
        .try_for_each(|id| validate_id("categoryIds", id))?;

    Ok(())
}

/// The end date, when present, must not precede the start date.
pub fn validate_schedule(
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    match ends_at {
        Some(ends_at) if ends_at < starts_at => Err(ValidationError::invalid(
            "endDate",
            "must not be before the start date",
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
