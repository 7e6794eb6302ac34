//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core (this file)                                                 │
//! │  ├── CoreError        - Cart / discount rule violations                 │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  kassa-core::ports                                                      │
//! │  └── StoreError       - What a collaborator reports back                │
//! │                                                                         │
//! │  kassa-db                                                               │
//! │  └── DbError          - sqlx failures, converted into StoreError        │
//! │                                                                         │
//! │  checkout                                                               │
//! │  └── ApiError         - What the UI sees (serialized)                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → UI                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Self-healing (a stale discount silently detached during a read) is not an
//! error and has no variant here.

use chrono::NaiveDate;
use thiserror::Error;

use crate::money::Money;
use crate::ports::StoreError;
use crate::roles::Permission;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and discount errors reported to the caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No active cart with this id belongs to the caller.
    ///
    /// Ownership-scoped: a cart that exists but belongs to someone else is
    /// reported exactly like a missing one.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// The line item is not part of the given cart.
    #[error("Item {item_id} not found in cart {cart_id}")]
    ItemNotFound { cart_id: String, item_id: String },

    #[error("Discount not found: {0}")]
    DiscountNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is switched off in the catalog.
    #[error("Product is not available for sale: {0}")]
    ProductUnavailable(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Neither the register nor the user assignment yields a branch.
    #[error("No branch assigned to user {user_id}")]
    BranchNotResolved { user_id: String },

    #[error("Discount '{name}' is not active")]
    DiscountInactive { name: String },

    #[error("Discount '{name}' is not valid until {starts_on}")]
    DiscountNotStarted { name: String, starts_on: NaiveDate },

    #[error("Discount '{name}' expired on {ended_on}")]
    DiscountExpired { name: String, ended_on: NaiveDate },

    #[error("Discount '{name}' has reached its usage limit of {max_uses}")]
    DiscountExhausted { name: String, max_uses: u32 },

    #[error("Discount '{name}' is not available at branch {branch_id}")]
    DiscountNotAvailableAtBranch { name: String, branch_id: String },

    /// The cart subtotal is below the discount's threshold.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart subtotal $30.00, apply "SAVE10" (min $50.00)
    ///      │
    ///      ▼
    /// MinimumPurchaseNotMet { minimum: $50.00, subtotal: $30.00 }
    ///      │
    ///      ▼
    /// UI shows: "Minimum purchase of $50.00 required ..."
    /// ```
    #[error("Minimum purchase of {minimum} required for this discount (cart subtotal is {subtotal})")]
    MinimumPurchaseNotMet { minimum: Money, subtotal: Money },

    #[error("Role '{role}' lacks permission {permission}")]
    PermissionDenied { role: String, permission: Permission },

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Built-in role '{0}' cannot be modified")]
    BuiltinRoleImmutable(String),

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// A cart amount does not fit in i64 cents.
    #[error("Cart amount is too large to price")]
    AmountOverflow,

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A collaborator (persistence, catalog) failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Whether this is one of the "discount cannot be applied" reasons.
    pub fn is_discount_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::DiscountInactive { .. }
                | CoreError::DiscountNotStarted { .. }
                | CoreError::DiscountExpired { .. }
                | CoreError::DiscountExhausted { .. }
                | CoreError::DiscountNotAvailableAtBranch { .. }
                | CoreError::MinimumPurchaseNotMet { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_purchase_message_names_threshold() {
        let err = CoreError::MinimumPurchaseNotMet {
            minimum: Money::from_cents(5000),
            subtotal: Money::from_cents(3000),
        };
        let message = err.to_string();
        assert!(message.contains("50"));
        assert_eq!(
            message,
            "Minimum purchase of $50.00 required for this discount (cart subtotal is $30.00)"
        );
        assert!(err.is_discount_rejection());
    }

    #[test]
    fn test_item_not_found_message() {
        let err = CoreError::ItemNotFound {
            cart_id: "c1".to_string(),
            item_id: "i9".to_string(),
        };
        assert_eq!(err.to_string(), "Item i9 not found in cart c1");
        assert!(!err.is_discount_rejection());
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("discount_id").to_string(),
            "discount_id is required"
        );
        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: 999,
        };
        assert_eq!(err.to_string(), "quantity must be between 0 and 999");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: CoreError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(err.to_string(), "Storage backend failed: disk full");
    }
}
