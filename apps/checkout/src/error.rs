//! # API Error Type
//!
//! Unified error type for checkout commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kassa Checkout                         │
//! │                                                                         │
//! │  UI                          Rust Backend                               │
//! │  ──                          ────────────                               │
//! │                                                                         │
//! │  attach_discount_code('SAVE10')                                         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  CartService method → ApiResult<CartView>                        │  │
//! │  │         │                                                        │  │
//! │  │  Store failure? ─── StoreError::Backend ── logged, masked ──┐    │  │
//! │  │         │                                                   │    │  │
//! │  │  Rule violation? ── CoreError::MinimumPurchaseNotMet ── ApiError►│  │
//! │  │         │                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { code: "DISCOUNT_REJECTED",                                           │
//! │    message: "Minimum purchase of $50.00 required ..." }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Self-healing detaches are not errors and never reach this type.

use serde::Serialize;

use kassa_core::{CoreError, StoreError, ValidationError};

/// Error returned from checkout commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Cart not found: 6f1c..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found, or not owned by the caller (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// The discount cannot be applied to this cart (422)
    DiscountRejected,

    /// The caller's role lacks the permission (403)
    PermissionDenied,

    /// Database operation failed (500)
    DatabaseError,

    /// Cart operation failed (limits, branch resolution)
    CartError,

    /// Internal server error (500)
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }
}

/// Converts collaborator errors to API errors.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ApiError::validation(err.to_string()),
            StoreError::Missing { .. } => ApiError::not_found(err.to_string()),
            StoreError::Backend(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Storage backend failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Store(e) => ApiError::from(e),
            CoreError::CartNotFound(_)
            | CoreError::ItemNotFound { .. }
            | CoreError::DiscountNotFound(_)
            | CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::RoleNotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::DiscountInactive { .. }
            | CoreError::DiscountNotStarted { .. }
            | CoreError::DiscountExpired { .. }
            | CoreError::DiscountExhausted { .. }
            | CoreError::DiscountNotAvailableAtBranch { .. }
            | CoreError::MinimumPurchaseNotMet { .. } => {
                ApiError::new(ErrorCode::DiscountRejected, err.to_string())
            }
            CoreError::PermissionDenied { .. } => {
                ApiError::new(ErrorCode::PermissionDenied, err.to_string())
            }
            CoreError::ProductUnavailable(_)
            | CoreError::BranchNotResolved { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::AmountOverflow => ApiError::cart(err.to_string()),
            CoreError::QuantityTooLarge { .. } | CoreError::BuiltinRoleImmutable(_) => {
                ApiError::validation(err.to_string())
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::Money;

    #[test]
    fn test_backend_details_are_masked() {
        let err = ApiError::from(StoreError::Backend("disk I/O error at page 7".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("page 7"));
    }

    #[test]
    fn test_duplicate_code_is_validation_error() {
        let err = ApiError::from(CoreError::Store(StoreError::Conflict {
            entity: "code".to_string(),
            value: "SAVE10".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("SAVE10"));
    }

    #[test]
    fn test_discount_rejection_code() {
        let err = ApiError::from(CoreError::MinimumPurchaseNotMet {
            minimum: Money::from_cents(5000),
            subtotal: Money::from_cents(3000),
        });
        assert_eq!(err.code, ErrorCode::DiscountRejected);
        assert!(err.message.contains("50.00"));
    }

    #[test]
    fn test_amount_overflow_is_cart_error() {
        let err = ApiError::from(CoreError::AmountOverflow);
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[test]
    fn test_serializes_screaming_code() {
        let err = ApiError::not_found("Cart not found: c1");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Cart not found: c1");
    }
}
