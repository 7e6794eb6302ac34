//! # kassa-core: Cart Pricing & Discount Logic
//!
//! Pure cart math, discount rules and the collaborator traits the checkout
//! service is written against. No I/O happens in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 checkout (CartService, admin)                   │   │
//! │  │   get_or_create_active_cart, add_item, attach_discount, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kassa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │   │  types   │ │ discount │ │ allocation │ │    totals    │   │   │
//! │  │   │  Cart    │ │ Policy   │ │ PCT/FIXED/ │ │ subtotal/tax │   │   │
//! │  │   │ LineItem │ │ validity │ │   BXGY     │ │ discount/tot │   │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘   │   │
//! │  │   ports: CartStore, DiscountStore, ProductCatalog, ...         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 kassa-db (implements ports on SQLite)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Cart, LineItem, Product, Customer, Session
//! - [`money`] - Money (integer cents) and Rate (basis points)
//! - [`discount`] - Discount policies and their validity rules
//! - [`allocation`] - Discount amount per rule type
//! - [`totals`] - Cart totals
//! - [`view`] - The priced cart returned to the UI
//! - [`roles`] - Roles and permissions
//! - [`ports`] - Collaborator traits
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kassa_core::money::{Money, Rate};
//!
//! let price = Money::from_cents(1099); // $10.99
//! let tax = price.apply_rate(Rate::from_bps(825)); // 8.25 %
//!
//! // $0.906675 rounds to $0.91
//! assert_eq!(tax.cents(), 91);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod discount;
pub mod error;
pub mod money;
pub mod ports;
pub mod roles;
pub mod totals;
pub mod types;
pub mod validation;
pub mod view;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{compute_discount_amount, ProductCategories};
pub use discount::{
    AppliesTo, CreateDiscountRequest, DiscountKind, DiscountPolicy, DiscountRule,
    DiscountSummary, UpdateDiscountRequest, ValidityRules,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use ports::{StoreError, StoreResult};
pub use roles::{Permission, Role};
pub use totals::{price_cart, CartPricing, CartTotals, DiscountOutcome, PricingContext};
pub use types::*;
pub use view::CartView;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of distinct lines in a cart.
///
/// The checkout service may be configured with a different limit.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typos at the register (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum unit price of a line, in cents ($1,000,000.00).
///
/// `MAX_PRICE_CENTS × MAX_ITEM_QUANTITY × MAX_CART_ITEMS` stays far inside
/// i64, so a cart built from validated lines always prices.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;
