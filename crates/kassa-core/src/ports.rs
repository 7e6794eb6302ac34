//! # Collaborator Ports
//!
//! The traits the cart engine talks to. `kassa-db::Database` implements all
//! of them on SQLite; tests may implement them in memory.
//!
//! ```text
//! ┌──────────────┐      ┌───────────────────────┐      ┌──────────────┐
//! │ CartService  │─────►│ ports (this module)   │◄─────│  kassa-db    │
//! │ (checkout)   │ uses │ CartStore, ...        │ impl │  Database    │
//! └──────────────┘      └───────────────────────┘      └──────────────┘
//! ```
//!
//! Lookups return `Ok(None)` for missing records; `Err` is reserved for the
//! backend failing.

use thiserror::Error;

use crate::allocation::ProductCategories;
use crate::discount::DiscountPolicy;
use crate::roles::Role;
use crate::types::{Cart, Customer, Product};

/// A collaborator could not complete a call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{entity} '{value}' already exists")]
    Conflict { entity: String, value: String },

    /// The record to update does not exist.
    #[error("{entity} not found: {id}")]
    Missing { entity: String, id: String },

    #[error("Storage backend failed: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Register (terminal) → branch lookup.
#[allow(async_fn_in_trait)]
pub trait RegisterDirectory {
    async fn branch_for_register(&self, register_id: &str) -> StoreResult<Option<String>>;
}

/// Cart persistence.
#[allow(async_fn_in_trait)]
pub trait CartStore {
    /// The active cart for (user, branch), items included.
    async fn find_active_cart(&self, user_id: &str, branch_id: &str) -> StoreResult<Option<Cart>>;

    /// Any cart by id, items included.
    async fn find_cart(&self, cart_id: &str) -> StoreResult<Option<Cart>>;

    /// Inserts a new empty cart. If another active cart for the same
    /// (user, branch) won a race, that cart is returned instead.
    async fn create_cart(&self, cart: &Cart) -> StoreResult<Cart>;

    /// Writes the header and replaces the items in one transaction.
    async fn save_cart(&self, cart: &Cart) -> StoreResult<()>;

    async fn clear_cart_discount(&self, cart_id: &str) -> StoreResult<()>;

    /// Deletes every item and drops customer and discount, atomically.
    async fn clear_cart(&self, cart_id: &str) -> StoreResult<()>;
}

/// Discount policy persistence.
#[allow(async_fn_in_trait)]
pub trait DiscountStore {
    async fn find_discount(&self, discount_id: &str) -> StoreResult<Option<DiscountPolicy>>;

    /// Case-insensitive code lookup.
    async fn find_discount_by_code(&self, code: &str) -> StoreResult<Option<DiscountPolicy>>;

    async fn insert_discount(&self, discount: &DiscountPolicy) -> StoreResult<()>;

    async fn update_discount(&self, discount: &DiscountPolicy) -> StoreResult<()>;
}

/// Product catalog.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog {
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>>;

    /// Categories of the given products; products without one are absent.
    async fn categories_for(&self, product_ids: &[String]) -> StoreResult<ProductCategories>;
}

#[allow(async_fn_in_trait)]
pub trait CustomerDirectory {
    async fn find_customer(&self, customer_id: &str) -> StoreResult<Option<Customer>>;
}

/// Custom (non-built-in) roles.
#[allow(async_fn_in_trait)]
pub trait RoleStore {
    async fn find_role(&self, name: &str) -> StoreResult<Option<Role>>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    /// Inserts or replaces a role by name.
    async fn save_role(&self, role: &Role) -> StoreResult<()>;

    /// Returns whether a role was deleted.
    async fn delete_role(&self, name: &str) -> StoreResult<bool>;
}
