//! # Repository Module
//!
//! One repository per table group, each holding a clone of the pool.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartService                                                            │
//! │       │  CartStore::find_active_cart(user, branch)                      │
//! │       ▼                                                                 │
//! │  Database (ports.rs)                                                    │
//! │       │  db.carts().find_active(user, branch)                           │
//! │       ▼                                                                 │
//! │  CartRepository                                                         │
//! │  ├── find_active / get_by_id                                            │
//! │  ├── insert / save                                                      │
//! │  └── clear / clear_discount                                             │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CartRepository`] - Carts and line items
//! - [`DiscountRepository`] - Discount policies
//! - [`ProductRepository`] - Catalog lookups
//! - [`CustomerRepository`] - Customers
//! - [`RegisterRepository`] - Register → branch
//! - [`RoleRepository`] - Custom roles

pub mod cart;
pub mod customer;
pub mod discount;
pub mod product;
pub mod register;
pub mod role;

pub use cart::CartRepository;
pub use customer::CustomerRepository;
pub use discount::DiscountRepository;
pub use product::ProductRepository;
pub use register::{Register, RegisterRepository};
pub use role::RoleRepository;
