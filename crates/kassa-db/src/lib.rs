//! # kassa-db: SQLite Persistence for Kassa
//!
//! Repositories over a sqlx SQLite pool, plus the implementations of the
//! `kassa_core::ports` traits that `CartService` runs against.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Data Flow                                  │
//! │                                                                         │
//! │  CartService::add_item(session, cart_id, request)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kassa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CartRepo      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ DiscountRepo  │    │   _schema    │  │   │
//! │  │   │ + ports impls │    │ ProductRepo…  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) file, or a private in-memory database in tests            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`ports`] - `kassa_core::ports` implemented for [`Database`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/kassa.db")).await?;
//! let cart = db.carts().find_active("user-1", "branch-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod ports;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CartRepository, CustomerRepository, DiscountRepository, ProductRepository, Register,
    RegisterRepository, RoleRepository,
};
