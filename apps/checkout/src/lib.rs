//! # Kassa Checkout
//!
//! The cart lifecycle and discount administration surface of Kassa.
//!
//! ## Module Organization
//! ```text
//! kassa_checkout/
//! ├── lib.rs          ◄─── You are here (wiring)
//! ├── state/
//! │   └── config.rs   ◄─── CheckoutConfig (KASSA_* environment)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Session authorization
//! │   ├── cart.rs     ◄─── CartService (cart lifecycle, pricing)
//! │   ├── discount.rs ◄─── DiscountAdmin
//! │   └── roles.rs    ◄─── RoleAdmin
//! ├── telemetry.rs    ◄─── tracing subscriber
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup
//! ```rust,no_run
//! use kassa_checkout::{open_database, CartService, CheckoutConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! kassa_checkout::telemetry::init_tracing();
//! let config = CheckoutConfig::from_env()?;
//! let db = open_database(&config).await?;
//! let carts = CartService::new(db, &config);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod error;
pub mod state;
pub mod telemetry;

pub use commands::{CartService, CheckoutStore, DiscountAdmin, RoleAdmin};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::{CheckoutConfig, ConfigError};

use tracing::info;

use kassa_db::{Database, DbConfig, DbResult};

/// Connects to the configured database and applies pending migrations.
///
/// The parent directory is created when missing.
pub async fn open_database(config: &CheckoutConfig) -> DbResult<Database> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| kassa_db::DbError::ConnectionFailed(e.to_string()))?;
        }
    }

    info!(db_path = ?config.db_path, "Opening database");
    Database::new(DbConfig::new(config.db_path.clone())).await
}
