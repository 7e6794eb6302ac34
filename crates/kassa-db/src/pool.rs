//! # Database Handle
//!
//! Opens the Kassa SQLite store and hands out repositories.
//!
//! ```text
//! DbConfig::new("kassa.db")      file: WAL, up to N connections
//! DbConfig::in_memory()          tests: one private connection
//!        │
//!        ▼
//! Database::new(config) ──► migrations ──► db.carts() / db.discounts() / ...
//! ```
//!
//! An in-memory database lives as long as its only connection, so that pool
//! never shrinks below one and never lets the connection idle out. Anything
//! run inside a transaction must use the transaction, not the pool, or it
//! waits on itself.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    CartRepository, CustomerRepository, DiscountRepository, ProductRepository,
    RegisterRepository, RoleRepository,
};

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives and how many connections it may use.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// A register rarely needs more than a handful.
    pub max_connections: u32,

    /// How long a command waits for a free connection.
    pub acquire_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    /// A file-backed store, created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A private, throwaway store.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Ignored for in-memory stores, which always use one connection.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                self.database_path.display()
            ))
            .map(|options| {
                options
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .create_if_missing(true)
            })
        };

        options
            .map(|options| options.foreign_keys(true))
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))
    }
}

// =============================================================================
// Database
// =============================================================================

/// The store behind a `CartService`: implements every `kassa_core::ports`
/// trait and exposes the repositories for setup and seeding.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::in_memory()).await?;
/// db.registers().upsert(&register).await?;
/// let carts = CartService::new(db, &CheckoutConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        let in_memory = config.is_in_memory();
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout((!in_memory).then_some(Duration::from_secs(600)))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections, in_memory, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations; already applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    pub fn discounts(&self) -> DiscountRepository {
        DiscountRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn registers(&self) -> RegisterRepository {
        RegisterRepository::new(self.pool.clone())
    }

    pub fn roles(&self) -> RoleRepository {
        RoleRepository::new(self.pool.clone())
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
