//! # Migrations
//!
//! The schema ships inside the binary. `Database::new` applies whatever is
//! pending; files under `migrations/sqlite/` are append-only
//! (`NNN_description.sql`).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// registers, products, customers, discounts, carts, cart_items, roles
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs pending migrations in filename order, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    Ok(())
}

/// `(embedded, applied)`. Applied is 0 before the first run.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
