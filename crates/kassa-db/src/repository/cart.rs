//! # Cart Repository
//!
//! Carts and their line items.
//!
//! ## Write Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartService loads a Cart, mutates it in memory, then calls save():    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE carts SET discount_id, customer_id, updated_at               │
//! │    DELETE FROM cart_items WHERE cart_id = ?                             │
//! │    INSERT INTO cart_items ... (one per line, in cart order)             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Two concurrent saves of the same cart: the last commit wins.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::{Cart, LineItem};

const CART_COLUMNS: &str =
    "id, user_id, branch_id, is_active, discount_id, customer_id, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct CartRecord {
    id: String,
    user_id: String,
    branch_id: String,
    is_active: bool,
    discount_id: Option<String>,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRecord {
    fn into_cart(self, items: Vec<LineItem>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            branch_id: self.branch_id,
            is_active: self.is_active,
            discount_id: self.discount_id,
            customer_id: self.customer_id,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CartItemRecord {
    id: String,
    product_id: String,
    product_name: String,
    unit_price_cents: i64,
    quantity: i64,
    tax_rate_bps: i64,
    created_at: DateTime<Utc>,
}

impl CartItemRecord {
    fn into_line_item(self) -> DbResult<LineItem> {
        let tax_rate_bps = u32::try_from(self.tax_rate_bps)
            .map_err(|e| DbError::corrupt("cart item", &self.id, e))?;

        Ok(LineItem {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            unit_price_cents: self.unit_price_cents,
            quantity: self.quantity,
            tax_rate_bps,
            created_at: self.created_at,
        })
    }
}

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets a cart (active or not) with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cart>> {
        debug!(cart_id = %id, "Loading cart");

        let record: Option<CartRecord> =
            sqlx::query_as(&format!("SELECT {} FROM carts WHERE id = ?1", CART_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match record {
            Some(record) => {
                let items = self.items_for(&record.id).await?;
                Ok(Some(record.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Gets the active cart for a (user, branch) pair.
    pub async fn find_active(&self, user_id: &str, branch_id: &str) -> DbResult<Option<Cart>> {
        debug!(user_id = %user_id, branch_id = %branch_id, "Looking up active cart");

        let record: Option<CartRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM carts WHERE user_id = ?1 AND branch_id = ?2 AND is_active = 1",
            CART_COLUMNS
        ))
        .bind(user_id)
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => {
                let items = self.items_for(&record.id).await?;
                Ok(Some(record.into_cart(items)))
            }
            None => Ok(None),
        }
    }

    /// Inserts a new cart header. Items are not written; use `save`.
    ///
    /// Fails with `UniqueViolation` if the user already has an active cart
    /// at the branch.
    pub async fn insert(&self, cart: &Cart) -> DbResult<()> {
        debug!(cart_id = %cart.id, user_id = %cart.user_id, branch_id = %cart.branch_id, "Inserting cart");

        sqlx::query(
            r#"
            INSERT INTO carts (
                id, user_id, branch_id, is_active,
                discount_id, customer_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.user_id)
        .bind(&cart.branch_id)
        .bind(cart.is_active)
        .bind(&cart.discount_id)
        .bind(&cart.customer_id)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes the cart header and replaces all of its items, atomically.
    pub async fn save(&self, cart: &Cart) -> DbResult<()> {
        debug!(cart_id = %cart.id, items = cart.items.len(), "Saving cart");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE carts
            SET is_active = ?2, discount_id = ?3, customer_id = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&cart.id)
        .bind(cart.is_active)
        .bind(&cart.discount_id)
        .bind(&cart.customer_id)
        .bind(cart.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Cart", &cart.id));
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(&cart.id)
            .execute(&mut *tx)
            .await?;

        for item in &cart.items {
            insert_item(&mut tx, &cart.id, item).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Detaches the discount without touching items.
    pub async fn clear_discount(&self, cart_id: &str) -> DbResult<()> {
        debug!(cart_id = %cart_id, "Clearing cart discount");

        sqlx::query("UPDATE carts SET discount_id = NULL, updated_at = ?2 WHERE id = ?1")
            .bind(cart_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes every item and drops customer and discount in one
    /// transaction. The cart row itself stays.
    pub async fn clear(&self, cart_id: &str) -> DbResult<()> {
        debug!(cart_id = %cart_id, "Clearing cart");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            "UPDATE carts SET discount_id = NULL, customer_id = NULL, updated_at = ?2 WHERE id = ?1",
        )
        .bind(cart_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            // Dropping the transaction rolls the delete back.
            return Err(DbError::not_found("Cart", cart_id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Items of a cart, in the order they were saved.
    async fn items_for(&self, cart_id: &str) -> DbResult<Vec<LineItem>> {
        let records: Vec<CartItemRecord> = sqlx::query_as(
            r#"
            SELECT id, product_id, product_name, unit_price_cents, quantity, tax_rate_bps, created_at
            FROM cart_items
            WHERE cart_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(CartItemRecord::into_line_item)
            .collect()
    }
}

async fn insert_item(
    tx: &mut Transaction<'_, Sqlite>,
    cart_id: &str,
    item: &LineItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_items (
            id, cart_id, product_id, product_name,
            unit_price_cents, quantity, tax_rate_bps, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(cart_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(i64::from(item.tax_rate_bps))
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
