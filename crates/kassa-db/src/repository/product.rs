//! # Product Repository
//!
//! The slice of the catalog the cart engine reads: price, tax rate,
//! category and whether the product is still sold.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::{Product, ProductCategories};

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRecord {
    id: String,
    name: String,
    price_cents: i64,
    tax_rate_bps: i64,
    category_id: Option<String>,
    is_active: bool,
}

impl TryFrom<ProductRecord> for Product {
    type Error = DbError;

    fn try_from(record: ProductRecord) -> DbResult<Self> {
        let tax_rate_bps = u32::try_from(record.tax_rate_bps)
            .map_err(|e| DbError::corrupt("product", &record.id, e))?;

        Ok(Product {
            id: record.id,
            name: record.name,
            price_cents: record.price_cents,
            tax_rate_bps,
            category_id: record.category_id,
            is_active: record.is_active,
        })
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let product = repo.get_by_id("COKE-330").await?;
/// let categories = repo.categories_for(&["COKE-330".to_string()]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        debug!(product_id = %id, "Loading product");

        let record: Option<ProductRecord> = sqlx::query_as(
            r#"
            SELECT id, name, price_cents, tax_rate_bps, category_id, is_active
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(Product::try_from).transpose()
    }

    /// Maps product id → category id for the given products.
    ///
    /// Unknown products and products without a category are left out.
    pub async fn categories_for(&self, product_ids: &[String]) -> DbResult<ProductCategories> {
        debug!(count = product_ids.len(), "Loading product categories");

        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, category_id FROM products WHERE category_id IS NOT NULL AND id IN (",
        );
        let mut ids = query.separated(", ");
        for id in product_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");

        let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows.into_iter().collect())
    }

    /// Inserts a product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, name = %product.name, "Inserting product");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, tax_rate_bps, category_id, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(i64::from(product.tax_rate_bps))
        .bind(&product.category_id)
        .bind(product.is_active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Switches a product on or off for sale.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(product_id = %id, is_active, "Setting product availability");

        let updated = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Number of products in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(id: &str, category: Option<&str>) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents: 199,
            tax_rate_bps: 825,
            category_id: category.map(str::to_string),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("A", Some("drinks"))).await.unwrap();

        let loaded = db.products().get_by_id("A").await.unwrap().unwrap();
        assert_eq!(loaded, product("A", Some("drinks")));
        assert!(db.products().get_by_id("Z").await.unwrap().is_none());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_categories_for() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("A", Some("drinks"))).await.unwrap();
        db.products().insert(&product("B", None)).await.unwrap();
        db.products().insert(&product("C", Some("snacks"))).await.unwrap();

        let ids = vec!["A".to_string(), "B".to_string(), "X".to_string()];
        let categories = db.products().categories_for(&ids).await.unwrap();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories.get("A").map(String::as_str), Some("drinks"));
        assert!(db.products().categories_for(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_active() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("A", None)).await.unwrap();

        db.products().set_active("A", false).await.unwrap();
        assert!(!db.products().get_by_id("A").await.unwrap().unwrap().is_active);
        assert!(db.products().set_active("Z", false).await.is_err());
    }
}
