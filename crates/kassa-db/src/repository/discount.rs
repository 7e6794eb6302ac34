//! # Discount Repository
//!
//! Discount policies. The rule is flattened into columns:
//!
//! ```text
//! DiscountRule::Percentage { rate_bps }      → type PERCENTAGE,  value = rate_bps
//! DiscountRule::Fixed { amount_cents }       → type FIXED,       value = amount_cents
//! DiscountRule::BuyXGetY { buy, get, bps }   → type BUY_X_GET_Y, value = bps,
//!                                              buy_quantity, get_quantity
//! ```
//!
//! Product and category id sets are stored as JSON arrays.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::{AppliesTo, DiscountKind, DiscountPolicy, DiscountRule};

const DISCOUNT_COLUMNS: &str = r#"
    id, name, code, discount_type, value, buy_quantity, get_quantity,
    applies_to, product_ids, category_ids, min_purchase_cents,
    starts_at, ends_at, max_uses, current_uses, is_active, branch_id,
    created_at, updated_at
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
struct DiscountRecord {
    id: String,
    name: String,
    code: Option<String>,
    discount_type: String,
    value: i64,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    applies_to: String,
    product_ids: String,
    category_ids: String,
    min_purchase_cents: Option<i64>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    max_uses: Option<i64>,
    current_uses: i64,
    is_active: bool,
    branch_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DiscountRecord {
    fn into_policy(self) -> DbResult<DiscountPolicy> {
        let id = self.id.clone();
        let corrupt = |reason: String| DbError::corrupt("discount", &id, reason);
        let to_u32 = |field: &str, value: i64| {
            u32::try_from(value).map_err(|_| corrupt(format!("{} out of range: {}", field, value)))
        };

        let kind: DiscountKind = self
            .discount_type
            .parse()
            .map_err(|e: kassa_core::ValidationError| corrupt(e.to_string()))?;

        let rule = match kind {
            DiscountKind::Percentage => DiscountRule::Percentage {
                rate_bps: to_u32("value", self.value)?,
            },
            DiscountKind::Fixed => DiscountRule::Fixed {
                amount_cents: self.value,
            },
            DiscountKind::BuyXGetY => DiscountRule::BuyXGetY {
                buy_quantity: to_u32("buy_quantity", self.buy_quantity.unwrap_or(0))?,
                get_quantity: to_u32("get_quantity", self.get_quantity.unwrap_or(0))?,
                reward_bps: to_u32("value", self.value)?,
            },
        };

        let applies_to: AppliesTo = self
            .applies_to
            .parse()
            .map_err(|e: kassa_core::ValidationError| corrupt(e.to_string()))?;

        let product_ids: BTreeSet<String> =
            serde_json::from_str(&self.product_ids).map_err(|e| corrupt(e.to_string()))?;
        let category_ids: BTreeSet<String> =
            serde_json::from_str(&self.category_ids).map_err(|e| corrupt(e.to_string()))?;

        let max_uses = self
            .max_uses
            .map(|max| to_u32("max_uses", max))
            .transpose()?;
        let current_uses = to_u32("current_uses", self.current_uses)?;

        Ok(DiscountPolicy {
            id: self.id,
            name: self.name,
            code: self.code,
            rule,
            applies_to,
            product_ids,
            category_ids,
            min_purchase_cents: self.min_purchase_cents,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            max_uses,
            current_uses,
            is_active: self.is_active,
            branch_id: self.branch_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// The rule as (value, buy_quantity, get_quantity) columns.
fn rule_columns(rule: &DiscountRule) -> (i64, Option<i64>, Option<i64>) {
    match rule {
        DiscountRule::Percentage { rate_bps } => (i64::from(*rate_bps), None, None),
        DiscountRule::Fixed { amount_cents } => (*amount_cents, None, None),
        DiscountRule::BuyXGetY {
            buy_quantity,
            get_quantity,
            reward_bps,
        } => (
            i64::from(*reward_bps),
            Some(i64::from(*buy_quantity)),
            Some(i64::from(*get_quantity)),
        ),
    }
}

fn id_set_json(ids: &BTreeSet<String>) -> DbResult<String> {
    serde_json::to_string(ids).map_err(|e| DbError::Internal(e.to_string()))
}

/// Repository for discount policies.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiscountPolicy>> {
        debug!(discount_id = %id, "Loading discount");

        let record: Option<DiscountRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM discounts WHERE id = ?1",
            DISCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(DiscountRecord::into_policy).transpose()
    }

    /// Case-insensitive (the column is `COLLATE NOCASE`).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<DiscountPolicy>> {
        let code = code.trim();
        debug!(code = %code, "Looking up discount by code");

        let record: Option<DiscountRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM discounts WHERE code = ?1",
            DISCOUNT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        record.map(DiscountRecord::into_policy).transpose()
    }

    pub async fn insert(&self, discount: &DiscountPolicy) -> DbResult<()> {
        debug!(discount_id = %discount.id, name = %discount.name, kind = %discount.kind(), "Inserting discount");

        let (value, buy_quantity, get_quantity) = rule_columns(&discount.rule);

        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, name, code, discount_type, value, buy_quantity, get_quantity,
                applies_to, product_ids, category_ids, min_purchase_cents,
                starts_at, ends_at, max_uses, current_uses, is_active, branch_id,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19
            )
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.code)
        .bind(discount.kind().as_str())
        .bind(value)
        .bind(buy_quantity)
        .bind(get_quantity)
        .bind(discount.applies_to.as_str())
        .bind(id_set_json(&discount.product_ids)?)
        .bind(id_set_json(&discount.category_ids)?)
        .bind(discount.min_purchase_cents)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.max_uses.map(i64::from))
        .bind(i64::from(discount.current_uses))
        .bind(discount.is_active)
        .bind(&discount.branch_id)
        .bind(discount.created_at)
        .bind(discount.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, discount))?;

        Ok(())
    }

    /// Updates every editable column. `current_uses` is left alone; it
    /// belongs to the sale-completion flow.
    pub async fn update(&self, discount: &DiscountPolicy) -> DbResult<()> {
        debug!(discount_id = %discount.id, "Updating discount");

        let (value, buy_quantity, get_quantity) = rule_columns(&discount.rule);

        let updated = sqlx::query(
            r#"
            UPDATE discounts SET
                name = ?2, code = ?3, discount_type = ?4, value = ?5,
                buy_quantity = ?6, get_quantity = ?7, applies_to = ?8,
                product_ids = ?9, category_ids = ?10, min_purchase_cents = ?11,
                starts_at = ?12, ends_at = ?13, max_uses = ?14,
                is_active = ?15, branch_id = ?16, updated_at = ?17
            WHERE id = ?1
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.code)
        .bind(discount.kind().as_str())
        .bind(value)
        .bind(buy_quantity)
        .bind(get_quantity)
        .bind(discount.applies_to.as_str())
        .bind(id_set_json(&discount.product_ids)?)
        .bind(id_set_json(&discount.category_ids)?)
        .bind(discount.min_purchase_cents)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.max_uses.map(i64::from))
        .bind(discount.is_active)
        .bind(&discount.branch_id)
        .bind(discount.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_code(e, discount))?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Discount", &discount.id));
        }

        Ok(())
    }

    /// Records one redemption. Called by sale completion, never by carts.
    pub async fn increment_uses(&self, id: &str) -> DbResult<()> {
        debug!(discount_id = %id, "Incrementing discount uses");

        let updated = sqlx::query(
            "UPDATE discounts SET current_uses = current_uses + 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Discount", id));
        }

        Ok(())
    }
}

/// Fills in the offending code on a unique violation.
fn duplicate_code(err: sqlx::Error, discount: &DiscountPolicy) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => {
            DbError::duplicate("code", discount.code.clone().unwrap_or_default())
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kassa_core::CreateDiscountRequest;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn bxgy(code: &str) -> DiscountPolicy {
        CreateDiscountRequest {
            name: "Two plus one".to_string(),
            code: Some(code.to_string()),
            rule: DiscountRule::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                reward_bps: 10000,
            },
            applies_to: AppliesTo::EntireOrder,
            product_ids: ["A".to_string(), "B".to_string()].into_iter().collect(),
            category_ids: BTreeSet::new(),
            min_purchase_cents: Some(1000),
            starts_at: None,
            ends_at: None,
            max_uses: Some(50),
            branch_id: Some("b1".to_string()),
        }
        .into_policy(Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_load_preserves_rule() {
        let db = db().await;
        let policy = bxgy("3FOR2");
        db.discounts().insert(&policy).await.unwrap();

        let loaded = db.discounts().get_by_id(&policy.id).await.unwrap().unwrap();
        assert_eq!(loaded.rule, policy.rule);
        assert_eq!(loaded.product_ids, policy.product_ids);
        assert_eq!(loaded.max_uses, Some(50));
        assert_eq!(loaded.branch_id.as_deref(), Some("b1"));
        assert_eq!(loaded.min_purchase_cents, Some(1000));
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_insensitive() {
        let db = db().await;
        let policy = bxgy("SAVE10");
        db.discounts().insert(&policy).await.unwrap();

        let found = db.discounts().get_by_code("save10").await.unwrap().unwrap();
        assert_eq!(found.id, policy.id);
        assert!(db.discounts().get_by_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_reports_code() {
        let db = db().await;
        db.discounts().insert(&bxgy("DUPE")).await.unwrap();

        let err = db.discounts().insert(&bxgy("DUPE")).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "code");
                assert_eq!(value, "DUPE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_update_leaves_usage_counter() {
        let db = db().await;
        let mut policy = bxgy("KEEP");
        db.discounts().insert(&policy).await.unwrap();
        db.discounts().increment_uses(&policy.id).await.unwrap();

        policy.is_active = false;
        policy.current_uses = 0;
        db.discounts().update(&policy).await.unwrap();

        let loaded = db.discounts().get_by_id(&policy.id).await.unwrap().unwrap();
        assert!(!loaded.is_active);
        assert_eq!(loaded.current_uses, 1);
    }

    #[tokio::test]
    async fn test_update_missing_discount() {
        let db = db().await;
        let err = db.discounts().update(&bxgy("GHOST")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
