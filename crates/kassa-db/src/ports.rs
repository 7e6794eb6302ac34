//! # Collaborator Implementations
//!
//! `Database` as every port the cart engine needs. Each method delegates to
//! a repository; `DbError` converts into `StoreError` on the way out.

use tracing::{debug, info};

use crate::error::DbError;
use crate::pool::Database;
use kassa_core::ports::{
    CartStore, CustomerDirectory, DiscountStore, ProductCatalog, RegisterDirectory, RoleStore,
    StoreResult,
};
use kassa_core::{Cart, Customer, DiscountPolicy, Product, ProductCategories, Role};

impl RegisterDirectory for Database {
    async fn branch_for_register(&self, register_id: &str) -> StoreResult<Option<String>> {
        let register = self.registers().get_by_id(register_id).await?;
        Ok(register.map(|r| r.branch_id))
    }
}

impl CartStore for Database {
    async fn find_active_cart(&self, user_id: &str, branch_id: &str) -> StoreResult<Option<Cart>> {
        Ok(self.carts().find_active(user_id, branch_id).await?)
    }

    async fn find_cart(&self, cart_id: &str) -> StoreResult<Option<Cart>> {
        Ok(self.carts().get_by_id(cart_id).await?)
    }

    async fn create_cart(&self, cart: &Cart) -> StoreResult<Cart> {
        match self.carts().insert(cart).await {
            Ok(()) => Ok(cart.clone()),
            Err(err) if err.is_unique_violation() => {
                debug!(user_id = %cart.user_id, branch_id = %cart.branch_id, "Active cart created concurrently, reusing it");
                self.carts()
                    .find_active(&cart.user_id, &cart.branch_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Cart", &cart.id).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        Ok(self.carts().save(cart).await?)
    }

    async fn clear_cart_discount(&self, cart_id: &str) -> StoreResult<()> {
        Ok(self.carts().clear_discount(cart_id).await?)
    }

    async fn clear_cart(&self, cart_id: &str) -> StoreResult<()> {
        Ok(self.carts().clear(cart_id).await?)
    }
}

impl DiscountStore for Database {
    async fn find_discount(&self, discount_id: &str) -> StoreResult<Option<DiscountPolicy>> {
        Ok(self.discounts().get_by_id(discount_id).await?)
    }

    async fn find_discount_by_code(&self, code: &str) -> StoreResult<Option<DiscountPolicy>> {
        Ok(self.discounts().get_by_code(code).await?)
    }

    async fn insert_discount(&self, discount: &DiscountPolicy) -> StoreResult<()> {
        Ok(self.discounts().insert(discount).await?)
    }

    async fn update_discount(&self, discount: &DiscountPolicy) -> StoreResult<()> {
        Ok(self.discounts().update(discount).await?)
    }
}

impl ProductCatalog for Database {
    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.products().get_by_id(product_id).await?)
    }

    async fn categories_for(&self, product_ids: &[String]) -> StoreResult<ProductCategories> {
        Ok(self.products().categories_for(product_ids).await?)
    }
}

impl CustomerDirectory for Database {
    async fn find_customer(&self, customer_id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.customers().get_by_id(customer_id).await?)
    }
}

impl RoleStore for Database {
    async fn find_role(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.roles().get(name).await?)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.roles().list().await?)
    }

    async fn save_role(&self, role: &Role) -> StoreResult<()> {
        info!(role = %role.name, "Saving custom role");
        Ok(self.roles().upsert(role).await?)
    }

    async fn delete_role(&self, name: &str) -> StoreResult<bool> {
        Ok(self.roles().delete(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use kassa_core::StoreError;

    #[tokio::test]
    async fn test_create_cart_reuses_concurrent_winner() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let winner = Cart::new("u1", "b1");
        let loser = Cart::new("u1", "b1");

        let first = db.create_cart(&winner).await.unwrap();
        let second = db.create_cart(&loser).await.unwrap();

        assert_eq!(first.id, winner.id);
        assert_eq!(second.id, winner.id);
    }

    #[tokio::test]
    async fn test_duplicate_code_surfaces_as_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let discount = kassa_core::CreateDiscountRequest {
            name: "Ten off".to_string(),
            code: Some("TEN".to_string()),
            rule: kassa_core::DiscountRule::Fixed { amount_cents: 1000 },
            applies_to: Default::default(),
            product_ids: Default::default(),
            category_ids: Default::default(),
            min_purchase_cents: None,
            starts_at: None,
            ends_at: None,
            max_uses: None,
            branch_id: None,
        }
        .into_policy(chrono::Utc::now())
        .unwrap();

        db.insert_discount(&discount).await.unwrap();
        let mut copy = discount.clone();
        copy.id = "other".to_string();

        let err = db.insert_discount(&copy).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref value, .. } if value == "TEN"));
    }

    #[tokio::test]
    async fn test_unknown_register_has_no_branch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.branch_for_register("R9").await.unwrap(), None);
    }
}
