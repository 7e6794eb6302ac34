//! # Discount Administration
//!
//! Create, edit and switch off discount policies. Requests are typed and
//! validated before anything is written; a duplicate code comes back as a
//! validation error.

use chrono::Utc;
use tracing::{debug, info};

use crate::commands::authorize;
use crate::error::ApiResult;
use kassa_core::ports::{DiscountStore, RoleStore};
use kassa_core::validation::validate_id;
use kassa_core::{
    CoreError, CreateDiscountRequest, DiscountPolicy, Permission, Session, UpdateDiscountRequest,
};

/// Discount policy administration. Every operation requires
/// [`Permission::ManageDiscounts`].
#[derive(Debug, Clone)]
pub struct DiscountAdmin<S> {
    store: S,
}

impl<S: DiscountStore + RoleStore> DiscountAdmin<S> {
    pub fn new(store: S) -> Self {
        DiscountAdmin { store }
    }

    pub async fn create(
        &self,
        session: &Session,
        request: CreateDiscountRequest,
    ) -> ApiResult<DiscountPolicy> {
        authorize(&self.store, session, Permission::ManageDiscounts).await?;
        debug!(name = %request.name, kind = %request.rule.kind(), "create_discount command");

        let policy = request.into_policy(Utc::now())?;
        self.store.insert_discount(&policy).await?;

        info!(discount_id = %policy.id, code = ?policy.code, kind = %policy.kind(), "Discount created");
        Ok(policy)
    }

    /// Replaces every editable field. Usage counters are kept.
    pub async fn update(
        &self,
        session: &Session,
        discount_id: &str,
        request: UpdateDiscountRequest,
    ) -> ApiResult<DiscountPolicy> {
        authorize(&self.store, session, Permission::ManageDiscounts).await?;
        debug!(discount_id = %discount_id, "update_discount command");

        let mut policy = self.load(discount_id).await?;
        policy.apply_update(request)?;
        self.store.update_discount(&policy).await?;

        info!(discount_id = %policy.id, is_active = policy.is_active, "Discount updated");
        Ok(policy)
    }

    /// Switches a discount off. Carts that still hold it drop it the next
    /// time they are read.
    pub async fn deactivate(&self, session: &Session, discount_id: &str) -> ApiResult<DiscountPolicy> {
        authorize(&self.store, session, Permission::ManageDiscounts).await?;
        debug!(discount_id = %discount_id, "deactivate_discount command");

        let mut policy = self.load(discount_id).await?;
        if policy.is_active {
            policy.is_active = false;
            policy.updated_at = Utc::now();
            self.store.update_discount(&policy).await?;
            info!(discount_id = %policy.id, "Discount deactivated");
        }

        Ok(policy)
    }

    pub async fn get(&self, session: &Session, discount_id: &str) -> ApiResult<DiscountPolicy> {
        authorize(&self.store, session, Permission::ManageDiscounts).await?;
        self.load(discount_id).await
    }

    async fn load(&self, discount_id: &str) -> ApiResult<DiscountPolicy> {
        validate_id("discountId", discount_id)?;

        Ok(self
            .store
            .find_discount(discount_id)
            .await?
            .ok_or_else(|| CoreError::DiscountNotFound(discount_id.to_string()))?)
    }
}
