//! # Cart Commands
//!
//! The cart lifecycle: find or open the caller's active cart, edit its
//! lines, attach a discount, and price it on every response.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  get_or_create_active_cart                                              │
//! │     register ──► branch (or session branch)                             │
//! │     (user, branch) ──► active cart, created on first use                │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  ┌──────────────┐  add_item / add_product / update_item_quantity        │
//! │  │  Active cart │  remove_item / set_customer / clear_customer          │
//! │  │              │  attach_discount(_code) / detach_discount             │
//! │  └──────┬───────┘                                                       │
//! │         │ clear_cart (items, customer, discount gone; cart stays)       │
//! │         ▼                                                               │
//! │  Every response: CartView priced from the persisted items               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pricing on Read
//! ```text
//! cart ──┬── find_customer ──────────┐   (tokio::join!)
//!        └── resolve_active_discount ┤
//!                                    ▼
//!                  price_cart(items, discount, categories)
//!                                    │
//!              outcome BelowMinimum / Invalid?
//!                   yes │                 no │
//!                       ▼                    ▼
//!        clear_cart_discount (self-heal)   CartView
//! ```
//!
//! Carts are ownership-scoped: a cart id that exists but belongs to another
//! user, or is no longer active, is reported as `CartNotFound`.
//!
//! Concurrent edits of one cart are last-write-wins; no locking is done
//! here. Discount usage counters are never touched.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::commands::authorize;
use crate::error::ApiResult;
use crate::state::CheckoutConfig;
use kassa_core::ports::{
    CartStore, CustomerDirectory, DiscountStore, ProductCatalog, RegisterDirectory, RoleStore,
};
use kassa_core::totals::{self, price_cart, DiscountOutcome, PricingContext};
use kassa_core::validation::{validate_add_item, validate_id, validate_quantity};
use kassa_core::{
    AddItemRequest, AppliesTo, Cart, CartView, CoreError, Customer, DiscountPolicy, Permission,
    ProductCategories, Session, ValidationError, ValidityRules,
};

/// Every collaborator the cart lifecycle needs.
///
/// Implemented for anything that implements all of the ports, e.g.
/// `kassa_db::Database`.
pub trait CheckoutStore:
    RegisterDirectory + CartStore + DiscountStore + ProductCatalog + CustomerDirectory + RoleStore
{
}

impl<T> CheckoutStore for T where
    T: RegisterDirectory
        + CartStore
        + DiscountStore
        + ProductCatalog
        + CustomerDirectory
        + RoleStore
{
}

/// Cart lifecycle service.
#[derive(Debug, Clone)]
pub struct CartService<S> {
    store: S,
    rules: ValidityRules,
    max_items: usize,
}

impl<S: CheckoutStore> CartService<S> {
    pub fn new(store: S, config: &CheckoutConfig) -> Self {
        CartService {
            store,
            rules: config.validity_rules(),
            max_items: config.max_cart_items,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Cart lookup
    // =========================================================================

    /// Returns the caller's active cart for their branch, creating it on
    /// first use.
    pub async fn get_or_create_active_cart(&self, session: &Session) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(user_id = %session.user_id, "get_or_create_active_cart command");

        let branch_id = self.resolve_branch(session).await?;

        let cart = match self
            .store
            .find_active_cart(&session.user_id, &branch_id)
            .await?
        {
            Some(cart) => cart,
            None => {
                let cart = self
                    .store
                    .create_cart(&Cart::new(&session.user_id, &branch_id))
                    .await?;
                info!(cart_id = %cart.id, user_id = %session.user_id, branch_id = %branch_id, "Opened active cart");
                cart
            }
        };

        self.render(cart).await
    }

    pub async fn get_cart(&self, session: &Session, cart_id: &str) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, "get_cart command");

        let cart = self.load_owned(session, cart_id).await?;
        self.render(cart).await
    }

    // =========================================================================
    // Line items
    // =========================================================================

    /// Adds a line, or increments the line that already holds the product.
    pub async fn add_item(
        &self,
        session: &Session,
        cart_id: &str,
        request: AddItemRequest,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, product_id = %request.product_id, quantity = request.quantity, "add_item command");

        validate_add_item(&request)?;
        self.insert_line(session, cart_id, request).await
    }

    /// Adds a catalog product at its current price and tax rate.
    pub async fn add_product(
        &self,
        session: &Session,
        cart_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, product_id = %product_id, quantity, "add_product command");

        validate_id("productId", product_id)?;
        validate_quantity(quantity)?;

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product.name).into());
        }

        let request = AddItemRequest::from_product(&product, quantity);
        self.insert_line(session, cart_id, request).await
    }

    /// Sets a line's quantity. Zero removes the line; negative is rejected.
    pub async fn update_item_quantity(
        &self,
        session: &Session,
        cart_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, item_id = %item_id, quantity, "update_item_quantity command");

        let mut cart = self.load_owned(session, cart_id).await?;
        cart.set_item_quantity(item_id, quantity)?;
        totals::subtotal(&cart.items)?;
        self.store.save_cart(&cart).await?;

        self.render(cart).await
    }

    pub async fn remove_item(
        &self,
        session: &Session,
        cart_id: &str,
        item_id: &str,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, item_id = %item_id, "remove_item command");

        let mut cart = self.load_owned(session, cart_id).await?;
        let removed = cart.remove_item(item_id)?;
        self.store.save_cart(&cart).await?;
        debug!(cart_id = %cart_id, product_id = %removed.product_id, "Line removed");

        self.render(cart).await
    }

    /// Deletes every line and drops customer and discount in one
    /// transaction. The cart itself stays active.
    pub async fn clear_cart(&self, session: &Session, cart_id: &str) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, "clear_cart command");

        let mut cart = self.load_owned(session, cart_id).await?;
        self.store.clear_cart(&cart.id).await?;
        cart.clear();

        self.render(cart).await
    }

    // =========================================================================
    // Discounts
    // =========================================================================

    /// Attaches a discount by id.
    ///
    /// The discount must be active, inside its dates, under its usage limit,
    /// available at the cart's branch, and the cart subtotal must reach its
    /// minimum purchase.
    pub async fn attach_discount(
        &self,
        session: &Session,
        cart_id: &str,
        discount_id: &str,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ApplyDiscount).await?;
        debug!(cart_id = %cart_id, discount_id = %discount_id, "attach_discount command");

        if discount_id.trim().is_empty() {
            return Err(ValidationError::required("discountId").into());
        }

        let cart = self.load_owned(session, cart_id).await?;
        let policy = self
            .store
            .find_discount(discount_id)
            .await?
            .ok_or_else(|| CoreError::DiscountNotFound(discount_id.to_string()))?;

        self.attach(cart, policy).await
    }

    /// Attaches a discount by its code, matched case-insensitively.
    pub async fn attach_discount_code(
        &self,
        session: &Session,
        cart_id: &str,
        code: &str,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ApplyDiscount).await?;
        debug!(cart_id = %cart_id, code = %code, "attach_discount_code command");

        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::required("code").into());
        }

        let cart = self.load_owned(session, cart_id).await?;
        let policy = self
            .store
            .find_discount_by_code(code)
            .await?
            .ok_or_else(|| CoreError::DiscountNotFound(code.to_string()))?;

        self.attach(cart, policy).await
    }

    /// Removes the discount, if any. Detaching twice is the same as once.
    pub async fn detach_discount(&self, session: &Session, cart_id: &str) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, "detach_discount command");

        let mut cart = self.load_owned(session, cart_id).await?;
        if cart.discount_id.take().is_some() {
            self.store.clear_cart_discount(&cart.id).await?;
        }

        self.render(cart).await
    }

    /// Loads an attached discount for pricing.
    ///
    /// Fails closed: a lookup error is logged and treated as no discount.
    /// Validity (dates, branch, active flag) is judged by `price_cart`.
    pub async fn resolve_active_discount(&self, discount_id: &str) -> Option<DiscountPolicy> {
        match self.store.find_discount(discount_id).await {
            Ok(policy) => policy,
            Err(e) => {
                warn!(discount_id = %discount_id, error = %e, "Discount lookup failed, pricing without it");
                None
            }
        }
    }

    // =========================================================================
    // Customer
    // =========================================================================

    pub async fn set_customer(
        &self,
        session: &Session,
        cart_id: &str,
        customer_id: &str,
    ) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, customer_id = %customer_id, "set_customer command");

        validate_id("customerId", customer_id)?;

        let mut cart = self.load_owned(session, cart_id).await?;
        let customer = self
            .store
            .find_customer(customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        cart.customer_id = Some(customer.id);
        self.store.save_cart(&cart).await?;

        self.render(cart).await
    }

    pub async fn clear_customer(&self, session: &Session, cart_id: &str) -> ApiResult<CartView> {
        authorize(&self.store, session, Permission::ManageCart).await?;
        debug!(cart_id = %cart_id, "clear_customer command");

        let mut cart = self.load_owned(session, cart_id).await?;
        if cart.customer_id.take().is_some() {
            self.store.save_cart(&cart).await?;
        }

        self.render(cart).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Register first, then the user's branch assignment.
    async fn resolve_branch(&self, session: &Session) -> ApiResult<String> {
        if let Some(register_id) = session.register_id.as_deref() {
            if let Some(branch_id) = self.store.branch_for_register(register_id).await? {
                return Ok(branch_id);
            }
            debug!(register_id = %register_id, "Unknown register, using session branch");
        }

        session
            .branch_id
            .clone()
            .ok_or_else(|| {
                CoreError::BranchNotResolved {
                    user_id: session.user_id.clone(),
                }
                .into()
            })
    }

    async fn load_owned(&self, session: &Session, cart_id: &str) -> ApiResult<Cart> {
        validate_id("cartId", cart_id)?;

        match self.store.find_cart(cart_id).await? {
            Some(cart) if cart.is_owned_by(&session.user_id) => Ok(cart),
            _ => Err(CoreError::CartNotFound(cart_id.to_string()).into()),
        }
    }

    async fn insert_line(
        &self,
        session: &Session,
        cart_id: &str,
        request: AddItemRequest,
    ) -> ApiResult<CartView> {
        let mut cart = self.load_owned(session, cart_id).await?;
        let item_id = cart.add_item(&request, self.max_items)?;
        // A cart that cannot be priced is never persisted.
        totals::subtotal(&cart.items)?;
        self.store.save_cart(&cart).await?;
        debug!(cart_id = %cart_id, item_id = %item_id, "Line saved");

        self.render(cart).await
    }

    async fn attach(&self, mut cart: Cart, policy: DiscountPolicy) -> ApiResult<CartView> {
        policy.check_attachable(Utc::now(), &cart.branch_id)?;
        policy.check_minimum_purchase(totals::subtotal(&cart.items)?)?;

        cart.discount_id = Some(policy.id.clone());
        self.store.save_cart(&cart).await?;
        info!(cart_id = %cart.id, discount_id = %policy.id, discount = %policy.name, "Discount attached");

        self.render(cart).await
    }

    /// Prices the cart and detaches a discount that no longer applies.
    async fn render(&self, mut cart: Cart) -> ApiResult<CartView> {
        let (customer, discount) = tokio::join!(
            self.find_customer(cart.customer_id.as_deref()),
            self.find_attached_discount(cart.discount_id.as_deref()),
        );
        let customer = customer?;

        let categories = match &discount {
            Some(policy) if policy.applies_to == AppliesTo::SpecificCategories => {
                let product_ids: Vec<String> =
                    cart.items.iter().map(|i| i.product_id.clone()).collect();
                self.store.categories_for(&product_ids).await?
            }
            _ => ProductCategories::new(),
        };

        let ctx = PricingContext {
            now: Utc::now(),
            branch_id: &cart.branch_id,
            rules: self.rules,
        };
        let pricing = price_cart(&cart.items, discount.as_ref(), &categories, ctx)?;

        let applied = match pricing.outcome {
            DiscountOutcome::Applied => discount,
            outcome if outcome.should_detach() => {
                info!(cart_id = %cart.id, discount_id = ?cart.discount_id, ?outcome, "Detaching discount that no longer applies");
                self.store.clear_cart_discount(&cart.id).await?;
                cart.discount_id = None;
                None
            }
            _ => None,
        };

        Ok(CartView::new(cart, customer, applied.as_ref(), pricing.totals))
    }

    async fn find_customer(&self, customer_id: Option<&str>) -> ApiResult<Option<Customer>> {
        match customer_id {
            Some(id) => Ok(self.store.find_customer(id).await?),
            None => Ok(None),
        }
    }

    async fn find_attached_discount(&self, discount_id: Option<&str>) -> Option<DiscountPolicy> {
        match discount_id {
            Some(id) => self.resolve_active_discount(id).await,
            None => None,
        }
    }
}
