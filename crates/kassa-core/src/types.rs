//! # Domain Types
//!
//! Carts, line items and the collaborator records the cart engine reads.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session ──(user, branch)──► Cart ──owns──► LineItem*                   │
//! │                               │                                         │
//! │                               ├── discount_id ──► DiscountPolicy        │
//! │                               └── customer_id ──► Customer              │
//! │                                                                         │
//! │  Product (catalog) ──snapshot on add──► LineItem                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A line item freezes name, unit price and tax rate when it is added. Later
//! catalog price changes do not reprice an open cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Rate};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Line Item
// =============================================================================

/// A line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub product_id: String,
    /// Product name at time of adding (frozen).
    pub product_name: String,
    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,
    /// Never negative; a line whose quantity drops to 0 is deleted.
    pub quantity: i64,
    /// Tax rate in basis points at time of adding (frozen).
    pub tax_rate_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    fn from_request(request: &AddItemRequest) -> Self {
        LineItem {
            id: Uuid::new_v4().to_string(),
            product_id: request.product_id.clone(),
            product_name: request.product_name.clone(),
            unit_price_cents: request.unit_price_cents,
            quantity: request.quantity,
            tax_rate_bps: request.tax_rate_bps,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.tax_rate_bps)
    }

    /// unit price × quantity
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// `line_total`, or `None` when it does not fit in i64 cents.
    #[inline]
    pub fn checked_line_total(&self) -> Option<Money> {
        self.unit_price().checked_multiply_quantity(self.quantity)
    }

    /// Tax for this line, rounded half-up to the cent.
    #[inline]
    pub fn tax(&self) -> Money {
        self.line_total().apply_rate(self.tax_rate())
    }
}

/// Input for adding a line to a cart.
///
/// Carries its own name, price and tax rate so the caller decides what gets
/// frozen; `CartService::add_product` fills it from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub tax_rate_bps: u32,
}

impl AddItemRequest {
    /// Freezes a catalog product into a request.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        AddItemRequest {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            tax_rate_bps: product.tax_rate_bps,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A cashier's cart at one branch.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product again
///   increases the quantity)
/// - Every stored quantity is > 0
/// - At most one active cart per (user, branch); the database enforces it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub branch_id: String,
    pub is_active: bool,
    pub discount_id: Option<String>,
    pub customer_id: Option<String>,
    pub items: Vec<LineItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// A fresh, empty, active cart.
    pub fn new(user_id: &str, branch_id: &str) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            branch_id: branch_id.to_string(),
            is_active: true,
            discount_id: None,
            customer_id: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` may operate on this cart.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.is_active && self.user_id == user_id
    }

    /// Adds a line, or increments the existing line for the same product.
    ///
    /// ## Behavior
    /// ```text
    /// add(COKE, 2)  → [COKE×2]
    /// add(COKE, 3)  → [COKE×5]          (upsert, no duplicate line)
    /// add(CHIPS, 1) → [COKE×5, CHIPS×1]
    /// ```
    ///
    /// The existing line keeps its frozen price; only the quantity changes.
    /// Returns the id of the affected line.
    pub fn add_item(&mut self, request: &AddItemRequest, max_items: usize) -> CoreResult<String> {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == request.product_id)
        {
            let new_qty = item.quantity + request.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            let id = item.id.clone();
            self.touch();
            return Ok(id);
        }

        if self.items.len() >= max_items {
            return Err(CoreError::CartTooLarge { max: max_items });
        }

        let item = LineItem::from_request(request);
        let id = item.id.clone();
        self.items.push(item);
        self.touch();
        Ok(id)
    }

    /// Sets a line's quantity; 0 deletes the line.
    pub fn set_item_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity < 0 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_ITEM_QUANTITY,
            }
            .into());
        }

        if quantity == 0 {
            return self.remove_item(item_id).map(|_| ());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let cart_id = self.id.clone();
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound {
                cart_id,
                item_id: item_id.to_string(),
            })?;
        item.quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Removes a line. Only lines of *this* cart can be removed.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<LineItem> {
        let position = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::ItemNotFound {
                cart_id: self.id.clone(),
                item_id: item_id.to_string(),
            })?;
        let removed = self.items.remove(position);
        self.touch();
        Ok(removed)
    }

    /// Empties the cart and drops customer and discount. The cart itself
    /// stays.
    pub fn clear(&mut self) {
        self.items.clear();
        self.customer_id = None;
        self.discount_id = None;
        self.touch();
    }

    pub fn find_item(&self, item_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Collaborator records
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub tax_rate_bps: u32,
    /// Needed for category-scoped discounts.
    pub category_id: Option<String>,
    pub is_active: bool,
}

/// A customer attached to a cart (display subset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The authenticated caller, as produced by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    /// Role name; resolved against built-ins first, then the role store.
    pub role: String,
    /// The register (terminal) the user is signed in at, if any.
    pub register_id: Option<String>,
    /// Branch assignment on the user record, used when no register is known.
    pub branch_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_CART_ITEMS;

    fn request(product_id: &str, price_cents: i64, quantity: i64) -> AddItemRequest {
        AddItemRequest {
            product_id: product_id.to_string(),
            product_name: format!("Product {}", product_id),
            unit_price_cents: price_cents,
            quantity,
            tax_rate_bps: 1000,
        }
    }

    #[test]
    fn test_add_item_upserts_by_product() {
        let mut cart = Cart::new("u1", "b1");

        let first = cart.add_item(&request("A", 999, 2), MAX_CART_ITEMS).unwrap();
        let second = cart.add_item(&request("A", 999, 3), MAX_CART_ITEMS).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_item_keeps_frozen_price_on_upsert() {
        let mut cart = Cart::new("u1", "b1");
        cart.add_item(&request("A", 999, 1), MAX_CART_ITEMS).unwrap();
        cart.add_item(&request("A", 1299, 1), MAX_CART_ITEMS).unwrap();

        assert_eq!(cart.items[0].unit_price_cents, 999);
        assert_eq!(cart.items[0].line_total().cents(), 1998);
    }

    #[test]
    fn test_add_item_respects_limits() {
        let mut cart = Cart::new("u1", "b1");
        cart.add_item(&request("A", 100, 1), 1).unwrap();
        assert!(matches!(
            cart.add_item(&request("B", 100, 1), 1),
            Err(CoreError::CartTooLarge { max: 1 })
        ));
        assert!(matches!(
            cart.add_item(&request("A", 100, MAX_ITEM_QUANTITY), 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new("u1", "b1");
        let id = cart.add_item(&request("A", 100, 2), MAX_CART_ITEMS).unwrap();

        cart.set_item_quantity(&id, 0).unwrap();

        assert!(cart.find_item(&id).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_rejects_negative() {
        let mut cart = Cart::new("u1", "b1");
        let id = cart.add_item(&request("A", 100, 2), MAX_CART_ITEMS).unwrap();

        let err = cart.set_item_quantity(&id, -1).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cart.find_item(&id).unwrap().quantity, 2);
    }

    #[test]
    fn test_set_quantity_unknown_item() {
        let mut cart = Cart::new("u1", "b1");
        let err = cart.set_item_quantity("nope", 3).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound { .. }));
    }

    #[test]
    fn test_remove_item_from_other_cart_fails() {
        let mut mine = Cart::new("u1", "b1");
        let mut theirs = Cart::new("u2", "b1");
        let their_item = theirs.add_item(&request("A", 100, 1), MAX_CART_ITEMS).unwrap();

        assert!(matches!(
            mine.remove_item(&their_item),
            Err(CoreError::ItemNotFound { .. })
        ));
        assert_eq!(theirs.item_count(), 1);
    }

    #[test]
    fn test_clear_drops_customer_and_discount() {
        let mut cart = Cart::new("u1", "b1");
        cart.add_item(&request("A", 100, 1), MAX_CART_ITEMS).unwrap();
        cart.discount_id = Some("d1".to_string());
        cart.customer_id = Some("c1".to_string());
        let id = cart.id.clone();

        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.discount_id.is_none());
        assert!(cart.customer_id.is_none());
        assert_eq!(cart.id, id);
    }

    #[test]
    fn test_ownership() {
        let mut cart = Cart::new("u1", "b1");
        assert!(cart.is_owned_by("u1"));
        assert!(!cart.is_owned_by("u2"));
        cart.is_active = false;
        assert!(!cart.is_owned_by("u1"));
    }

    #[test]
    fn test_line_item_math() {
        let mut cart = Cart::new("u1", "b1");
        cart.add_item(&request("A", 2000, 2), MAX_CART_ITEMS).unwrap();
        let item = &cart.items[0];
        assert_eq!(item.line_total().cents(), 4000);
        assert_eq!(item.tax().cents(), 400);
    }
}
