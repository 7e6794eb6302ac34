//! The cart as the checkout UI sees it.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::{DiscountPolicy, DiscountSummary};
use crate::totals::CartTotals;
use crate::types::{Cart, Customer, LineItem};

/// A priced cart with its customer and discount resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: String,
    pub branch_id: String,
    pub items: Vec<LineItem>,
    pub customer: Option<Customer>,
    /// Only present when the discount actually applies.
    pub discount: Option<DiscountSummary>,
    pub totals: CartTotals,
}

impl CartView {
    pub fn new(
        cart: Cart,
        customer: Option<Customer>,
        discount: Option<&DiscountPolicy>,
        totals: CartTotals,
    ) -> Self {
        CartView {
            cart_id: cart.id,
            branch_id: cart.branch_id,
            items: cart.items,
            customer,
            discount: discount.map(DiscountPolicy::summary),
            totals,
        }
    }
}
