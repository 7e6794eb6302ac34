//! # Cart Totals
//!
//! Recomputes subtotal, tax, discount and total from persisted lines.
//! Nothing here is cached; every cart read goes through `price_cart`.
//!
//! ```text
//! subtotal  = Σ unit_price × qty                       (exact cents)
//! tax       = round_half_up(Σ line_total × tax_rate)   (rounded once)
//! discount  = min(allocated, subtotal)  or 0
//! total     = subtotal + tax − discount
//! ```
//!
//! Tax is computed on the undiscounted lines. Amounts that do not fit in
//! i64 cents are reported as `CoreError::AmountOverflow`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::{compute_discount_amount, ProductCategories};
use crate::discount::{DiscountPolicy, ValidityRules};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::LineItem;

/// The numbers shown at the bottom of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Distinct lines.
    pub item_count: usize,
    /// Units across all lines.
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl CartTotals {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// What happened to the attached discount while pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountOutcome {
    /// No discount was attached.
    NoDiscount,
    /// The discount applied (possibly for zero, e.g. no eligible lines).
    Applied,
    /// Subtotal fell below the discount's minimum purchase.
    BelowMinimum,
    /// Inactive, outside its dates, wrong branch or (if configured)
    /// exhausted.
    Invalid,
}

impl DiscountOutcome {
    /// The caller should detach the discount from the persisted cart.
    pub fn should_detach(&self) -> bool {
        matches!(self, DiscountOutcome::BelowMinimum | DiscountOutcome::Invalid)
    }
}

/// Totals plus the discount outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPricing {
    pub totals: CartTotals,
    pub outcome: DiscountOutcome,
}

/// Where and when the cart is being priced.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub now: DateTime<Utc>,
    pub branch_id: &'a str,
    pub rules: ValidityRules,
}

/// Σ unit price × quantity.
pub fn subtotal(items: &[LineItem]) -> CoreResult<Money> {
    items.iter().try_fold(Money::zero(), |acc, item| {
        item.checked_line_total()
            .and_then(|line| acc.checked_add(line))
            .ok_or(CoreError::AmountOverflow)
    })
}

/// Σ line total × tax rate, rounded half-up once.
///
/// Callers establish that every line total fits (see [`subtotal`]).
pub fn tax_total(items: &[LineItem]) -> Money {
    Money::sum_at_rates(items.iter().map(|item| (item.line_total(), item.tax_rate())))
}

/// Prices a cart.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use kassa_core::totals::{price_cart, DiscountOutcome, PricingContext};
/// use kassa_core::ValidityRules;
///
/// let ctx = PricingContext { now: Utc::now(), branch_id: "main", rules: ValidityRules::default() };
/// let pricing = price_cart(&[], None, &Default::default(), ctx).unwrap();
/// assert_eq!(pricing.totals.total_cents, 0);
/// assert_eq!(pricing.outcome, DiscountOutcome::NoDiscount);
/// ```
pub fn price_cart(
    items: &[LineItem],
    discount: Option<&DiscountPolicy>,
    categories: &ProductCategories,
    ctx: PricingContext<'_>,
) -> CoreResult<CartPricing> {
    let subtotal = subtotal(items)?;
    let tax = tax_total(items);

    let (discount_amount, outcome) = match discount {
        None => (Money::zero(), DiscountOutcome::NoDiscount),
        Some(policy) if !policy.is_valid_for_read(ctx.now, ctx.branch_id, ctx.rules) => {
            (Money::zero(), DiscountOutcome::Invalid)
        }
        Some(policy) if !policy.meets_minimum(subtotal) => {
            (Money::zero(), DiscountOutcome::BelowMinimum)
        }
        Some(policy) => {
            let amount = compute_discount_amount(items, policy, subtotal, categories);
            (amount.min(subtotal), DiscountOutcome::Applied)
        }
    };

    let total = subtotal
        .checked_add(tax)
        .and_then(|gross| gross.checked_sub(discount_amount))
        .ok_or(CoreError::AmountOverflow)?;

    let totals = CartTotals {
        item_count: items.len(),
        total_quantity: items.iter().map(|i| i.quantity).sum(),
        subtotal_cents: subtotal.cents(),
        tax_cents: tax.cents(),
        discount_cents: discount_amount.cents(),
        total_cents: total.cents(),
    };

    Ok(CartPricing { totals, outcome })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::{AppliesTo, CreateDiscountRequest, DiscountRule};
    use chrono::Duration;

    fn item(product_id: &str, price_cents: i64, quantity: i64, tax_rate_bps: u32) -> LineItem {
        LineItem {
            id: format!("item-{}", product_id),
            product_id: product_id.to_string(),
            product_name: product_id.to_string(),
            unit_price_cents: price_cents,
            quantity,
            tax_rate_bps,
            created_at: Utc::now(),
        }
    }

    fn discount(rule: DiscountRule, min_purchase_cents: Option<i64>) -> DiscountPolicy {
        CreateDiscountRequest {
            name: "Promo".to_string(),
            code: None,
            rule,
            applies_to: AppliesTo::EntireOrder,
            product_ids: Default::default(),
            category_ids: Default::default(),
            min_purchase_cents,
            starts_at: Some(Utc::now() - Duration::days(1)),
            ends_at: None,
            max_uses: None,
            branch_id: None,
        }
        .into_policy(Utc::now())
        .unwrap()
    }

    fn ctx() -> PricingContext<'static> {
        PricingContext {
            now: Utc::now(),
            branch_id: "main",
            rules: ValidityRules::default(),
        }
    }

    #[test]
    fn test_fixed_discount_worked_example() {
        // $20.00 × 2 at 10 % tax, $5.00 off
        let items = vec![item("A", 2000, 2, 1000)];
        let policy = discount(DiscountRule::Fixed { amount_cents: 500 }, None);

        let pricing = price_cart(&items, Some(&policy), &Default::default(), ctx()).unwrap();

        assert_eq!(pricing.outcome, DiscountOutcome::Applied);
        assert_eq!(pricing.totals.subtotal_cents, 4000);
        assert_eq!(pricing.totals.tax_cents, 400);
        assert_eq!(pricing.totals.discount_cents, 500);
        assert_eq!(pricing.totals.total_cents, 3900);
        assert_eq!(pricing.totals.item_count, 1);
        assert_eq!(pricing.totals.total_quantity, 2);
    }

    #[test]
    fn test_tax_is_rounded_once_over_all_lines() {
        // 0.5 + 0.5 + 0.5 cents = 1.5 → 2
        let items = vec![
            item("A", 10, 1, 500),
            item("B", 10, 1, 500),
            item("C", 10, 1, 500),
        ];
        assert_eq!(tax_total(&items).cents(), 2);

        let pricing = price_cart(&items, None, &Default::default(), ctx()).unwrap();
        assert_eq!(pricing.totals.tax_cents, 2);
        assert_eq!(pricing.totals.total_cents, 32);
    }

    #[test]
    fn test_overflowing_line_is_an_error() {
        let items = vec![item("A", i64::MAX / 2, 3, 0)];
        let err = price_cart(&items, None, &Default::default(), ctx()).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow));

        let items = vec![
            item("A", i64::MAX / 2, 1, 0),
            item("B", i64::MAX / 2, 1, 0),
            item("C", 2, 1, 0),
        ];
        assert!(matches!(subtotal(&items), Err(CoreError::AmountOverflow)));
    }

    #[test]
    fn test_tax_pushing_total_past_range_is_an_error() {
        let items = vec![item("A", i64::MAX - 10, 1, 10_000)];
        let err = price_cart(&items, None, &Default::default(), ctx()).unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow));
    }

    #[test]
    fn test_expired_discount_is_invalid_and_not_applied() {
        let items = vec![item("A", 2000, 1, 0)];
        let mut policy = discount(DiscountRule::Fixed { amount_cents: 500 }, None);
        policy.ends_at = Some(Utc::now() - Duration::days(1));

        let pricing = price_cart(&items, Some(&policy), &Default::default(), ctx()).unwrap();

        assert_eq!(pricing.outcome, DiscountOutcome::Invalid);
        assert!(pricing.outcome.should_detach());
        assert_eq!(pricing.totals.discount_cents, 0);
        assert_eq!(pricing.totals.total_cents, 2000);
    }

    #[test]
    fn test_below_minimum_after_items_removed() {
        let items = vec![item("A", 3000, 1, 0)];
        let policy = discount(DiscountRule::Percentage { rate_bps: 1000 }, Some(5000));

        let pricing = price_cart(&items, Some(&policy), &Default::default(), ctx()).unwrap();

        assert_eq!(pricing.outcome, DiscountOutcome::BelowMinimum);
        assert_eq!(pricing.totals.discount_cents, 0);
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let items = vec![item("A", 100, 1, 1000)];
        let policy = discount(DiscountRule::Fixed { amount_cents: 5000 }, None);

        let pricing = price_cart(&items, Some(&policy), &Default::default(), ctx()).unwrap();

        assert_eq!(pricing.totals.discount_cents, 100);
        assert_eq!(pricing.totals.total_cents, pricing.totals.tax_cents);
    }

    #[test]
    fn test_empty_cart_with_discount() {
        let policy = discount(DiscountRule::Percentage { rate_bps: 1000 }, None);
        let pricing = price_cart(&[], Some(&policy), &Default::default(), ctx()).unwrap();
        assert_eq!(pricing.outcome, DiscountOutcome::Applied);
        assert_eq!(pricing.totals, CartTotals::default());
    }
}
