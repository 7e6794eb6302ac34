//! # Discount Allocation
//!
//! Turns a discount rule plus the cart's lines into a single discount amount.
//!
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────────────────────────┐
//! │ rule         │ scope                │ amount                           │
//! ├──────────────┼──────────────────────┼──────────────────────────────────┤
//! │ PERCENTAGE   │ ENTIRE_ORDER         │ subtotal × rate                  │
//! │ PERCENTAGE   │ SPECIFIC_PRODUCTS    │ Σ line × rate (matching product) │
//! │ PERCENTAGE   │ SPECIFIC_CATEGORIES  │ Σ line × rate (matching category)│
//! │              │                      │ rounded once, after the sum      │
//! │ FIXED        │ (ignored)            │ min(subtotal, amount)            │
//! │ BUY_X_GET_Y  │ product_ids          │ cheapest free units              │
//! └──────────────┴──────────────────────┴──────────────────────────────────┘
//! ```
//!
//! The amount returned here may exceed the subtotal for percentage and
//! buy-x-get-y rules; `totals::price_cart` clamps it. Line totals are
//! assumed to fit in i64 cents, which `totals::subtotal` checks first.

use std::collections::HashMap;

use crate::discount::{AppliesTo, DiscountPolicy, DiscountRule};
use crate::money::{Money, Rate};
use crate::types::LineItem;

/// product id → category id, for the products in a cart that have one.
pub type ProductCategories = HashMap<String, String>;

/// Computes the (unclamped) discount amount for `policy` over `items`.
pub fn compute_discount_amount(
    items: &[LineItem],
    policy: &DiscountPolicy,
    subtotal: Money,
    categories: &ProductCategories,
) -> Money {
    match &policy.rule {
        DiscountRule::Percentage { rate_bps } => {
            percentage_amount(items, policy, Rate::from_bps(*rate_bps), subtotal, categories)
        }
        DiscountRule::Fixed { amount_cents } => subtotal.min(Money::from_cents(*amount_cents)),
        DiscountRule::BuyXGetY {
            buy_quantity,
            get_quantity,
            ..
        } => buy_x_get_y_amount(items, policy, *buy_quantity, *get_quantity),
    }
}

fn percentage_amount(
    items: &[LineItem],
    policy: &DiscountPolicy,
    rate: Rate,
    subtotal: Money,
    categories: &ProductCategories,
) -> Money {
    match policy.applies_to {
        AppliesTo::EntireOrder => subtotal.apply_rate(rate),
        AppliesTo::SpecificProducts => Money::sum_at_rates(
            items
                .iter()
                .filter(|item| policy.product_ids.contains(&item.product_id))
                .map(|item| (item.line_total(), rate)),
        ),
        AppliesTo::SpecificCategories => Money::sum_at_rates(
            items
                .iter()
                .filter(|item| {
                    categories
                        .get(&item.product_id)
                        .is_some_and(|category| policy.category_ids.contains(category))
                })
                .map(|item| (item.line_total(), rate)),
        ),
    }
}

/// For every complete group of `buy + get` eligible units, the `get`
/// cheapest units are free.
///
/// ```text
/// buy 2 get 1 on {A, B}
/// A $10.00 × 3, B $5.00 × 3   → 6 eligible units, 2 groups, 2 free
/// cheapest first: B, B        → $10.00
/// ```
fn buy_x_get_y_amount(
    items: &[LineItem],
    policy: &DiscountPolicy,
    buy: u32,
    get: u32,
) -> Money {
    if buy == 0 || get == 0 {
        return Money::zero();
    }

    let mut eligible: Vec<&LineItem> = items
        .iter()
        .filter(|item| item.quantity > 0 && policy.product_ids.contains(&item.product_id))
        .collect();

    let bought: i64 = eligible.iter().map(|item| item.quantity).sum();
    let (buy, get) = (i64::from(buy), i64::from(get));
    if bought < buy {
        return Money::zero();
    }

    let mut free = (bought / (buy + get)) * get;

    // Stable: equal prices keep cart order.
    eligible.sort_by_key(|item| item.unit_price_cents);

    let mut amount = Money::zero();
    for item in eligible {
        if free == 0 {
            break;
        }
        let consumed = free.min(item.quantity);
        amount += item.unit_price().multiply_quantity(consumed);
        free -= consumed;
    }
    amount
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discount::CreateDiscountRequest;
    use chrono::Utc;

    fn item(product_id: &str, price_cents: i64, quantity: i64) -> LineItem {
        LineItem {
            id: format!("item-{}", product_id),
            product_id: product_id.to_string(),
            product_name: product_id.to_string(),
            unit_price_cents: price_cents,
            quantity,
            tax_rate_bps: 0,
            created_at: Utc::now(),
        }
    }

    fn policy(rule: DiscountRule, applies_to: AppliesTo, products: &[&str], categories: &[&str]) -> DiscountPolicy {
        CreateDiscountRequest {
            name: "Promo".to_string(),
            code: None,
            rule,
            applies_to,
            product_ids: products.iter().map(|s| s.to_string()).collect(),
            category_ids: categories.iter().map(|s| s.to_string()).collect(),
            min_purchase_cents: None,
            starts_at: None,
            ends_at: None,
            max_uses: None,
            branch_id: None,
        }
        .into_policy(Utc::now())
        .unwrap()
    }

    fn subtotal(items: &[LineItem]) -> Money {
        items.iter().map(LineItem::line_total).sum()
    }

    #[test]
    fn test_buy_two_get_one_frees_cheapest_units() {
        let items = vec![item("A", 1000, 3), item("B", 500, 3)];
        let p = policy(
            DiscountRule::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                reward_bps: 10000,
            },
            AppliesTo::EntireOrder,
            &["A", "B"],
            &[],
        );

        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert_eq!(amount.cents(), 1000);
    }

    #[test]
    fn test_buy_x_get_y_spills_into_next_cheapest() {
        let items = vec![item("A", 1000, 6), item("B", 300, 1)];
        let p = policy(
            DiscountRule::BuyXGetY {
                buy_quantity: 1,
                get_quantity: 1,
                reward_bps: 10000,
            },
            AppliesTo::EntireOrder,
            &["A", "B"],
            &[],
        );

        // 7 units, 3 groups → 3 free: B ($3) then two A ($20)
        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert_eq!(amount.cents(), 2300);
    }

    #[test]
    fn test_buy_x_get_y_not_enough_units() {
        let items = vec![item("A", 1000, 1), item("Z", 100, 10)];
        let p = policy(
            DiscountRule::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                reward_bps: 10000,
            },
            AppliesTo::EntireOrder,
            &["A"],
            &[],
        );

        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert!(amount.is_zero());
    }

    #[test]
    fn test_buy_x_get_y_zero_quantities_yield_nothing() {
        let items = vec![item("A", 1000, 10)];
        let mut p = policy(
            DiscountRule::BuyXGetY {
                buy_quantity: 1,
                get_quantity: 1,
                reward_bps: 10000,
            },
            AppliesTo::EntireOrder,
            &["A"],
            &[],
        );
        // Stored data bypassing validation.
        p.rule = DiscountRule::BuyXGetY {
            buy_quantity: 0,
            get_quantity: 1,
            reward_bps: 10000,
        };

        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert!(amount.is_zero());
    }

    #[test]
    fn test_fixed_is_clamped_to_subtotal() {
        let items = vec![item("A", 300, 1)];
        let p = policy(
            DiscountRule::Fixed { amount_cents: 500 },
            AppliesTo::EntireOrder,
            &[],
            &[],
        );
        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert_eq!(amount.cents(), 300);
    }

    #[test]
    fn test_percentage_scopes() {
        let items = vec![item("A", 1000, 1), item("B", 2000, 1), item("C", 333, 1)];
        let rule = DiscountRule::Percentage { rate_bps: 1500 };

        let whole = policy(rule.clone(), AppliesTo::EntireOrder, &[], &[]);
        assert_eq!(
            compute_discount_amount(&items, &whole, subtotal(&items), &HashMap::new()).cents(),
            500 // 3333 × 15 % = 499.95
        );

        let products = policy(rule.clone(), AppliesTo::SpecificProducts, &["B", "C"], &[]);
        assert_eq!(
            compute_discount_amount(&items, &products, subtotal(&items), &HashMap::new()).cents(),
            350 // 300 + 49.95
        );

        let categories: ProductCategories = [("A".to_string(), "drinks".to_string())]
            .into_iter()
            .collect();
        let by_category = policy(rule, AppliesTo::SpecificCategories, &[], &["drinks"]);
        assert_eq!(
            compute_discount_amount(&items, &by_category, subtotal(&items), &categories).cents(),
            150
        );
    }

    #[test]
    fn test_scoped_percentage_rounds_the_sum() {
        // 10 cents at 5 % on three products: 1.5 → 2, not 1 + 1 + 1
        let items = vec![item("A", 10, 1), item("B", 10, 1), item("C", 10, 1), item("D", 10, 1)];
        let rule = DiscountRule::Percentage { rate_bps: 500 };

        let products = policy(rule.clone(), AppliesTo::SpecificProducts, &["A", "B", "C"], &[]);
        assert_eq!(
            compute_discount_amount(&items, &products, subtotal(&items), &HashMap::new()).cents(),
            2
        );

        let categories: ProductCategories = ["A", "B", "C"]
            .into_iter()
            .map(|id| (id.to_string(), "snacks".to_string()))
            .collect();
        let by_category = policy(rule, AppliesTo::SpecificCategories, &[], &["snacks"]);
        assert_eq!(
            compute_discount_amount(&items, &by_category, subtotal(&items), &categories).cents(),
            2
        );
    }

    #[test]
    fn test_category_scope_without_categories_is_zero() {
        let items = vec![item("A", 1000, 1)];
        let p = policy(
            DiscountRule::Percentage { rate_bps: 1000 },
            AppliesTo::SpecificCategories,
            &[],
            &["drinks"],
        );
        let amount = compute_discount_amount(&items, &p, subtotal(&items), &HashMap::new());
        assert!(amount.is_zero());
    }
}
