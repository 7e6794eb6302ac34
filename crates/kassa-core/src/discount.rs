//! # Discount Policies
//!
//! The discount model and the validity rules checked whenever a cart is read
//! or a discount is attached.
//!
//! ## Two validity checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  READ PATH  (every cart view)          ATTACH PATH (explicit action)   │
//! │  is_valid_for_read()                   check_attachable()              │
//! │  ─────────────────────────             ─────────────────────────       │
//! │  is_active                              is_active                      │
//! │  start <= today <= end                  start <= today <= end          │
//! │  branch matches                         current_uses < max_uses        │
//! │  (max_uses only if configured)          branch matches                 │
//! │                                         + check_minimum_purchase()     │
//! │                                                                         │
//! │  fails closed: detach silently          fails loud: CoreError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An exhausted discount already attached to a cart keeps applying on reads
//! until it is detached, unless `ValidityRules::enforce_usage_limit_on_read`
//! is set.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Rule & Scope
// =============================================================================

/// What a discount gives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountRule {
    /// `rate_bps` off the scoped lines (0-10000).
    #[serde(rename_all = "camelCase")]
    Percentage { rate_bps: u32 },

    /// A flat amount off the order, never more than the subtotal.
    #[serde(rename_all = "camelCase")]
    Fixed { amount_cents: i64 },

    /// For every `buy_quantity + get_quantity` eligible units, the
    /// `get_quantity` cheapest are free.
    ///
    /// `reward_bps` is the advertised reward shown to the customer; the free
    /// units are always granted in full.
    #[serde(rename_all = "camelCase")]
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
        reward_bps: u32,
    },
}

impl DiscountRule {
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountRule::Percentage { .. } => DiscountKind::Percentage,
            DiscountRule::Fixed { .. } => DiscountKind::Fixed,
            DiscountRule::BuyXGetY { .. } => DiscountKind::BuyXGetY,
        }
    }

    /// The single headline number for display: bps for percentage-style
    /// rules, cents for fixed ones.
    pub fn display_value(&self) -> i64 {
        match self {
            DiscountRule::Percentage { rate_bps } => i64::from(*rate_bps),
            DiscountRule::Fixed { amount_cents } => *amount_cents,
            DiscountRule::BuyXGetY { reward_bps, .. } => i64::from(*reward_bps),
        }
    }
}

/// Discount type label (used for storage and display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    Fixed,
    BuyXGetY,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "PERCENTAGE",
            DiscountKind::Fixed => "FIXED",
            DiscountKind::BuyXGetY => "BUY_X_GET_Y",
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(DiscountKind::Percentage),
            "FIXED" => Ok(DiscountKind::Fixed),
            "BUY_X_GET_Y" => Ok(DiscountKind::BuyXGetY),
            other => Err(ValidationError::invalid(
                "type",
                format!("unknown discount type '{}'", other),
            )),
        }
    }
}

/// Which lines a discount looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppliesTo {
    #[default]
    EntireOrder,
    SpecificProducts,
    SpecificCategories,
}

impl AppliesTo {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliesTo::EntireOrder => "ENTIRE_ORDER",
            AppliesTo::SpecificProducts => "SPECIFIC_PRODUCTS",
            AppliesTo::SpecificCategories => "SPECIFIC_CATEGORIES",
        }
    }
}

impl fmt::Display for AppliesTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppliesTo {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTIRE_ORDER" => Ok(AppliesTo::EntireOrder),
            "SPECIFIC_PRODUCTS" => Ok(AppliesTo::SpecificProducts),
            "SPECIFIC_CATEGORIES" => Ok(AppliesTo::SpecificCategories),
            other => Err(ValidationError::invalid(
                "appliesTo",
                format!("unknown discount scope '{}'", other),
            )),
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// A discount as configured by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPolicy {
    pub id: String,
    pub name: String,
    /// Redeemable code, stored uppercase. Unique when present.
    pub code: Option<String>,
    pub rule: DiscountRule,
    pub applies_to: AppliesTo,
    /// SPECIFIC_PRODUCTS scope and BUY_X_GET_Y eligibility.
    pub product_ids: BTreeSet<String>,
    /// SPECIFIC_CATEGORIES scope.
    pub category_ids: BTreeSet<String>,
    pub min_purchase_cents: Option<i64>,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    /// None = never expires.
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    /// None = unlimited.
    pub max_uses: Option<u32>,
    /// Incremented by the sale-completion flow, never by the cart.
    pub current_uses: u32,
    pub is_active: bool,
    /// None = every branch.
    pub branch_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Knobs for the read-path validity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityRules {
    /// Also drop attached discounts whose usage limit is reached.
    pub enforce_usage_limit_on_read: bool,
}

impl DiscountPolicy {
    pub fn kind(&self) -> DiscountKind {
        self.rule.kind()
    }

    pub fn min_purchase(&self) -> Option<Money> {
        self.min_purchase_cents.map(Money::from_cents)
    }

    /// `start <= today <= end`, compared by calendar day (UTC).
    pub fn is_within_schedule(&self, today: NaiveDate) -> bool {
        let started = self.starts_at.date_naive() <= today;
        let not_ended = self
            .ends_at
            .map_or(true, |ends_at| today <= ends_at.date_naive());
        started && not_ended
    }

    /// `max_uses` unset, or not yet reached.
    pub fn has_remaining_uses(&self) -> bool {
        self.max_uses.map_or(true, |max| self.current_uses < max)
    }

    pub fn is_available_at(&self, branch_id: &str) -> bool {
        self.branch_id.as_deref().map_or(true, |b| b == branch_id)
    }

    /// Subtotal reaches the minimum purchase (or there is none).
    pub fn meets_minimum(&self, subtotal: Money) -> bool {
        self.min_purchase().map_or(true, |min| subtotal >= min)
    }

    /// Read-path validity. A `false` here means the discount is silently
    /// detached from the cart being read.
    pub fn is_valid_for_read(
        &self,
        now: DateTime<Utc>,
        branch_id: &str,
        rules: ValidityRules,
    ) -> bool {
        self.is_active
            && self.is_within_schedule(now.date_naive())
            && self.is_available_at(branch_id)
            && (!rules.enforce_usage_limit_on_read || self.has_remaining_uses())
    }

    /// Attach-path validity, with the specific reason on failure.
    pub fn check_attachable(&self, now: DateTime<Utc>, branch_id: &str) -> CoreResult<()> {
        let today = now.date_naive();

        if !self.is_active {
            return Err(CoreError::DiscountInactive {
                name: self.name.clone(),
            });
        }

        if self.starts_at.date_naive() > today {
            return Err(CoreError::DiscountNotStarted {
                name: self.name.clone(),
                starts_on: self.starts_at.date_naive(),
            });
        }

        if let Some(ends_at) = self.ends_at {
            if today > ends_at.date_naive() {
                return Err(CoreError::DiscountExpired {
                    name: self.name.clone(),
                    ended_on: ends_at.date_naive(),
                });
            }
        }

        if let Some(max_uses) = self.max_uses {
            if self.current_uses >= max_uses {
                return Err(CoreError::DiscountExhausted {
                    name: self.name.clone(),
                    max_uses,
                });
            }
        }

        if !self.is_available_at(branch_id) {
            return Err(CoreError::DiscountNotAvailableAtBranch {
                name: self.name.clone(),
                branch_id: branch_id.to_string(),
            });
        }

        Ok(())
    }

    /// Fails with the threshold in the message when `subtotal` is too low.
    pub fn check_minimum_purchase(&self, subtotal: Money) -> CoreResult<()> {
        match self.min_purchase() {
            Some(minimum) if subtotal < minimum => {
                Err(CoreError::MinimumPurchaseNotMet { minimum, subtotal })
            }
            _ => Ok(()),
        }
    }

    /// Display subset embedded in a cart view.
    pub fn summary(&self) -> DiscountSummary {
        DiscountSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            code: self.code.clone(),
            kind: self.kind(),
            value: self.rule.display_value(),
        }
    }

    /// Replaces every editable field from a validated update request.
    ///
    /// On error the policy is left untouched.
    pub fn apply_update(&mut self, request: UpdateDiscountRequest) -> CoreResult<()> {
        let UpdateDiscountRequest { details, is_active } = request;
        let fields = details.validate()?;

        let starts_at = fields.starts_at.unwrap_or(self.starts_at);
        validation::validate_schedule(starts_at, fields.ends_at)?;

        self.name = fields.name;
        self.code = fields.code;
        self.rule = fields.rule;
        self.applies_to = fields.applies_to;
        self.product_ids = fields.product_ids;
        self.category_ids = fields.category_ids;
        self.min_purchase_cents = fields.min_purchase_cents;
        self.starts_at = starts_at;
        self.ends_at = fields.ends_at;
        self.max_uses = fields.max_uses;
        self.branch_id = fields.branch_id;
        self.is_active = is_active;
        self.updated_at = Utc::now();

        Ok(())
    }
}

/// What a cart view shows about its discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSummary {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub kind: DiscountKind,
    pub value: i64,
}

// =============================================================================
// Admin request DTOs
// =============================================================================

/// Typed payload for creating a discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscountRequest {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub rule: DiscountRule,
    #[serde(default)]
    pub applies_to: AppliesTo,
    #[serde(default)]
    pub product_ids: BTreeSet<String>,
    #[serde(default)]
    pub category_ids: BTreeSet<String>,
    #[serde(default)]
    pub min_purchase_cents: Option<i64>,
    /// Defaults to now on create; left unchanged on update when absent.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// Typed payload for updating a discount.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiscountRequest {
    #[serde(flatten)]
    pub details: CreateDiscountRequest,
    pub is_active: bool,
}

impl CreateDiscountRequest {
    /// Boundary validation; returns the normalized request.
    pub fn validate(self) -> CoreResult<CreateDiscountRequest> {
        let name = validation::validate_discount_name(&self.name)?;
        let code = self
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(validation::normalize_discount_code)
            .transpose()?;
        validation::validate_discount_rule(&self.rule)?;
        validation::validate_discount_scope(
            &self.rule,
            self.applies_to,
            &self.product_ids,
            &self.category_ids,
        )?;
        if let Some(min) = self.min_purchase_cents {
            validation::validate_price_cents(min)?;
        }
        if let Some(starts_at) = self.starts_at {
            validation::validate_schedule(starts_at, self.ends_at)?;
        }
        if self.max_uses == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "maxUses".to_string(),
            }
            .into());
        }

        Ok(CreateDiscountRequest {
            name,
            code,
            ..self
        })
    }

    /// Validates and builds a new, active policy with zero uses.
    pub fn into_policy(self, now: DateTime<Utc>) -> CoreResult<DiscountPolicy> {
        let fields = self.validate()?;
        let starts_at = fields.starts_at.unwrap_or(now);
        validation::validate_schedule(starts_at, fields.ends_at)?;

        Ok(DiscountPolicy {
            id: Uuid::new_v4().to_string(),
            name: fields.name,
            code: fields.code,
            rule: fields.rule,
            applies_to: fields.applies_to,
            product_ids: fields.product_ids,
            category_ids: fields.category_ids,
            min_purchase_cents: fields.min_purchase_cents,
            starts_at,
            ends_at: fields.ends_at,
            max_uses: fields.max_uses,
            current_uses: 0,
            is_active: true,
            branch_id: fields.branch_id,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(rule: DiscountRule) -> DiscountPolicy {
        CreateDiscountRequest {
            name: "Test".to_string(),
            code: Some("test10".to_string()),
            rule,
            applies_to: AppliesTo::EntireOrder,
            product_ids: BTreeSet::new(),
            category_ids: BTreeSet::new(),
            min_purchase_cents: None,
            starts_at: Some(Utc::now() - Duration::days(7)),
            ends_at: None,
            max_uses: None,
            branch_id: None,
        }
        .into_policy(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_into_policy_normalizes() {
        let p = policy(DiscountRule::Percentage { rate_bps: 1000 });
        assert_eq!(p.code.as_deref(), Some("TEST10"));
        assert!(p.is_active);
        assert_eq!(p.current_uses, 0);
        assert_eq!(p.kind(), DiscountKind::Percentage);
    }

    #[test]
    fn test_expired_yesterday_is_invalid_on_read() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let now = Utc::now();
        p.ends_at = Some(now - Duration::days(1));

        assert!(!p.is_valid_for_read(now, "b1", ValidityRules::default()));
        assert!(matches!(
            p.check_attachable(now, "b1"),
            Err(CoreError::DiscountExpired { .. })
        ));
    }

    #[test]
    fn test_ends_today_is_still_valid() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let now = Utc::now();
        p.ends_at = Some(now);
        assert!(p.is_valid_for_read(now, "b1", ValidityRules::default()));
        assert!(p.check_attachable(now, "b1").is_ok());
    }

    #[test]
    fn test_not_started() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let now = Utc::now();
        p.starts_at = now + Duration::days(2);
        assert!(!p.is_valid_for_read(now, "b1", ValidityRules::default()));
        assert!(matches!(
            p.check_attachable(now, "b1"),
            Err(CoreError::DiscountNotStarted { .. })
        ));
    }

    #[test]
    fn test_usage_limit_asymmetry() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        p.max_uses = Some(3);
        p.current_uses = 3;
        let now = Utc::now();

        // Read path ignores usage unless configured to enforce it.
        assert!(p.is_valid_for_read(now, "b1", ValidityRules::default()));
        assert!(!p.is_valid_for_read(
            now,
            "b1",
            ValidityRules {
                enforce_usage_limit_on_read: true
            }
        ));
        assert!(matches!(
            p.check_attachable(now, "b1"),
            Err(CoreError::DiscountExhausted { max_uses: 3, .. })
        ));
    }

    #[test]
    fn test_inactive_and_branch() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let now = Utc::now();

        p.branch_id = Some("b2".to_string());
        assert!(!p.is_valid_for_read(now, "b1", ValidityRules::default()));
        assert!(matches!(
            p.check_attachable(now, "b1"),
            Err(CoreError::DiscountNotAvailableAtBranch { .. })
        ));
        assert!(p.check_attachable(now, "b2").is_ok());

        p.is_active = false;
        assert!(matches!(
            p.check_attachable(now, "b2"),
            Err(CoreError::DiscountInactive { .. })
        ));
    }

    #[test]
    fn test_minimum_purchase() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        p.min_purchase_cents = Some(5000);

        assert!(!p.meets_minimum(Money::from_cents(3000)));
        assert!(p.meets_minimum(Money::from_cents(5000)));

        let err = p.check_minimum_purchase(Money::from_cents(3000)).unwrap_err();
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_rule_serialization_is_tagged() {
        let rule = DiscountRule::BuyXGetY {
            buy_quantity: 2,
            get_quantity: 1,
            reward_bps: 10000,
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["type"], "BUY_X_GET_Y");
        assert_eq!(json["buyQuantity"], 2);

        let back: DiscountRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_kind_and_scope_parse() {
        assert_eq!("BUY_X_GET_Y".parse::<DiscountKind>().unwrap(), DiscountKind::BuyXGetY);
        assert!("BOGO".parse::<DiscountKind>().is_err());
        assert_eq!(
            "SPECIFIC_CATEGORIES".parse::<AppliesTo>().unwrap(),
            AppliesTo::SpecificCategories
        );
    }

    #[test]
    fn test_apply_update() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let id = p.id.clone();
        let update = UpdateDiscountRequest {
            details: CreateDiscountRequest {
                name: "  Renamed ".to_string(),
                code: None,
                rule: DiscountRule::Percentage { rate_bps: 2000 },
                applies_to: AppliesTo::EntireOrder,
                product_ids: BTreeSet::new(),
                category_ids: BTreeSet::new(),
                min_purchase_cents: Some(1000),
                starts_at: None,
                ends_at: None,
                max_uses: Some(10),
                branch_id: None,
            },
            is_active: false,
        };

        p.apply_update(update).unwrap();

        assert_eq!(p.id, id);
        assert_eq!(p.name, "Renamed");
        assert!(p.code.is_none());
        assert_eq!(p.kind(), DiscountKind::Percentage);
        assert!(!p.is_active);
        assert_eq!(p.max_uses, Some(10));
    }

    #[test]
    fn test_failed_update_leaves_policy_untouched() {
        let mut p = policy(DiscountRule::Fixed { amount_cents: 500 });
        let before = p.clone();

        // ends before the stored start date
        let update = UpdateDiscountRequest {
            details: CreateDiscountRequest {
                name: "Renamed".to_string(),
                code: None,
                rule: DiscountRule::Percentage { rate_bps: 2000 },
                applies_to: AppliesTo::EntireOrder,
                product_ids: BTreeSet::new(),
                category_ids: BTreeSet::new(),
                min_purchase_cents: None,
                starts_at: None,
                ends_at: Some(Utc::now() - Duration::days(30)),
                max_uses: Some(1),
                branch_id: None,
            },
            is_active: false,
        };

        let err = p.apply_update(update).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(p, before);
    }

    #[test]
    fn test_summary() {
        let p = policy(DiscountRule::Percentage { rate_bps: 1500 });
        let summary = p.summary();
        assert_eq!(summary.kind, DiscountKind::Percentage);
        assert_eq!(summary.value, 1500);
        assert_eq!(summary.code.as_deref(), Some("TEST10"));
    }
}
