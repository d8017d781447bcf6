//! Per-rider-class fare tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use transitgate_auth::RiderClass;
use transitgate_core::{DomainError, DomainResult, Money};

use crate::calendar;

/// Ticket validity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketKind {
    Daily,
    Monthly,
    Yearly,
}

impl TicketKind {
    pub const ALL: [TicketKind; 3] = [TicketKind::Daily, TicketKind::Monthly, TicketKind::Yearly];

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "DAILY" => Ok(TicketKind::Daily),
            "MONTHLY" => Ok(TicketKind::Monthly),
            "YEARLY" => Ok(TicketKind::Yearly),
            other => Err(DomainError::validation(format!("unknown ticket kind '{other}'"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Daily => "DAILY",
            TicketKind::Monthly => "MONTHLY",
            TicketKind::Yearly => "YEARLY",
        }
    }

    /// End of validity for a ticket bought at `purchase_time`.
    ///
    /// DAILY runs to the end of the purchase day; MONTHLY and YEARLY run one
    /// calendar month / year minus one millisecond.
    pub fn valid_until(&self, purchase_time: DateTime<Utc>) -> DomainResult<DateTime<Utc>> {
        match self {
            TicketKind::Daily => Ok(calendar::end_of_day(purchase_time)),
            TicketKind::Monthly => calendar::months_after(purchase_time, 1),
            TicketKind::Yearly => calendar::months_after(purchase_time, 12),
        }
    }
}

impl core::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discount schedule applied when a rule is created lazily.
const STUDENT_PERCENT: i64 = 70;
const STAFF_PERCENT: i64 = 85;

/// The non-base tiers of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrices {
    pub student_price: Money,
    pub staff_price: Money,
    pub regular_price: Money,
}

/// Pricing rule for one ticket kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    pub kind: TicketKind,
    pub base_price: Money,
    pub student_price: Money,
    pub staff_price: Money,
    pub regular_price: Money,
}

impl PricingRule {
    /// Rule following the default discount schedule (student 30% off, staff
    /// 15% off), each tier rounded half-up to a whole unit.
    pub fn with_default_schedule(kind: TicketKind, base_price: Money) -> Self {
        Self {
            kind,
            base_price,
            student_price: base_price.scale_to_unit(STUDENT_PERCENT, 100),
            staff_price: base_price.scale_to_unit(STAFF_PERCENT, 100),
            regular_price: base_price,
        }
    }

    /// Price for a rider class: STUDENT and STAFF get their tier, everyone
    /// else pays the regular price.
    pub fn quote(&self, rider_class: &RiderClass) -> Money {
        match rider_class {
            RiderClass::Student => self.student_price,
            RiderClass::Staff => self.staff_price,
            _ => self.regular_price,
        }
    }

    /// Scale the tiers proportionally to a new base price.
    ///
    /// `factor = new_base / base_price`, or 1 when either side is not
    /// positive. Results are rounded half-up to whole currency units.
    pub fn rescale(&self, new_base: Money) -> TierPrices {
        let (numer, denom) = if self.base_price.is_positive() && new_base.is_positive() {
            (new_base.minor(), self.base_price.minor())
        } else {
            (1, 1)
        };
        TierPrices {
            student_price: self.student_price.scale_to_unit(numer, denom),
            staff_price: self.staff_price.scale_to_unit(numer, denom),
            regular_price: self.regular_price.scale_to_unit(numer, denom),
        }
    }

    /// Administrative update. Tiers not supplied are re-derived from the new
    /// base with [`PricingRule::rescale`].
    pub fn revise(
        &self,
        base_price: Money,
        student_price: Option<Money>,
        staff_price: Option<Money>,
        regular_price: Option<Money>,
    ) -> DomainResult<PricingRule> {
        let prices = [Some(base_price), student_price, staff_price, regular_price];
        if prices.iter().flatten().any(Money::is_negative) {
            return Err(DomainError::validation("prices must not be negative"));
        }

        let scaled = self.rescale(base_price);
        Ok(PricingRule {
            kind: self.kind,
            base_price,
            student_price: student_price.unwrap_or(scaled.student_price),
            staff_price: staff_price.unwrap_or(scaled.staff_price),
            regular_price: regular_price.unwrap_or(scaled.regular_price),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(base: i64, student: i64, staff: i64, regular: i64) -> PricingRule {
        PricingRule {
            kind: TicketKind::Daily,
            base_price: Money::from_minor(base),
            student_price: Money::from_minor(student),
            staff_price: Money::from_minor(staff),
            regular_price: Money::from_minor(regular),
        }
    }

    #[test]
    fn default_schedule_discounts_students_and_staff() {
        let rule = PricingRule::with_default_schedule(TicketKind::Monthly, Money::from_units(50));
        assert_eq!(rule.student_price, Money::from_units(35));
        assert_eq!(rule.staff_price, Money::from_units(43));
        assert_eq!(rule.regular_price, Money::from_units(50));

        let odd = PricingRule::with_default_schedule(TicketKind::Daily, Money::from_minor(1_999));
        assert_eq!(odd.student_price, Money::from_units(14));
        assert_eq!(odd.staff_price, Money::from_units(17));
    }

    #[test]
    fn quote_picks_tier_by_rider_class() {
        let rule = PricingRule::with_default_schedule(TicketKind::Daily, Money::from_units(50));
        assert_eq!(rule.quote(&RiderClass::Student), rule.student_price);
        assert_eq!(rule.quote(&RiderClass::Staff), rule.staff_price);
        assert_eq!(rule.quote(&RiderClass::Regular), rule.regular_price);
        assert_eq!(
            rule.quote(&RiderClass::Other("CONDUCTOR".into())),
            rule.regular_price
        );
    }

    #[test]
    fn rescale_doubles_tiers_when_base_doubles() {
        let rule = rule(5000, 3500, 4250, 5000);
        let tiers = rule.rescale(Money::from_units(100));
        assert_eq!(tiers.student_price, Money::from_units(70));
        assert_eq!(tiers.staff_price, Money::from_units(85));
        assert_eq!(tiers.regular_price, Money::from_units(100));

        let defaults = PricingRule::with_default_schedule(TicketKind::Daily, Money::from_units(50));
        assert_eq!(defaults.rescale(Money::from_units(100)).staff_price, Money::from_units(86));
    }

    #[test]
    fn rescale_with_non_positive_side_keeps_tiers() {
        let zero_base = rule(0, 3500, 4250, 5000);
        let tiers = zero_base.rescale(Money::from_units(100));
        assert_eq!(tiers.student_price, Money::from_units(35));
        assert_eq!(tiers.staff_price, Money::from_units(43));

        let normal = rule(5000, 3500, 4200, 5000);
        assert_eq!(normal.rescale(Money::ZERO).student_price, Money::from_units(35));
    }

    #[test]
    fn revise_fills_missing_tiers_and_rejects_negatives() {
        let rule = PricingRule::with_default_schedule(TicketKind::Yearly, Money::from_units(50));
        let revised = rule
            .revise(Money::from_units(100), Some(Money::from_units(60)), None, None)
            .unwrap();
        assert_eq!(revised.student_price, Money::from_units(60));
        assert_eq!(revised.staff_price, Money::from_units(86));
        assert_eq!(revised.regular_price, Money::from_units(100));

        assert!(matches!(
            rule.revise(Money::from_units(10), Some(Money::from_minor(-1)), None, None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn ticket_kind_parsing() {
        assert_eq!(TicketKind::parse("daily").unwrap(), TicketKind::Daily);
        assert!(matches!(TicketKind::parse("weekly"), Err(DomainError::Validation(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: rescaling by an integer multiple multiplies whole-unit
        /// tiers exactly.
        #[test]
        fn integer_multiples_scale_exactly(base in 1i64..1_000, tier in 0i64..1_000, k in 1i64..20) {
            let r = rule(base * 100, tier * 100, tier * 100, base * 100);
            let tiers = r.rescale(Money::from_units(base * k));
            prop_assert_eq!(tiers.student_price, Money::from_units(tier * k));
            prop_assert_eq!(tiers.regular_price, Money::from_units(base * k));
        }
    }
}
