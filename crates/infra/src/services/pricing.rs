//! PricingEngine: lazily created per-kind rules and rider-class quotes.

use transitgate_auth::RiderClass;
use transitgate_core::{ActorId, DomainResult, Money};
use transitgate_fares::{PricingRule, TicketKind, TierPrices};

use crate::store::{Store, StoreState};

#[derive(Clone)]
pub struct PricingEngine<S> {
    store: S,
    default_base: Money,
}

impl<S: Store> PricingEngine<S> {
    pub fn new(store: S, default_base: Money) -> Self {
        Self {
            store,
            default_base,
        }
    }

    /// The rule for `kind`, created with the default schedule on first use.
    /// An existing rule is never overwritten.
    pub fn get_or_create_rule(&self, kind: TicketKind) -> DomainResult<PricingRule> {
        self.store
            .transact(|state| Ok(rule_in(state, kind, self.default_base)))
    }

    pub fn quote(&self, kind: TicketKind, rider_class: &RiderClass) -> DomainResult<Money> {
        Ok(self.get_or_create_rule(kind)?.quote(rider_class))
    }

    /// Quote for a specific actor's rider class.
    pub fn quote_for(&self, actor_id: ActorId, kind: TicketKind) -> DomainResult<Money> {
        let rider_class = self
            .store
            .read(|state| Ok(state.actor(actor_id)?.rider_class.clone()))?;
        self.quote(kind, &rider_class)
    }

    /// Preview the tiers `kind`'s rule would have at `new_base`.
    pub fn rescale(&self, kind: TicketKind, new_base: Money) -> DomainResult<TierPrices> {
        Ok(self.get_or_create_rule(kind)?.rescale(new_base))
    }

    /// Every kind's rule, creating missing ones.
    pub fn list_rules(&self) -> DomainResult<Vec<PricingRule>> {
        self.store.transact(|state| {
            Ok(TicketKind::ALL
                .iter()
                .map(|kind| rule_in(state, *kind, self.default_base))
                .collect())
        })
    }

    /// Administrative update; tiers left out are rescaled from the new base.
    pub fn update_rule(
        &self,
        kind: TicketKind,
        base_price: Money,
        student_price: Option<Money>,
        staff_price: Option<Money>,
        regular_price: Option<Money>,
    ) -> DomainResult<PricingRule> {
        let rule = self.store.transact(|state| {
            let current = rule_in(state, kind, self.default_base);
            let revised = current.revise(base_price, student_price, staff_price, regular_price)?;
            state.pricing_rules.insert(kind, revised.clone());
            Ok(revised)
        })?;

        tracing::info!(
            kind = %kind,
            base = %rule.base_price,
            student = %rule.student_price,
            staff = %rule.staff_price,
            regular = %rule.regular_price,
            "pricing rule updated"
        );
        Ok(rule)
    }
}

/// Rule for `kind` inside a transaction, inserting the default if absent.
pub(crate) fn rule_in(state: &mut StoreState, kind: TicketKind, default_base: Money) -> PricingRule {
    state
        .pricing_rules
        .entry(kind)
        .or_insert_with(|| PricingRule::with_default_schedule(kind, default_base))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn engine() -> PricingEngine<InMemoryStore> {
        PricingEngine::new(InMemoryStore::new(), Money::from_units(50))
    }

    #[test]
    fn rules_are_created_lazily_with_discounts() {
        let engine = engine();
        let rule = engine.get_or_create_rule(TicketKind::Daily).unwrap();
        assert_eq!(rule.base_price, Money::from_units(50));
        assert_eq!(rule.student_price, Money::from_units(35));
        assert_eq!(rule.staff_price, Money::from_units(43));
        assert_eq!(rule.regular_price, Money::from_units(50));

        assert_eq!(engine.quote(TicketKind::Daily, &RiderClass::Student).unwrap(), Money::from_units(35));
        assert_eq!(
            engine.quote(TicketKind::Daily, &RiderClass::Other("CONDUCTOR".into())).unwrap(),
            Money::from_units(50)
        );
    }

    #[test]
    fn existing_rules_are_not_overwritten() {
        let engine = engine();
        engine
            .update_rule(TicketKind::Monthly, Money::from_units(800), None, None, Some(Money::from_units(790)))
            .unwrap();
        let rule = engine.get_or_create_rule(TicketKind::Monthly).unwrap();
        assert_eq!(rule.base_price, Money::from_units(800));
        assert_eq!(rule.regular_price, Money::from_units(790));
        assert_eq!(rule.student_price, Money::from_units(560));
    }

    #[test]
    fn rescale_preview_matches_documented_example() {
        let engine = engine();
        engine
            .update_rule(
                TicketKind::Daily,
                Money::from_units(50),
                Some(Money::from_units(35)),
                Some(Money::from_minor(4250)),
                Some(Money::from_units(50)),
            )
            .unwrap();
        let tiers = engine.rescale(TicketKind::Daily, Money::from_units(100)).unwrap();
        assert_eq!(tiers.student_price, Money::from_units(70));
        assert_eq!(tiers.staff_price, Money::from_units(85));
        assert_eq!(tiers.regular_price, Money::from_units(100));
    }

    #[test]
    fn list_rules_covers_every_kind() {
        let rules = engine().list_rules().unwrap();
        let kinds: Vec<_> = rules.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, TicketKind::ALL.to_vec());
    }
}
