//! Ticket aggregate.
//!
//! Payment state moves `PENDING -> PAID | FAILED` exactly once. Temporal
//! validity is fixed at purchase from the ticket kind and never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use transitgate_core::{
    ActorId, Aggregate, AggregateRoot, DomainError, Entity, Money, Owned, RouteId, TicketId,
};
use transitgate_events::Event;

use crate::calendar;
use crate::payment::PaymentState;
use crate::pricing::TicketKind;

/// Aggregate root: Ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    actor_id: Option<ActorId>,
    route_id: Option<RouteId>,
    kind: TicketKind,
    price: Money,
    purchase_time: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    payment_state: PaymentState,
    version: u64,
    created: bool,
}

impl Ticket {
    pub fn empty(id: TicketId) -> Self {
        Self {
            id,
            actor_id: None,
            route_id: None,
            kind: TicketKind::Daily,
            price: Money::ZERO,
            purchase_time: DateTime::<Utc>::MIN_UTC,
            valid_until: None,
            payment_state: PaymentState::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> TicketId {
        self.id
    }

    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    pub fn route_id(&self) -> Option<RouteId> {
        self.route_id
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn purchase_time(&self) -> DateTime<Utc> {
        self.purchase_time
    }

    pub fn valid_until(&self) -> Option<DateTime<Utc>> {
        self.valid_until
    }

    pub fn payment_state(&self) -> PaymentState {
        self.payment_state
    }

    /// Paid and not past its validity window (an open-ended ticket never
    /// lapses).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.payment_state == PaymentState::Paid
            && self.valid_until.is_none_or(|until| now <= until)
    }

    /// Whether this ticket lets its holder ride `route_id` at `now`.
    ///
    /// DAILY tickets must additionally have been bought on the same day.
    pub fn usable_for_travel(&self, route_id: RouteId, now: DateTime<Utc>) -> bool {
        self.route_id == Some(route_id)
            && self.is_valid_at(now)
            && (self.kind != TicketKind::Daily || calendar::same_day(self.purchase_time, now))
    }

    /// Whether holding this ticket forbids buying another `kind` ticket for
    /// the same actor and route at `now`.
    ///
    /// DAILY is keyed by (actor, route, day); MONTHLY and YEARLY by
    /// (actor, route, kind).
    pub fn blocks_purchase(
        &self,
        actor_id: ActorId,
        route_id: RouteId,
        kind: TicketKind,
        now: DateTime<Utc>,
    ) -> bool {
        if self.actor_id != Some(actor_id)
            || self.route_id != Some(route_id)
            || self.kind != kind
            || !self.is_valid_at(now)
        {
            return false;
        }
        match kind {
            TicketKind::Daily => calendar::same_day(self.purchase_time, now),
            TicketKind::Monthly | TicketKind::Yearly => true,
        }
    }
}

impl AggregateRoot for Ticket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for Ticket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Ticket {
    fn owner(&self) -> ActorId {
        self.actor_id.unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands / Events
// ─────────────────────────────────────────────────────────────────────────────

/// Command: PurchaseTicket. The price is already resolved by pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTicket {
    pub ticket_id: TicketId,
    pub actor_id: ActorId,
    pub route_id: RouteId,
    pub kind: TicketKind,
    pub price: Money,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketCommand {
    Purchase(PurchaseTicket),
    Settle { approved: bool, occurred_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketEvent {
    Purchased {
        ticket_id: TicketId,
        actor_id: ActorId,
        route_id: RouteId,
        kind: TicketKind,
        price: Money,
        valid_until: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },
    Settled {
        ticket_id: TicketId,
        payment_state: PaymentState,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for TicketEvent {
    const SUBJECT: &'static str = "ticket";

    fn event_type(&self) -> &'static str {
        match self {
            TicketEvent::Purchased { .. } => "fares.ticket.purchased",
            TicketEvent::Settled { .. } => "fares.ticket.settled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TicketEvent::Purchased { occurred_at, .. }
            | TicketEvent::Settled { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for Ticket {
    type Command = TicketCommand;
    type Event = TicketEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TicketEvent::Purchased {
                ticket_id,
                actor_id,
                route_id,
                kind,
                price,
                valid_until,
                occurred_at,
            } => {
                self.id = *ticket_id;
                self.actor_id = Some(*actor_id);
                self.route_id = Some(*route_id);
                self.kind = *kind;
                self.price = *price;
                self.purchase_time = *occurred_at;
                self.valid_until = Some(*valid_until);
                self.payment_state = PaymentState::Pending;
                self.created = true;
            }
            TicketEvent::Settled { payment_state, .. } => {
                self.payment_state = *payment_state;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TicketCommand::Purchase(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("ticket already exists"));
                }
                if cmd.price.is_negative() {
                    return Err(DomainError::validation("ticket price must not be negative"));
                }
                Ok(vec![TicketEvent::Purchased {
                    ticket_id: cmd.ticket_id,
                    actor_id: cmd.actor_id,
                    route_id: cmd.route_id,
                    kind: cmd.kind,
                    price: cmd.price,
                    valid_until: cmd.kind.valid_until(cmd.occurred_at)?,
                    occurred_at: cmd.occurred_at,
                }])
            }
            TicketCommand::Settle {
                approved,
                occurred_at,
            } => {
                if !self.created {
                    return Err(DomainError::not_found(format!("ticket {}", self.id)));
                }
                if self.payment_state.is_terminal() {
                    return Err(DomainError::invalid_operation(format!(
                        "ticket {} is already settled ({:?})",
                        self.id, self.payment_state
                    )));
                }
                let payment_state = if *approved {
                    PaymentState::Paid
                } else {
                    PaymentState::Failed
                };
                Ok(vec![TicketEvent::Settled {
                    ticket_id: self.id,
                    payment_state,
                    occurred_at: *occurred_at,
                }])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn purchased(kind: TicketKind, actor_id: ActorId, route_id: RouteId) -> Ticket {
        let ticket_id = TicketId::new();
        let mut ticket = Ticket::empty(ticket_id);
        ticket
            .execute(&TicketCommand::Purchase(PurchaseTicket {
                ticket_id,
                actor_id,
                route_id,
                kind,
                price: Money::from_units(50),
                occurred_at: noon(),
            }))
            .unwrap();
        ticket
    }

    fn paid(kind: TicketKind, actor_id: ActorId, route_id: RouteId) -> Ticket {
        let mut ticket = purchased(kind, actor_id, route_id);
        ticket
            .execute(&TicketCommand::Settle {
                approved: true,
                occurred_at: noon(),
            })
            .unwrap();
        ticket
    }

    #[test]
    fn pending_ticket_is_not_valid() {
        let ticket = purchased(TicketKind::Daily, ActorId::new(), RouteId::new());
        assert_eq!(ticket.payment_state(), PaymentState::Pending);
        assert!(!ticket.is_valid_at(noon()));
    }

    #[test]
    fn daily_ticket_runs_to_end_of_day() {
        let route = RouteId::new();
        let ticket = paid(TicketKind::Daily, ActorId::new(), route);
        let end = Utc.with_ymd_and_hms(2026, 6, 2, 0, 0, 0).unwrap() - Duration::milliseconds(1);
        assert_eq!(ticket.valid_until(), Some(end));
        assert!(ticket.usable_for_travel(route, end));
        assert!(!ticket.usable_for_travel(route, end + Duration::milliseconds(1)));
        assert!(!ticket.usable_for_travel(RouteId::new(), noon()));
    }

    #[test]
    fn settlement_happens_once() {
        let mut ticket = paid(TicketKind::Monthly, ActorId::new(), RouteId::new());
        let err = ticket
            .execute(&TicketCommand::Settle {
                approved: false,
                occurred_at: noon(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));
        assert_eq!(ticket.payment_state(), PaymentState::Paid);
    }

    #[test]
    fn daily_duplicate_key_is_per_day() {
        let (actor, route) = (ActorId::new(), RouteId::new());
        let ticket = paid(TicketKind::Daily, actor, route);
        assert!(ticket.blocks_purchase(actor, route, TicketKind::Daily, noon()));
        assert!(!ticket.blocks_purchase(actor, RouteId::new(), TicketKind::Daily, noon()));
        assert!(!ticket.blocks_purchase(ActorId::new(), route, TicketKind::Daily, noon()));
        assert!(!ticket.blocks_purchase(actor, route, TicketKind::Monthly, noon()));
        assert!(!ticket.blocks_purchase(actor, route, TicketKind::Daily, noon() + Duration::days(1)));
    }

    #[test]
    fn monthly_blocks_until_it_lapses() {
        let (actor, route) = (ActorId::new(), RouteId::new());
        let ticket = paid(TicketKind::Monthly, actor, route);
        assert!(ticket.blocks_purchase(actor, route, TicketKind::Monthly, noon() + Duration::days(20)));
        assert!(!ticket.blocks_purchase(actor, route, TicketKind::Monthly, noon() + Duration::days(40)));
        assert!(!ticket.blocks_purchase(actor, route, TicketKind::Yearly, noon()));
    }

    #[test]
    fn failed_ticket_never_blocks() {
        let (actor, route) = (ActorId::new(), RouteId::new());
        let mut ticket = purchased(TicketKind::Daily, actor, route);
        ticket
            .execute(&TicketCommand::Settle {
                approved: false,
                occurred_at: noon(),
            })
            .unwrap();
        assert!(!ticket.blocks_purchase(actor, route, TicketKind::Daily, noon()));
    }
}
