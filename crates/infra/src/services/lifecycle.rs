//! FareCredentialLifecycle: pass applications, payment decisions, ticket
//! purchases and lazy expiry.
//!
//! Every credential transition goes through the `Pass`/`Ticket` aggregates'
//! `handle`/`apply`; this service only loads them inside a transaction,
//! executes commands, and publishes the resulting events once committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use transitgate_core::{
    ActorId, Aggregate, Clock, DomainError, DomainResult, Money, PassId, PaymentId, RouteId,
    TicketId,
};
use transitgate_events::EventBus;
use transitgate_fares::{
    Pass, PassCommand, PassEvent, PassKind, PassPrices, PassState, Payment, PaymentState,
    PaymentSubject, PurchaseTicket, RequestPass, Ticket, TicketCommand, TicketEvent, TicketKind,
    generate_pass_code,
};

use super::pricing::rule_in;
use crate::config::{EngineConfig, TicketSettlement};
use crate::notices::{FareNotice, publish_all};
use crate::store::{Store, StoreState};

/// Result of deciding a payment: the payment and the credential it settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDecision {
    pub payment: Payment,
    pub pass: Option<Pass>,
    pub ticket: Option<Ticket>,
}

#[derive(Clone)]
pub struct FareLifecycle<S, B> {
    store: S,
    bus: B,
    clock: Arc<dyn Clock>,
    pass_code_prefix: String,
    pass_prices: PassPrices,
    default_base_fare: Money,
    settlement: TicketSettlement,
}

impl<S, B> FareLifecycle<S, B>
where
    S: Store,
    B: EventBus<FareNotice>,
{
    pub fn new(store: S, bus: B, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            bus,
            clock,
            pass_code_prefix: config.pass_code_prefix.clone(),
            pass_prices: config.pass_prices,
            default_base_fare: config.default_base_fare,
            settlement: config.ticket_settlement,
        }
    }

    // ── passes ──────────────────────────────────────────────────────────────

    /// Apply for a pass. Creates the PENDING pass and its PENDING payment
    /// atomically.
    pub fn create_pass(&self, actor_id: ActorId, kind: PassKind) -> DomainResult<(Pass, Payment)> {
        let now = self.clock.now();

        let (pass, payment, events) = self.store.transact(|state| {
            state.actor(actor_id)?;
            let mut events = state.expire_due_passes(now, |p| p.actor_id() == Some(actor_id))?;

            if let Some(open) = state.passes_of(actor_id).find(|p| p.state().is_open()) {
                return Err(DomainError::conflict(format!(
                    "actor already holds pass {} ({:?})",
                    open.code(),
                    open.state()
                )));
            }

            let pass_id = PassId::new();
            let mut pass = Pass::empty(pass_id);
            events.extend(pass.execute(&PassCommand::Request(RequestPass {
                pass_id,
                actor_id,
                code: unique_pass_code(state, &self.pass_code_prefix, kind),
                kind,
                occurred_at: now,
            }))?);

            let payment = Payment::pending(
                actor_id,
                PaymentSubject::Pass(pass_id),
                self.pass_prices.price_for(kind),
                now,
            );
            state.passes.insert(pass_id, pass.clone());
            state.payments.insert(payment.id, payment.clone());
            Ok((pass, payment, events))
        })?;

        tracing::info!(
            %actor_id,
            pass_id = %pass.id_typed(),
            payment_id = %payment.id,
            kind = ?kind,
            "pass requested"
        );
        publish_all(&self.bus, actor_id, &events);
        Ok((pass, payment))
    }

    /// Approve or fail a pending payment and cascade to its credential.
    ///
    /// A payment that is already PAID or FAILED cannot be re-decided.
    pub fn decide_payment(&self, payment_id: PaymentId, approve: bool) -> DomainResult<PaymentDecision> {
        let now = self.clock.now();

        let (decision, pass_events, ticket_events) = self.store.transact(|state| {
            let payment = state.payment_mut(payment_id)?;
            payment.settle(approve, now)?;
            let payment = payment.clone();

            let mut decision = PaymentDecision {
                payment: payment.clone(),
                pass: None,
                ticket: None,
            };
            let mut pass_events = Vec::new();
            let mut ticket_events = Vec::new();

            match payment.subject {
                PaymentSubject::Pass(pass_id) => {
                    let pass = state.pass_mut(pass_id)?;
                    pass_events = pass.execute(&PassCommand::SettlePayment {
                        approved: approve,
                        occurred_at: now,
                    })?;
                    decision.pass = Some(pass.clone());
                }
                PaymentSubject::Ticket(ticket_id) => {
                    let ticket = ticket_mut(state, ticket_id)?;
                    ticket_events = ticket.execute(&TicketCommand::Settle {
                        approved: approve,
                        occurred_at: now,
                    })?;
                    decision.ticket = Some(ticket.clone());
                }
            }
            Ok((decision, pass_events, ticket_events))
        })?;

        let actor_id = decision.payment.actor_id;
        tracing::info!(%payment_id, %actor_id, state = ?decision.payment.state, "payment decided");
        publish_all(&self.bus, actor_id, &pass_events);
        publish_all(&self.bus, actor_id, &ticket_events);
        Ok(decision)
    }

    /// Administrative rejection of a pending pass; its payment fails with it.
    pub fn reject_pass(&self, pass_id: PassId) -> DomainResult<Pass> {
        let now = self.clock.now();

        let (pass, events) = self.store.transact(|state| {
            let pending_payment = state.pending_payment_for_pass(pass_id);
            let pass = state.pass_mut(pass_id)?;
            let events = pass.execute(&PassCommand::Reject { occurred_at: now })?;
            let pass = pass.clone();

            if let Some(payment_id) = pending_payment {
                state.payment_mut(payment_id)?.settle(false, now)?;
            }
            Ok((pass, events))
        })?;

        tracing::info!(%pass_id, "pass rejected");
        self.publish_pass_events(&pass, &events);
        Ok(pass)
    }

    /// Administrative ACTIVE <-> INACTIVE switch.
    ///
    /// Reactivation is refused while the holder has another open pass.
    pub fn toggle_pass(&self, pass_id: PassId) -> DomainResult<Pass> {
        let now = self.clock.now();

        let (pass, events) = self.store.transact(|state| {
            let pass = state.pass(pass_id)?;
            if pass.state() == PassState::Inactive {
                if let Some(open) = pass.actor_id().and_then(|actor_id| {
                    state.passes_of(actor_id).find(|p| {
                        p.id_typed() != pass_id && p.state().is_open() && !p.is_due_for_expiry(now)
                    })
                }) {
                    return Err(DomainError::conflict(format!(
                        "actor already holds pass {} ({:?})",
                        open.code(),
                        open.state()
                    )));
                }
            }

            let pass = state.pass_mut(pass_id)?;
            let mut events = pass.execute(&PassCommand::Expire { now })?;
            events.extend(pass.execute(&PassCommand::Toggle { occurred_at: now })?);
            Ok((pass.clone(), events))
        })?;

        tracing::info!(%pass_id, state = ?pass.state(), "pass toggled");
        self.publish_pass_events(&pass, &events);
        Ok(pass)
    }

    /// A pass, lazily expired first.
    pub fn pass(&self, pass_id: PassId) -> DomainResult<Pass> {
        let now = self.clock.now();
        let (pass, events) = self.store.transact(|state| {
            let events = state.expire_due_passes(now, |p| p.id_typed() == pass_id)?;
            Ok((state.pass(pass_id)?.clone(), events))
        })?;
        self.publish_pass_events(&pass, &events);
        Ok(pass)
    }

    /// An actor's passes, newest first, lazily expired first.
    pub fn passes_for(&self, actor_id: ActorId) -> DomainResult<Vec<Pass>> {
        let now = self.clock.now();
        let (mut passes, events) = self.store.transact(|state| {
            let events = state.expire_due_passes(now, |p| p.actor_id() == Some(actor_id))?;
            let passes: Vec<Pass> = state.passes_of(actor_id).cloned().collect();
            Ok((passes, events))
        })?;
        passes.sort_by_key(|p| std::cmp::Reverse(p.start_date()));
        publish_all(&self.bus, actor_id, &events);
        Ok(passes)
    }

    /// Payments awaiting a decision, oldest first.
    pub fn pending_payments(&self) -> DomainResult<Vec<Payment>> {
        let mut pending = self.store.read(|state| {
            Ok(state
                .payments
                .values()
                .filter(|p| p.state == PaymentState::Pending)
                .cloned()
                .collect::<Vec<_>>())
        })?;
        pending.sort_by_key(|p| p.created_at);
        Ok(pending)
    }

    /// Record proof of payment for manual review. Only the payer may attach.
    pub fn attach_proof(
        &self,
        payment_id: PaymentId,
        proof_ref: &str,
        actor_id: ActorId,
    ) -> DomainResult<Payment> {
        let payment = self.store.transact(|state| {
            let payment = state.payment_mut(payment_id)?;
            payment.attach_proof(actor_id, proof_ref)?;
            Ok(payment.clone())
        })?;
        tracing::info!(%payment_id, %actor_id, "payment proof attached");
        Ok(payment)
    }

    // ── tickets ─────────────────────────────────────────────────────────────

    /// Buy a ticket for an active route at the actor's rider-class price.
    pub fn purchase_ticket(
        &self,
        actor_id: ActorId,
        route_id: RouteId,
        kind: TicketKind,
    ) -> DomainResult<Ticket> {
        let now = self.clock.now();

        let (ticket, payment, events) = self.store.transact(|state| {
            let rider_class = state.actor(actor_id)?.rider_class.clone();
            let route = state.route(route_id)?;
            if !route.active {
                return Err(DomainError::invalid_operation(format!(
                    "route '{}' is not active",
                    route.name
                )));
            }
            if state
                .tickets
                .values()
                .any(|t| t.blocks_purchase(actor_id, route_id, kind, now))
            {
                return Err(DomainError::conflict(format!(
                    "a valid {kind} ticket for this route already exists"
                )));
            }

            let price = rule_in(state, kind, self.default_base_fare).quote(&rider_class);
            let ticket_id = TicketId::new();
            let mut ticket = Ticket::empty(ticket_id);
            let mut events = ticket.execute(&TicketCommand::Purchase(PurchaseTicket {
                ticket_id,
                actor_id,
                route_id,
                kind,
                price,
                occurred_at: now,
            }))?;
            let mut payment = Payment::pending(actor_id, PaymentSubject::Ticket(ticket_id), price, now);

            if self.settlement == TicketSettlement::Instant {
                events.extend(settle_instantly(&mut ticket, &mut payment, now)?);
            }

            state.tickets.insert(ticket_id, ticket.clone());
            state.payments.insert(payment.id, payment.clone());
            Ok((ticket, payment, events))
        })?;

        tracing::info!(
            %actor_id,
            %route_id,
            ticket_id = %ticket.id_typed(),
            payment_id = %payment.id,
            price = %ticket.price(),
            payment_state = ?ticket.payment_state(),
            "ticket purchased"
        );
        publish_all(&self.bus, actor_id, &events);
        Ok(ticket)
    }

    /// An actor's tickets, newest first.
    pub fn tickets_for(&self, actor_id: ActorId) -> DomainResult<Vec<Ticket>> {
        let mut tickets = self
            .store
            .read(|state| Ok(state.tickets_of(actor_id).cloned().collect::<Vec<_>>()))?;
        tickets.sort_by_key(|t| std::cmp::Reverse(t.purchase_time()));
        Ok(tickets)
    }

    fn publish_pass_events(&self, pass: &Pass, events: &[PassEvent]) {
        if let Some(actor_id) = pass.actor_id() {
            publish_all(&self.bus, actor_id, events);
        }
    }
}

/// Trusted settlement: the purchase call stands for funds already
/// authorized by the payment collaborator.
fn settle_instantly(
    ticket: &mut Ticket,
    payment: &mut Payment,
    now: DateTime<Utc>,
) -> DomainResult<Vec<TicketEvent>> {
    payment.settle(true, now)?;
    ticket.execute(&TicketCommand::Settle {
        approved: true,
        occurred_at: now,
    })
}

fn ticket_mut(state: &mut StoreState, ticket_id: TicketId) -> DomainResult<&mut Ticket> {
    state
        .tickets
        .get_mut(&ticket_id)
        .ok_or_else(|| DomainError::not_found(format!("ticket {ticket_id}")))
}

fn unique_pass_code(state: &StoreState, prefix: &str, kind: PassKind) -> String {
    loop {
        let code = generate_pass_code(prefix, kind);
        if !state.passes.values().any(|p| p.code() == code) {
            return code;
        }
    }
}
