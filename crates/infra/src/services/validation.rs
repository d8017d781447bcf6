//! FieldValidationProtocol: "may this rider travel now?" at point of scan.

use std::sync::Arc;

use serde::Serialize;

use transitgate_core::{ActorId, Clock, DomainError, DomainResult, RouteId, TicketId};
use transitgate_events::EventBus;
use transitgate_fares::{CredentialRef, PaymentState, Ticket, TravelHistoryEntry, TravelRecorded};

use crate::notices::{FareNotice, publish_all};
use crate::store::Store;

pub const NO_VALID_CREDENTIAL: &str = "no valid ticket or pass found";

/// Answer to a rider scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub valid: bool,
    pub reason: Option<String>,
    pub rider_id: ActorId,
    pub matched: Option<CredentialRef>,
    /// The history entry written for this scan, if any.
    pub travel: Option<TravelHistoryEntry>,
}

/// Answer to an ad-hoc ticket lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketCheck {
    pub valid: bool,
    pub reason: Option<String>,
    pub ticket: Ticket,
}

#[derive(Clone)]
pub struct FieldValidation<S, B> {
    store: S,
    bus: B,
    clock: Arc<dyn Clock>,
}

impl<S, B> FieldValidation<S, B>
where
    S: Store,
    B: EventBus<FareNotice>,
{
    pub fn new(store: S, bus: B, clock: Arc<dyn Clock>) -> Self {
        Self { store, bus, clock }
    }

    /// Validate a rider by scan identifier.
    ///
    /// An ACTIVE pass in its window wins; otherwise, when a route is given,
    /// a paid ticket usable on that route. A valid scan with a route appends
    /// one travel history entry; an invalid scan writes nothing.
    pub fn verify(
        &self,
        scanner_id: ActorId,
        rider_scan_id: &str,
        route_id: Option<RouteId>,
    ) -> DomainResult<ScanOutcome> {
        let now = self.clock.now();

        let (outcome, expired) = self.store.transact(|state| {
            let scanner = state.actor(scanner_id)?;
            state.capabilities(scanner).require_conductor()?;

            let rider_id = state
                .actor_by_scan_id(rider_scan_id.trim())
                .map(|a| a.id)
                .ok_or_else(|| DomainError::not_found("no rider with that scan identifier"))?;
            if let Some(route_id) = route_id {
                state.route(route_id)?;
            }

            let expired = state.expire_due_passes(now, |p| p.actor_id() == Some(rider_id))?;

            let pass_match = state
                .passes_of(rider_id)
                .find(|p| p.is_valid_at(now))
                .map(|p| CredentialRef::Pass {
                    pass_id: p.id_typed(),
                    code: p.code().to_string(),
                });
            let matched = pass_match.or_else(|| {
                let route_id = route_id?;
                state
                    .tickets_of(rider_id)
                    .find(|t| t.usable_for_travel(route_id, now))
                    .map(|t| CredentialRef::Ticket {
                        ticket_id: t.id_typed(),
                    })
            });

            let travel = match (&matched, route_id) {
                (Some(credential), Some(route_id)) => {
                    let entry = TravelHistoryEntry::record(
                        rider_id,
                        route_id,
                        now,
                        credential.clone(),
                        scanner_id,
                    );
                    state.travel_history.push(entry.clone());
                    Some(entry)
                }
                _ => None,
            };

            let outcome = ScanOutcome {
                valid: matched.is_some(),
                reason: matched.is_none().then(|| NO_VALID_CREDENTIAL.to_string()),
                rider_id,
                matched,
                travel,
            };
            Ok((outcome, expired))
        })?;

        tracing::info!(
            %scanner_id,
            rider_id = %outcome.rider_id,
            route_id = ?route_id,
            valid = outcome.valid,
            "rider scanned"
        );
        publish_all(&self.bus, outcome.rider_id, &expired);
        if let Some(entry) = &outcome.travel {
            publish_all(
                &self.bus,
                outcome.rider_id,
                &[TravelRecorded {
                    entry: entry.clone(),
                }],
            );
        }
        Ok(outcome)
    }

    /// Ad-hoc ticket lookup for any authenticated actor.
    pub fn verify_ticket_by_id(&self, caller_id: ActorId, ticket_id: TicketId) -> DomainResult<TicketCheck> {
        let now = self.clock.now();
        let ticket = self.store.read(|state| {
            if !state.actors.contains_key(&caller_id) {
                return Err(DomainError::unauthorized("unknown caller"));
            }
            state.ticket(ticket_id).cloned()
        })?;

        let reason = if ticket.is_valid_at(now) {
            None
        } else if ticket.payment_state() != PaymentState::Paid {
            Some(format!("ticket payment is {:?}", ticket.payment_state()))
        } else {
            Some("ticket has expired".to_string())
        };

        Ok(TicketCheck {
            valid: reason.is_none(),
            reason,
            ticket,
        })
    }

    /// An actor's trips, newest first.
    pub fn history_for(&self, actor_id: ActorId) -> DomainResult<Vec<TravelHistoryEntry>> {
        self.store.read(|state| {
            state.actor(actor_id)?;
            Ok(state
                .travel_history
                .iter()
                .rev()
                .filter(|e| e.actor_id() == actor_id)
                .cloned()
                .collect())
        })
    }
}
