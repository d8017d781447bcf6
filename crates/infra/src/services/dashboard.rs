//! Administrative dashboard counters.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use transitgate_core::{Clock, DomainResult};
use transitgate_fares::{PassState, PaymentState, calendar};

use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    /// Actors holding a live session.
    pub active_actors: usize,
    pub valid_passes: usize,
    pub expired_passes: usize,
    pub pending_payments: usize,
    pub scans_today: usize,
    pub active_routes: usize,
}

#[derive(Clone)]
pub struct Dashboard<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: Store> Dashboard<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Counts as of now. ACTIVE passes past their end count as expired even
    /// before a read path has persisted the transition.
    pub fn counts(&self) -> DomainResult<DashboardCounts> {
        let now = self.clock.now();
        self.store.read(|state| {
            let live: BTreeSet<_> = state.sessions.values().map(|s| s.actor_id).collect();
            Ok(DashboardCounts {
                active_actors: live.len(),
                valid_passes: state.passes.values().filter(|p| p.is_valid_at(now)).count(),
                expired_passes: state
                    .passes
                    .values()
                    .filter(|p| p.state() == PassState::Expired || p.is_due_for_expiry(now))
                    .count(),
                pending_payments: state
                    .payments
                    .values()
                    .filter(|p| p.state == PaymentState::Pending)
                    .count(),
                scans_today: state
                    .travel_history
                    .iter()
                    .filter(|e| calendar::same_day(e.travel_time(), now))
                    .count(),
                active_routes: state.routes.values().filter(|r| r.active).count(),
            })
        })
    }
}
