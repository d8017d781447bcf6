//! The engine's tables and the lookups shared by services.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use transitgate_auth::{Actor, Capabilities, Permission, Role, Session, TokenHash};
use transitgate_core::{
    ActorId, Aggregate, DomainError, DomainResult, PassId, PaymentId, RoleId, RouteId, TicketId,
};
use transitgate_fares::{
    Pass, PassCommand, PassEvent, Payment, PricingRule, Route, Ticket, TicketKind,
    TravelHistoryEntry,
};

/// All tables, keyed by id. Relations are explicit join sets.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub actors: BTreeMap<ActorId, Actor>,
    pub sessions: HashMap<TokenHash, Session>,
    pub roles: BTreeMap<RoleId, Role>,
    /// Permission catalog keyed by unique code.
    pub permissions: BTreeMap<String, Permission>,
    pub role_permissions: BTreeSet<(RoleId, String)>,
    pub custom_permissions: BTreeSet<(ActorId, String)>,
    pub routes: BTreeMap<RouteId, Route>,
    pub passes: BTreeMap<PassId, Pass>,
    pub tickets: BTreeMap<TicketId, Ticket>,
    pub payments: BTreeMap<PaymentId, Payment>,
    pub pricing_rules: BTreeMap<TicketKind, PricingRule>,
    /// Append-only.
    pub travel_history: Vec<TravelHistoryEntry>,
}

impl StoreState {
    // ── actors ──────────────────────────────────────────────────────────────

    pub fn actor(&self, actor_id: ActorId) -> DomainResult<&Actor> {
        self.actors
            .get(&actor_id)
            .ok_or_else(|| DomainError::not_found(format!("actor {actor_id}")))
    }

    pub fn actor_mut(&mut self, actor_id: ActorId) -> DomainResult<&mut Actor> {
        self.actors
            .get_mut(&actor_id)
            .ok_or_else(|| DomainError::not_found(format!("actor {actor_id}")))
    }

    pub fn actor_by_username(&self, username: &str) -> Option<&Actor> {
        self.actors.values().find(|a| a.username == username)
    }

    pub fn actor_by_scan_id(&self, scan_id: &str) -> Option<&Actor> {
        self.actors.values().find(|a| a.scan_id() == Some(scan_id))
    }

    pub fn scan_id_taken(&self, scan_id: &str) -> bool {
        self.actor_by_scan_id(scan_id).is_some()
    }

    /// Capabilities resolved from the actor's current role and custom grants.
    pub fn capabilities(&self, actor: &Actor) -> Capabilities {
        let role = actor.role_id.and_then(|id| self.roles.get(&id));
        Capabilities::resolve(actor, role).with_custom_grants(&self.custom_grants(actor.id))
    }

    // ── sessions ────────────────────────────────────────────────────────────

    /// Delete every session of `actor_id`; returns how many were removed.
    pub fn revoke_sessions(&mut self, actor_id: ActorId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.actor_id != actor_id);
        before - self.sessions.len()
    }

    pub fn session_count(&self, actor_id: ActorId) -> usize {
        self.sessions
            .values()
            .filter(|s| s.actor_id == actor_id)
            .count()
    }

    // ── roles & permissions ─────────────────────────────────────────────────

    pub fn role(&self, role_id: RoleId) -> DomainResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| DomainError::not_found(format!("role {role_id}")))
    }

    /// Case-insensitive lookup by name.
    pub fn role_by_name(&self, name: &str) -> Option<&Role> {
        let name = transitgate_auth::roles::normalize_role_name(name);
        self.roles.values().find(|r| r.name == name)
    }

    pub fn default_role(&self) -> Option<&Role> {
        self.roles.values().find(|r| r.is_default)
    }

    pub fn role_codes(&self, role_id: RoleId) -> BTreeSet<String> {
        self.role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .map(|(_, code)| code.clone())
            .collect()
    }

    pub fn custom_codes(&self, actor_id: ActorId) -> BTreeSet<String> {
        self.custom_permissions
            .iter()
            .filter(|(a, _)| *a == actor_id)
            .map(|(_, code)| code.clone())
            .collect()
    }

    fn permissions_for(&self, codes: BTreeSet<String>) -> Vec<Permission> {
        codes
            .iter()
            .filter_map(|code| self.permissions.get(code).cloned())
            .collect()
    }

    pub fn role_grants(&self, role_id: Option<RoleId>) -> Vec<Permission> {
        role_id
            .map(|id| self.permissions_for(self.role_codes(id)))
            .unwrap_or_default()
    }

    pub fn custom_grants(&self, actor_id: ActorId) -> Vec<Permission> {
        self.permissions_for(self.custom_codes(actor_id))
    }

    // ── credentials ─────────────────────────────────────────────────────────

    pub fn route(&self, route_id: RouteId) -> DomainResult<&Route> {
        self.routes
            .get(&route_id)
            .ok_or_else(|| DomainError::not_found(format!("route {route_id}")))
    }

    pub fn pass(&self, pass_id: PassId) -> DomainResult<&Pass> {
        self.passes
            .get(&pass_id)
            .ok_or_else(|| DomainError::not_found(format!("pass {pass_id}")))
    }

    pub fn pass_mut(&mut self, pass_id: PassId) -> DomainResult<&mut Pass> {
        self.passes
            .get_mut(&pass_id)
            .ok_or_else(|| DomainError::not_found(format!("pass {pass_id}")))
    }

    pub fn payment_mut(&mut self, payment_id: PaymentId) -> DomainResult<&mut Payment> {
        self.payments
            .get_mut(&payment_id)
            .ok_or_else(|| DomainError::not_found(format!("payment {payment_id}")))
    }

    pub fn ticket(&self, ticket_id: TicketId) -> DomainResult<&Ticket> {
        self.tickets
            .get(&ticket_id)
            .ok_or_else(|| DomainError::not_found(format!("ticket {ticket_id}")))
    }

    pub fn passes_of(&self, actor_id: ActorId) -> impl Iterator<Item = &Pass> {
        self.passes
            .values()
            .filter(move |p| p.actor_id() == Some(actor_id))
    }

    pub fn tickets_of(&self, actor_id: ActorId) -> impl Iterator<Item = &Ticket> {
        self.tickets
            .values()
            .filter(move |t| t.actor_id() == Some(actor_id))
    }

    /// Pending payment attached to a pass, if any.
    pub fn pending_payment_for_pass(&self, pass_id: PassId) -> Option<PaymentId> {
        self.payments
            .values()
            .find(|p| p.pass_id() == Some(pass_id) && !p.state.is_terminal())
            .map(|p| p.id)
    }

    /// Lazily move ACTIVE passes past their end date to EXPIRED.
    ///
    /// Only passes selected by `filter` are examined. Returns the emitted
    /// events; already-expired passes produce none.
    pub fn expire_due_passes(
        &mut self,
        now: DateTime<Utc>,
        filter: impl Fn(&Pass) -> bool,
    ) -> DomainResult<Vec<PassEvent>> {
        let mut events = Vec::new();
        for pass in self.passes.values_mut().filter(|p| filter(p)) {
            if pass.is_due_for_expiry(now) {
                events.extend(pass.execute(&PassCommand::Expire { now })?);
            }
        }
        Ok(events)
    }
}
