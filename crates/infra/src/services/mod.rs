//! Engine services and their wiring.
//!
//! Each service owns a handle to the shared [`Store`]; operations that must
//! be atomic run inside a single `transact` call. Services that emit
//! lifecycle notices also hold the event bus.

pub mod access;
pub mod bootstrap;
pub mod dashboard;
pub mod identity;
pub mod lifecycle;
pub mod pricing;
pub mod routes;
pub mod validation;
pub mod vault;

use std::sync::Arc;

use transitgate_auth::{Actor, Capabilities, SessionToken};
use transitgate_core::{Clock, DomainResult};
use transitgate_events::{EventBus, InMemoryEventBus};

pub use access::{PermissionResolver, RoleDeletion};
pub use bootstrap::{BootstrapReport, bootstrap, ensure_admin_account};
pub use dashboard::{Dashboard, DashboardCounts};
pub use identity::Identity;
pub use lifecycle::{FareLifecycle, PaymentDecision};
pub use pricing::PricingEngine;
pub use routes::RouteRegistry;
pub use validation::{FieldValidation, NO_VALID_CREDENTIAL, ScanOutcome, TicketCheck};
pub use vault::TokenVault;

use crate::config::EngineConfig;
use crate::notices::FareNotice;
use crate::store::{InMemoryStore, Store};

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub actor: Actor,
    pub capabilities: Capabilities,
}

/// All services over one store, bus and clock.
#[derive(Clone)]
pub struct Engine<S, B> {
    pub config: EngineConfig,
    pub clock: Arc<dyn Clock>,
    pub store: S,
    pub bus: B,
    pub vault: TokenVault<S>,
    pub identity: Identity<S>,
    pub access: PermissionResolver<S>,
    pub pricing: PricingEngine<S>,
    pub lifecycle: FareLifecycle<S, B>,
    pub validation: FieldValidation<S, B>,
    pub routes: RouteRegistry<S>,
    pub dashboard: Dashboard<S>,
}

/// Engine over the in-memory store and bus.
pub type InMemoryEngine = Engine<Arc<InMemoryStore>, Arc<InMemoryEventBus<FareNotice>>>;

impl<S, B> Engine<S, B>
where
    S: Store + Clone,
    B: EventBus<FareNotice> + Clone,
{
    pub fn new(store: S, bus: B, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let vault = TokenVault::new(store.clone(), clock.clone(), config.session_cookie.clone());
        Self {
            identity: Identity::new(store.clone(), clock.clone(), vault.clone()),
            vault,
            access: PermissionResolver::new(store.clone(), config.fallback_role.clone()),
            pricing: PricingEngine::new(store.clone(), config.default_base_fare),
            lifecycle: FareLifecycle::new(store.clone(), bus.clone(), clock.clone(), &config),
            validation: FieldValidation::new(store.clone(), bus.clone(), clock.clone()),
            routes: RouteRegistry::new(store.clone()),
            dashboard: Dashboard::new(store.clone(), clock.clone()),
            config,
            clock,
            store,
            bus,
        }
    }

    /// Seed built-in roles and permissions (idempotent).
    pub fn bootstrap(&self) -> DomainResult<BootstrapReport> {
        bootstrap(&self.store)
    }

    /// Resolve a session token to the caller and its capabilities.
    pub fn authenticate(&self, token: &SessionToken) -> DomainResult<Caller> {
        let (actor, _session) = self.vault.resolve(token)?;
        let capabilities = self.access.capabilities(actor.id)?;
        Ok(Caller {
            actor,
            capabilities,
        })
    }
}

impl InMemoryEngine {
    pub fn in_memory(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryEventBus::new()),
            clock,
            config,
        )
    }
}
