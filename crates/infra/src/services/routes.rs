//! Route registration seam for the route/bus administration collaborator.

use transitgate_core::{DomainError, DomainResult, RouteId};
use transitgate_fares::Route;

use crate::store::Store;

#[derive(Clone)]
pub struct RouteRegistry<S> {
    store: S,
}

impl<S: Store> RouteRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn register_route(&self, name: &str) -> DomainResult<Route> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("route name must not be empty"));
        }
        let route = Route::new(name);
        self.store.transact(|state| {
            if state.routes.values().any(|r| r.name.eq_ignore_ascii_case(name)) {
                return Err(DomainError::conflict(format!("route '{name}' already exists")));
            }
            state.routes.insert(route.id, route.clone());
            Ok(())
        })?;
        tracing::info!(route_id = %route.id, name, "route registered");
        Ok(route)
    }

    pub fn set_route_active(&self, route_id: RouteId, active: bool) -> DomainResult<Route> {
        self.store.transact(|state| {
            let route = state
                .routes
                .get_mut(&route_id)
                .ok_or_else(|| DomainError::not_found(format!("route {route_id}")))?;
            route.active = active;
            Ok(route.clone())
        })
    }

    pub fn list_routes(&self) -> DomainResult<Vec<Route>> {
        self.store
            .read(|state| Ok(state.routes.values().cloned().collect()))
    }
}
