use std::sync::RwLock;

use transitgate_core::{DomainError, DomainResult};

use super::r#trait::Store;
use super::state::StoreState;

/// In-memory transactional store.
///
/// Each transaction runs against a scratch copy of the tables that replaces
/// the live copy only on success. The copy covers every table, travel
/// history included, so a transaction costs O(total state). Infallible
/// writes go through [`Store::update`], which mutates in place.
///
/// Intended for tests/dev; a relational backend would provide the same
/// contract with real transactions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing tables (fixtures, benches).
    pub fn with_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl Store for InMemoryStore {
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> DomainResult<R>) -> DomainResult<R> {
        let state = self
            .state
            .read()
            .map_err(|_| DomainError::store("store lock poisoned"))?;
        f(&state)
    }

    fn transact<R>(&self, f: impl FnOnce(&mut StoreState) -> DomainResult<R>) -> DomainResult<R> {
        let mut live = self
            .state
            .write()
            .map_err(|_| DomainError::store("store lock poisoned"))?;

        let mut scratch = live.clone();
        let out = f(&mut scratch)?;
        *live = scratch;
        Ok(out)
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> DomainResult<R> {
        let mut live = self
            .state
            .write()
            .map_err(|_| DomainError::store("store lock poisoned"))?;
        Ok(f(&mut live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transitgate_auth::Role;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let store = InMemoryStore::new();

        let result: DomainResult<()> = store.transact(|state| {
            let role = Role::new("temp", false);
            state.roles.insert(role.id, role);
            Err(DomainError::conflict("abort"))
        });
        assert!(result.is_err());

        let count = store.read(|state| Ok(state.roles.len())).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn update_writes_in_place() {
        let store = InMemoryStore::new();
        let id = store
            .update(|state| {
                let role = Role::new("temp", false);
                let id = role.id;
                state.roles.insert(id, role);
                id
            })
            .unwrap();
        assert!(store.read(|state| Ok(state.roles.contains_key(&id))).unwrap());
    }

    #[test]
    fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let id = store
            .transact(|state| {
                let role = Role::new("temp", false);
                let id = role.id;
                state.roles.insert(id, role);
                Ok(id)
            })
            .unwrap();

        let name = store
            .read(|state| Ok(state.roles.get(&id).map(|r| r.name.clone())))
            .unwrap();
        assert_eq!(name.as_deref(), Some("TEMP"));
    }
}
