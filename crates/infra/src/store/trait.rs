use std::sync::Arc;

use transitgate_core::DomainResult;

use super::state::StoreState;

/// Transactional store abstraction.
///
/// `transact` is all-or-nothing: when the closure returns `Err`, none of its
/// writes become visible. Transactions are serialized, so a conflict check
/// performed inside one is a re-read under the write lock.
pub trait Store: Send + Sync {
    /// Run a read-only query against a consistent snapshot.
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> DomainResult<R>) -> DomainResult<R>;

    /// Run a read-write transaction.
    fn transact<R>(&self, f: impl FnOnce(&mut StoreState) -> DomainResult<R>) -> DomainResult<R>;

    /// Apply a write that cannot fail, so it never needs a rollback.
    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> DomainResult<R> {
        self.transact(|state| Ok(f(state)))
    }
}

impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> DomainResult<R>) -> DomainResult<R> {
        (**self).read(f)
    }

    fn transact<R>(&self, f: impl FnOnce(&mut StoreState) -> DomainResult<R>) -> DomainResult<R> {
        (**self).transact(f)
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> DomainResult<R> {
        (**self).update(f)
    }
}
