//! Entity traits: identity + ownership.

use crate::id::ActorId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity purchased by (and owned by) a single actor.
///
/// Credentials and payments are owned this way; travel history only
/// back-references them.
pub trait Owned: Entity {
    fn owner(&self) -> ActorId;

    fn is_owned_by(&self, actor_id: ActorId) -> bool {
        self.owner() == actor_id
    }
}
