//! Transactional storage for the engine's tables.

pub mod in_memory;
pub mod state;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use state::StoreState;
pub use r#trait::Store;
