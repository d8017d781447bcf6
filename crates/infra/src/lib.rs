//! Infrastructure layer: transactional store, services, config, notices.

pub mod config;
pub mod notices;
pub mod services;
pub mod store;


pub use config::EngineConfig;
pub use services::{Engine, InMemoryEngine};
