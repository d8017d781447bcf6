//! `transitgate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::{Entity, Owned};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{ActorId, PassId, PaymentId, RoleId, RouteId, TicketId};
pub use value_object::{Money, ValueObject};
