//! Fare notices: lifecycle events published after a transaction commits.
//!
//! Publishing is fail-soft. A notice that cannot be encoded or delivered is
//! logged and dropped; the committed transaction stands.

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;

use transitgate_core::ActorId;
use transitgate_events::{Event, EventBus, EventEnvelope, publish_fail_soft};
use transitgate_fares::{PassEvent, TicketEvent, TravelRecorded};

/// Envelope type carried on the engine's bus.
pub type FareNotice = EventEnvelope<serde_json::Value>;

pub const SUBJECT_PASS: &str = PassEvent::SUBJECT;
pub const SUBJECT_TICKET: &str = TicketEvent::SUBJECT;
pub const SUBJECT_TRAVEL: &str = TravelRecorded::SUBJECT;

/// Publish `events` concerning `actor_id`. Returns how many were delivered.
pub fn publish_all<E, B>(bus: &B, actor_id: ActorId, events: &[E]) -> usize
where
    E: Event + Serialize,
    B: EventBus<FareNotice> + ?Sized,
{
    let mut delivered = 0;
    for event in events {
        match FareNotice::from_typed(actor_id, event) {
            Ok(notice) => {
                if publish_fail_soft(bus, notice) {
                    delivered += 1;
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event_type = event.event_type(),
                    "failed to encode notice; continuing"
                );
            }
        }
    }
    delivered
}

/// Decode a notice payload for a subscriber.
pub fn decode<E: DeserializeOwned>(notice: &FareNotice) -> anyhow::Result<E> {
    serde_json::from_value(notice.payload().clone())
        .with_context(|| format!("decoding '{}' notice", notice.event_type()))
}
