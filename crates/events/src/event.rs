use chrono::{DateTime, Utc};

/// A credential lifecycle fact.
///
/// Events are immutable once emitted. `SUBJECT` names the kind of record the
/// event concerns (`"pass"`, `"ticket"`, ...) so subscribers can filter
/// envelopes without decoding payloads.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Subject type shared by every variant of this event type.
    const SUBJECT: &'static str;

    /// Stable event name (e.g. "fares.pass.activated").
    fn event_type(&self) -> &'static str;

    /// Payload schema version; bump when a variant's fields change shape.
    fn schema_version(&self) -> u32 {
        1
    }

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
