//! Append-only travel history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use transitgate_core::{ActorId, PassId, RouteId, TicketId};
use transitgate_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialKind {
    Pass,
    Ticket,
}

/// Back-reference to the credential that authorized a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialRef {
    Pass { pass_id: PassId, code: String },
    Ticket { ticket_id: TicketId },
}

impl CredentialRef {
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialRef::Pass { .. } => CredentialKind::Pass,
            CredentialRef::Ticket { .. } => CredentialKind::Ticket,
        }
    }
}

/// One validated trip. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelHistoryEntry {
    id: Uuid,
    actor_id: ActorId,
    route_id: RouteId,
    travel_time: DateTime<Utc>,
    credential: CredentialRef,
    validator_actor_id: ActorId,
}

impl TravelHistoryEntry {
    pub fn record(
        actor_id: ActorId,
        route_id: RouteId,
        travel_time: DateTime<Utc>,
        credential: CredentialRef,
        validator_actor_id: ActorId,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            route_id,
            travel_time,
            credential,
            validator_actor_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    pub fn travel_time(&self) -> DateTime<Utc> {
        self.travel_time
    }

    pub fn credential_kind(&self) -> CredentialKind {
        self.credential.kind()
    }

    pub fn credential(&self) -> &CredentialRef {
        &self.credential
    }

    pub fn validator_actor_id(&self) -> ActorId {
        self.validator_actor_id
    }
}

/// Notice emitted after a trip is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRecorded {
    pub entry: TravelHistoryEntry,
}

impl Event for TravelRecorded {
    const SUBJECT: &'static str = "travel";

    fn event_type(&self) -> &'static str {
        "fares.travel.recorded"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.entry.travel_time
    }
}
