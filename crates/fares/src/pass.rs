//! Pass aggregate: the single state machine for pass lifecycle.
//!
//! ```text
//! PENDING --(payment PAID)------------> ACTIVE --(end_date passed)--> EXPIRED
//! PENDING --(payment FAILED | reject)--> DISABLED
//! ACTIVE <--(admin toggle)--> INACTIVE
//! ```
//!
//! EXPIRED and DISABLED are terminal.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use transitgate_core::{
    ActorId, Aggregate, AggregateRoot, DomainError, DomainResult, Entity, Money, Owned, PassId,
};
use transitgate_events::Event;

use crate::calendar;

/// Pass duration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassKind {
    Monthly,
    Yearly,
}

impl PassKind {
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "MONTHLY" => Ok(PassKind::Monthly),
            "YEARLY" => Ok(PassKind::Yearly),
            other => Err(DomainError::validation(format!("unknown pass kind '{other}'"))),
        }
    }

    /// Two-letter tag embedded in pass codes.
    pub fn tag(&self) -> &'static str {
        match self {
            PassKind::Monthly => "MO",
            PassKind::Yearly => "YR",
        }
    }

    fn months(&self) -> u32 {
        match self {
            PassKind::Monthly => 1,
            PassKind::Yearly => 12,
        }
    }
}

/// Fixed pass prices per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassPrices {
    pub monthly: Money,
    pub yearly: Money,
}

impl PassPrices {
    pub fn price_for(&self, kind: PassKind) -> Money {
        match kind {
            PassKind::Monthly => self.monthly,
            PassKind::Yearly => self.yearly,
        }
    }
}

impl Default for PassPrices {
    fn default() -> Self {
        Self {
            monthly: Money::from_units(1000),
            yearly: Money::from_units(10000),
        }
    }
}

/// Human-legible pass code: `<prefix>-<8 hex>-<kind tag>`, e.g. `TG-9F03A1C2-MO`.
pub fn generate_pass_code(prefix: &str, kind: PassKind) -> String {
    let mut suffix = [0u8; 4];
    OsRng.fill_bytes(&mut suffix);
    format!("{prefix}-{}-{}", hex::encode_upper(suffix), kind.tag())
}

/// Pass lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassState {
    Pending,
    Active,
    Inactive,
    Disabled,
    Expired,
}

impl PassState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PassState::Disabled | PassState::Expired)
    }

    /// States that count against the one-open-pass-per-actor limit.
    pub fn is_open(&self) -> bool {
        matches!(self, PassState::Pending | PassState::Active)
    }
}

/// Aggregate root: Pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    id: PassId,
    actor_id: Option<ActorId>,
    code: String,
    kind: PassKind,
    state: PassState,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    version: u64,
    created: bool,
}

impl Pass {
    /// Create an empty, not-yet-requested aggregate instance.
    pub fn empty(id: PassId) -> Self {
        Self {
            id,
            actor_id: None,
            code: String::new(),
            kind: PassKind::Monthly,
            state: PassState::Pending,
            start_date: DateTime::<Utc>::MIN_UTC,
            end_date: DateTime::<Utc>::MIN_UTC,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PassId {
        self.id
    }

    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    /// Whether the stored state is stale at `now` (ACTIVE past its end).
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.state == PassState::Active && self.end_date < now
    }

    /// Whether the pass lets its holder travel at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.state == PassState::Active && self.start_date <= now && now <= self.end_date
    }
}

impl AggregateRoot for Pass {
    type Id = PassId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for Pass {
    type Id = PassId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Pass {
    fn owner(&self) -> ActorId {
        // An uncreated pass has no owner; a fresh id never matches anyone.
        self.actor_id.unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: RequestPass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPass {
    pub pass_id: PassId,
    pub actor_id: ActorId,
    pub code: String,
    pub kind: PassKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassCommand {
    Request(RequestPass),
    /// The companion payment reached a terminal state.
    SettlePayment { approved: bool, occurred_at: DateTime<Utc> },
    /// Administrative rejection of a pending application.
    Reject { occurred_at: DateTime<Utc> },
    /// Administrative ACTIVE <-> INACTIVE switch.
    Toggle { occurred_at: DateTime<Utc> },
    /// Lazy expiry check; a no-op unless the pass is ACTIVE and past its end.
    Expire { now: DateTime<Utc> },
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisableReason {
    PaymentFailed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassEvent {
    Requested {
        pass_id: PassId,
        actor_id: ActorId,
        code: String,
        kind: PassKind,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        occurred_at: DateTime<Utc>,
    },
    Activated {
        pass_id: PassId,
        occurred_at: DateTime<Utc>,
    },
    Disabled {
        pass_id: PassId,
        reason: DisableReason,
        occurred_at: DateTime<Utc>,
    },
    Deactivated {
        pass_id: PassId,
        occurred_at: DateTime<Utc>,
    },
    Reactivated {
        pass_id: PassId,
        occurred_at: DateTime<Utc>,
    },
    Expired {
        pass_id: PassId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for PassEvent {
    const SUBJECT: &'static str = "pass";

    fn event_type(&self) -> &'static str {
        match self {
            PassEvent::Requested { .. } => "fares.pass.requested",
            PassEvent::Activated { .. } => "fares.pass.activated",
            PassEvent::Disabled { .. } => "fares.pass.disabled",
            PassEvent::Deactivated { .. } => "fares.pass.deactivated",
            PassEvent::Reactivated { .. } => "fares.pass.reactivated",
            PassEvent::Expired { .. } => "fares.pass.expired",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PassEvent::Requested { occurred_at, .. }
            | PassEvent::Activated { occurred_at, .. }
            | PassEvent::Disabled { occurred_at, .. }
            | PassEvent::Deactivated { occurred_at, .. }
            | PassEvent::Reactivated { occurred_at, .. }
            | PassEvent::Expired { occurred_at, .. } => *occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Pass {
    type Command = PassCommand;
    type Event = PassEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PassEvent::Requested {
                pass_id,
                actor_id,
                code,
                kind,
                start_date,
                end_date,
                ..
            } => {
                self.id = *pass_id;
                self.actor_id = Some(*actor_id);
                self.code = code.clone();
                self.kind = *kind;
                self.start_date = *start_date;
                self.end_date = *end_date;
                self.state = PassState::Pending;
                self.created = true;
            }
            PassEvent::Activated { .. } | PassEvent::Reactivated { .. } => {
                self.state = PassState::Active;
            }
            PassEvent::Disabled { .. } => self.state = PassState::Disabled,
            PassEvent::Deactivated { .. } => self.state = PassState::Inactive,
            PassEvent::Expired { .. } => self.state = PassState::Expired,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PassCommand::Request(cmd) => self.handle_request(cmd),
            PassCommand::SettlePayment {
                approved,
                occurred_at,
            } => self.handle_settle(*approved, *occurred_at),
            PassCommand::Reject { occurred_at } => self.handle_reject(*occurred_at),
            PassCommand::Toggle { occurred_at } => self.handle_toggle(*occurred_at),
            PassCommand::Expire { now } => self.handle_expire(*now),
        }
    }
}

impl Pass {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("pass {}", self.id)));
        }
        Ok(())
    }

    fn ensure_pending(&self, action: &str) -> Result<(), DomainError> {
        if self.state != PassState::Pending {
            return Err(DomainError::invalid_operation(format!(
                "cannot {action} a pass in state {:?}",
                self.state
            )));
        }
        Ok(())
    }

    fn handle_request(&self, cmd: &RequestPass) -> Result<Vec<PassEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("pass already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("pass code must not be empty"));
        }

        let start_date = calendar::start_of_day(cmd.occurred_at);
        let end_date = calendar::months_after(start_date, cmd.kind.months())?;

        Ok(vec![PassEvent::Requested {
            pass_id: cmd.pass_id,
            actor_id: cmd.actor_id,
            code: cmd.code.clone(),
            kind: cmd.kind,
            start_date,
            end_date,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_settle(
        &self,
        approved: bool,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<PassEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_pending("settle payment for")?;

        let event = if approved {
            PassEvent::Activated {
                pass_id: self.id,
                occurred_at,
            }
        } else {
            PassEvent::Disabled {
                pass_id: self.id,
                reason: DisableReason::PaymentFailed,
                occurred_at,
            }
        };
        Ok(vec![event])
    }

    fn handle_reject(&self, occurred_at: DateTime<Utc>) -> Result<Vec<PassEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_pending("reject")?;

        Ok(vec![PassEvent::Disabled {
            pass_id: self.id,
            reason: DisableReason::Rejected,
            occurred_at,
        }])
    }

    fn handle_toggle(&self, occurred_at: DateTime<Utc>) -> Result<Vec<PassEvent>, DomainError> {
        self.ensure_created()?;

        match self.state {
            PassState::Active if self.end_date < occurred_at => Err(
                DomainError::invalid_operation("cannot deactivate a pass that has expired"),
            ),
            PassState::Active => Ok(vec![PassEvent::Deactivated {
                pass_id: self.id,
                occurred_at,
            }]),
            PassState::Inactive if self.end_date < occurred_at => Err(
                DomainError::invalid_operation("cannot reactivate a pass past its end date"),
            ),
            PassState::Inactive => Ok(vec![PassEvent::Reactivated {
                pass_id: self.id,
                occurred_at,
            }]),
            other => Err(DomainError::invalid_operation(format!(
                "cannot toggle a pass in state {other:?}"
            ))),
        }
    }

    fn handle_expire(&self, now: DateTime<Utc>) -> Result<Vec<PassEvent>, DomainError> {
        self.ensure_created()?;

        if self.is_due_for_expiry(now) {
            Ok(vec![PassEvent::Expired {
                pass_id: self.id,
                occurred_at: now,
            }])
        } else {
            Ok(vec![])
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 9, 30, 0).unwrap()
    }

    fn requested(kind: PassKind) -> Pass {
        let pass_id = PassId::new();
        let mut pass = Pass::empty(pass_id);
        pass.execute(&PassCommand::Request(RequestPass {
            pass_id,
            actor_id: ActorId::new(),
            code: generate_pass_code("TG", kind),
            kind,
            occurred_at: test_time(),
        }))
        .unwrap();
        pass
    }

    fn active(kind: PassKind) -> Pass {
        let mut pass = requested(kind);
        pass.execute(&PassCommand::SettlePayment {
            approved: true,
            occurred_at: test_time(),
        })
        .unwrap();
        pass
    }

    #[test]
    fn request_starts_at_midnight_and_runs_one_period() {
        let pass = requested(PassKind::Monthly);
        assert_eq!(pass.state(), PassState::Pending);
        assert_eq!(pass.start_date(), Utc.with_ymd_and_hms(2026, 4, 10, 0, 0, 0).unwrap());
        assert_eq!(
            pass.end_date(),
            Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );

        let yearly = requested(PassKind::Yearly);
        assert_eq!(
            yearly.end_date(),
            Utc.with_ymd_and_hms(2027, 4, 10, 0, 0, 0).unwrap() - Duration::milliseconds(1)
        );
    }

    #[test]
    fn codes_carry_prefix_and_kind_tag() {
        let code = generate_pass_code("TG", PassKind::Yearly);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "TG");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(parts[2], "YR");
    }

    #[test]
    fn approved_payment_activates() {
        let pass = active(PassKind::Monthly);
        assert_eq!(pass.state(), PassState::Active);
        assert!(pass.is_valid_at(test_time()));
    }

    #[test]
    fn failed_payment_disables_and_is_terminal() {
        let mut pass = requested(PassKind::Monthly);
        pass.execute(&PassCommand::SettlePayment {
            approved: false,
            occurred_at: test_time(),
        })
        .unwrap();
        assert_eq!(pass.state(), PassState::Disabled);
        assert!(pass.state().is_terminal());

        let err = pass
            .handle(&PassCommand::SettlePayment {
                approved: true,
                occurred_at: test_time(),
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));
    }

    #[test]
    fn reject_only_applies_to_pending() {
        let mut pending = requested(PassKind::Monthly);
        pending
            .execute(&PassCommand::Reject {
                occurred_at: test_time(),
            })
            .unwrap();
        assert_eq!(pending.state(), PassState::Disabled);

        let active = active(PassKind::Monthly);
        assert!(matches!(
            active.handle(&PassCommand::Reject {
                occurred_at: test_time()
            }),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn toggle_switches_between_active_and_inactive() {
        let mut pass = active(PassKind::Monthly);
        pass.execute(&PassCommand::Toggle {
            occurred_at: test_time(),
        })
        .unwrap();
        assert_eq!(pass.state(), PassState::Inactive);
        assert!(!pass.is_valid_at(test_time()));

        pass.execute(&PassCommand::Toggle {
            occurred_at: test_time(),
        })
        .unwrap();
        assert_eq!(pass.state(), PassState::Active);

        let pending = requested(PassKind::Monthly);
        assert!(pending
            .handle(&PassCommand::Toggle {
                occurred_at: test_time()
            })
            .is_err());
    }

    #[test]
    fn expiry_is_lazy_and_idempotent() {
        let mut pass = active(PassKind::Monthly);
        let later = pass.end_date() + Duration::seconds(1);

        let events = pass.execute(&PassCommand::Expire { now: later }).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(pass.state(), PassState::Expired);
        let version = pass.version();

        let events = pass.execute(&PassCommand::Expire { now: later }).unwrap();
        assert!(events.is_empty());
        assert_eq!(pass.version(), version);
    }

    #[test]
    fn expire_before_end_is_a_no_op() {
        let pass = active(PassKind::Monthly);
        assert!(pass
            .handle(&PassCommand::Expire { now: test_time() })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn event_types_are_namespaced() {
        let pass = requested(PassKind::Monthly);
        let events = pass
            .handle(&PassCommand::SettlePayment {
                approved: true,
                occurred_at: test_time(),
            })
            .unwrap();
        assert_eq!(events[0].event_type(), "fares.pass.activated");
        assert_eq!(events[0].occurred_at(), test_time());
    }
}
