use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use transitgate_core::{
    ActorId, DomainError, DomainResult, Entity, Money, Owned, PassId, PaymentId, TicketId,
};

/// Settlement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Paid,
    Failed,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentState::Pending)
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentSubject {
    Pass(PassId),
    Ticket(TicketId),
}

/// Payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub actor_id: ActorId,
    pub subject: PaymentSubject,
    pub amount: Money,
    pub state: PaymentState,
    pub proof_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn pending(
        actor_id: ActorId,
        subject: PaymentSubject,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            actor_id,
            subject,
            amount,
            state: PaymentState::Pending,
            proof_ref: None,
            created_at: now,
            settled_at: None,
        }
    }

    pub fn pass_id(&self) -> Option<PassId> {
        match self.subject {
            PaymentSubject::Pass(id) => Some(id),
            PaymentSubject::Ticket(_) => None,
        }
    }

    /// Move a pending payment to PAID or FAILED.
    ///
    /// A terminal payment can never be re-decided.
    pub fn settle(&mut self, approve: bool, now: DateTime<Utc>) -> DomainResult<PaymentState> {
        if self.state.is_terminal() {
            return Err(DomainError::invalid_operation(format!(
                "payment {} is already settled ({:?})",
                self.id, self.state
            )));
        }
        self.state = if approve {
            PaymentState::Paid
        } else {
            PaymentState::Failed
        };
        self.settled_at = Some(now);
        Ok(self.state)
    }

    /// Record a proof-of-payment reference for manual review.
    ///
    /// Only the paying actor may attach proof; the state is unchanged.
    pub fn attach_proof(&mut self, actor_id: ActorId, proof_ref: &str) -> DomainResult<()> {
        if !self.is_owned_by(actor_id) {
            return Err(DomainError::forbidden("payment belongs to another actor"));
        }
        let proof_ref = proof_ref.trim();
        if proof_ref.is_empty() {
            return Err(DomainError::validation("proof reference must not be empty"));
        }
        self.proof_ref = Some(proof_ref.to_string());
        Ok(())
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Owned for Payment {
    fn owner(&self) -> ActorId {
        self.actor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Payment {
        Payment::pending(
            ActorId::new(),
            PaymentSubject::Pass(PassId::new()),
            Money::from_units(1000),
            Utc::now(),
        )
    }

    #[test]
    fn settle_is_one_shot() {
        let mut payment = pending();
        assert_eq!(payment.settle(true, Utc::now()).unwrap(), PaymentState::Paid);

        let err = payment.settle(false, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));
        assert_eq!(payment.state, PaymentState::Paid);
    }

    #[test]
    fn only_the_owner_attaches_proof() {
        let mut payment = pending();
        let stranger = ActorId::new();

        assert!(matches!(
            payment.attach_proof(stranger, "receipt-1"),
            Err(DomainError::Forbidden(_))
        ));

        payment.attach_proof(payment.actor_id, " receipt-1 ").unwrap();
        assert_eq!(payment.proof_ref.as_deref(), Some("receipt-1"));
        assert_eq!(payment.state, PaymentState::Pending);
    }
}
