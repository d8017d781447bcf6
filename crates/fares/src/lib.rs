//! Fare credential domain (passes, tickets, payments, pricing).
//!
//! Business rules implemented as deterministic domain logic (no IO, no
//! storage). Time is always passed in explicitly.

pub mod calendar;
pub mod pass;
pub mod payment;
pub mod pricing;
pub mod route;
pub mod ticket;
pub mod travel;

pub use pass::{
    DisableReason, Pass, PassCommand, PassEvent, PassKind, PassPrices, PassState, RequestPass,
    generate_pass_code,
};
pub use payment::{Payment, PaymentState, PaymentSubject};
pub use pricing::{PricingRule, TicketKind, TierPrices};
pub use route::Route;
pub use ticket::{PurchaseTicket, Ticket, TicketCommand, TicketEvent};
pub use travel::{CredentialKind, CredentialRef, TravelHistoryEntry, TravelRecorded};
