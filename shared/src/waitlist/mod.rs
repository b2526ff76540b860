//! Waitlist domain types
//!
//! The party model, its lifecycle states, queue events and the
//! request/response payloads exchanged with the waitlist server.
//!
//! # State machine
//!
//! ```text
//! WAITING ──CallNext──> NEXT ──MarkReady──> READY
//!    │                   │                    │
//!    │                   ├──ConfirmArrival────┤──> SEATED   (terminal)
//!    │                   └──MarkNoShow────────┘──> NO_SHOW ──Reinsert──> WAITING
//!    └──Leave──> LEFT   (terminal)
//! ```

pub mod event;
pub mod party;
pub mod request;
pub mod types;

// Re-exports
pub use event::{EventPayload, NoShowTrigger, QueueEvent, QueueEventType};
pub use party::Party;
pub use request::{
    CalledParty, CheckInRequest, CheckInResponse, QueueSnapshot, ReinsertRequest, SweepError,
    SweepReport,
};
pub use types::{
    GRACE_PADDING_MS, MAX_PARTY_SIZE, MIN_PARTY_SIZE, NotifyKind, PartyStatus, ReinsertionPolicy,
    tolerance_deadline,
};
