//! Shared types for the Mesa waitlist system
//!
//! Common types used by the waitlist server and its clients: the party
//! model, queue events, request/response payloads and utility functions.

pub mod util;
pub mod waitlist;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Waitlist re-exports (for convenient access)
pub use waitlist::{
    NotifyKind, Party, PartyStatus, QueueEvent, QueueEventType, ReinsertionPolicy,
};
