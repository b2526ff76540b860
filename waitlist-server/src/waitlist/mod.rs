//! Queue Lifecycle & Tolerance Engine
//!
//! This module implements the waitlist core:
//!
//! - **storage**: redb-based persistence for parties, the waiting index
//!   and the called index
//! - **allocator**: gap-free position assignment and compaction
//! - **manager**: lifecycle state machine inside restaurant-scoped
//!   critical sections
//! - **service**: façade composing settings resolution with the manager
//! - **sweep**: server-side tolerance expiry reconciliation
//! - **notify**: injected notification capability
//!
//! # Data Flow
//!
//! ```text
//! CheckIn → allocator assigns position → party persisted WAITING
//! CallNext → select-then-claim lowest position → NEXT + notified_at
//!               ↓ commit
//!          QueueEvent broadcast → subscribers
//!               ↓
//!          Notifier::notify (fire-and-forget)
//! Sweeper → every 15s: deadline passed? → MarkNoShow via state machine
//! ```

pub mod allocator;
pub mod error;
pub mod manager;
pub mod notify;
pub mod service;
pub mod storage;
pub mod sweep;

// Re-exports
pub use error::{WaitlistError, WaitlistResult};
pub use manager::{RestaurantPolicy, WaitlistManager};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use service::QueueService;
pub use storage::{StorageError, StorageStats, WaitlistStorage};
pub use sweep::ToleranceSweeper;

// Re-export shared types for convenience
pub use shared::waitlist::{
    NoShowTrigger, NotifyKind, Party, PartyStatus, QueueEvent, QueueEventType, QueueSnapshot,
    ReinsertionPolicy, SweepReport,
};
