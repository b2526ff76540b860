//! Notification Dispatcher boundary
//!
//! 引擎只决定"何时"与"通知什么"，不关心消息怎么送达。具体传输
//! (SMS/WhatsApp/push) 由注入的 [`Notifier`] 实现承担，契约是
//! at-least-once 投递尝试：状态迁移提交后才派发，投递失败绝不
//! 回滚状态。

use async_trait::async_trait;
use thiserror::Error;

use shared::waitlist::{NotifyKind, Party};

/// Notification dispatch failure — logged and counted, never propagated
/// into the state machine.
#[derive(Debug, Error)]
#[error("Notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, party: &Party, kind: NotifyKind) -> Result<(), NotifyError>;
}

/// Default transport: structured log lines only.
///
/// Stands in wherever no real transport is wired up (development, tests);
/// production deployments inject their own gateway-backed implementation.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, party: &Party, kind: NotifyKind) -> Result<(), NotifyError> {
        tracing::info!(
            party_id = %party.id,
            restaurant_id = %party.restaurant_id,
            phone = %party.phone,
            kind = %kind,
            "Notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording notifier used by engine tests

    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    /// Records every dispatched `(party_id, kind)` pair; optionally fails
    /// every call to exercise the fire-and-forget contract.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Arc<Mutex<Vec<(String, NotifyKind)>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, party: &Party, kind: NotifyKind) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((party.id.clone(), kind));
            if self.fail {
                return Err(NotifyError("simulated transport outage".into()));
            }
            Ok(())
        }
    }
}
