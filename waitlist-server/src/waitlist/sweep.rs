//! 容忍窗口清扫器
//!
//! 周期性地把超过 `notified_at + tolerance + grace` 仍未到场的 party
//! 强制迁移为 NO_SHOW，保证没有客户端在线时服务端也会兑现超时。
//!
//! 截止时间是数据层概念，进程重启后照常生效；清扫间隔必须不大于
//! 宽容缓冲 (30s)，否则到期的 party 可能晚于缓冲窗口才被处理。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::service::QueueService;

/// 清扫调度器
///
/// 注册为 `TaskKind::Periodic`，在 `start_background_tasks()` 中启动。
/// 外部调度器也可以通过 `POST /api/waitlist/sweep` 直接触发一轮；
/// 两者并发运行是幂等的（状态不匹配的 party 被逐个跳过）。
pub struct ToleranceSweeper {
    service: Arc<QueueService>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ToleranceSweeper {
    pub fn new(service: Arc<QueueService>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            service,
            interval,
            shutdown,
        }
    }

    /// 主循环：等待间隔或 shutdown，每轮重新取 `now`
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Tolerance sweeper started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Tolerance sweeper received shutdown signal");
                    return;
                }
            }

            match self.service.run_sweep().await {
                Ok(report) => {
                    if !report.errors.is_empty() {
                        tracing::warn!(
                            scanned = report.scanned,
                            expired = report.expired,
                            skipped = report.skipped,
                            errors = report.errors.len(),
                            "Sweep pass finished with errors"
                        );
                    } else if report.expired > 0 {
                        tracing::info!(
                            scanned = report.scanned,
                            expired = report.expired,
                            skipped = report.skipped,
                            "Sweep pass expired parties"
                        );
                    } else {
                        tracing::debug!(scanned = report.scanned, "Sweep pass idle");
                    }
                }
                Err(e) => {
                    // 下一轮重试，单轮失败不致命
                    tracing::error!(error = %e, "Sweep pass failed");
                }
            }
        }
    }
}
