//! Queue Service façade
//!
//! Composes the restaurant registry (settings resolution) with the
//! manager (state machine + allocator). Callers — reception UI glue, the
//! customer check-in surface and the tolerance sweep — go through this
//! layer only.

use std::sync::Arc;

use shared::util::now_millis;
use shared::waitlist::{
    CheckInRequest, NoShowTrigger, Party, QueueSnapshot, ReinsertionPolicy, SweepError,
    SweepReport,
};

use super::error::{WaitlistError, WaitlistResult};
use super::manager::{RestaurantPolicy, WaitlistManager};
use crate::db::models::Restaurant;
use crate::db::repository::RestaurantRepository;
use crate::utils::time::is_expired;
use crate::utils::validation::{validate_party_name, validate_party_size, validate_phone};

pub struct QueueService {
    manager: Arc<WaitlistManager>,
    restaurants: RestaurantRepository,
}

impl QueueService {
    pub fn new(manager: Arc<WaitlistManager>, restaurants: RestaurantRepository) -> Self {
        Self {
            manager,
            restaurants,
        }
    }

    pub fn manager(&self) -> &Arc<WaitlistManager> {
        &self.manager
    }

    /// 解析餐厅设置快照；停用的餐厅视为不存在
    async fn policy(&self, restaurant_id: &str) -> WaitlistResult<RestaurantPolicy> {
        let restaurant = self
            .restaurants
            .find_by_id(restaurant_id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| WaitlistError::RestaurantNotFound(restaurant_id.to_string()))?;
        Ok(Self::policy_of(&restaurant))
    }

    fn policy_of(restaurant: &Restaurant) -> RestaurantPolicy {
        RestaurantPolicy {
            tolerance_minutes: restaurant.tolerance_minutes,
            reinsertion_policy: restaurant.reinsertion_policy,
            max_queue_size: restaurant.max_queue_size,
        }
    }

    /// Check a party in. Input is validated before any state mutation.
    pub async fn check_in(
        &self,
        restaurant_id: &str,
        req: CheckInRequest,
    ) -> WaitlistResult<Party> {
        validate_party_name(&req.name)?;
        validate_phone(&req.phone)?;
        validate_party_size(req.party_size)?;

        let policy = self.policy(restaurant_id).await?;
        self.manager
            .check_in(
                restaurant_id,
                req.name.trim().to_string(),
                req.phone.trim().to_string(),
                req.party_size,
                &policy,
            )
            .await
    }

    /// Claim the lowest-position waiting party, snapshotting the current
    /// tolerance setting.
    pub async fn call_next(&self, restaurant_id: &str) -> WaitlistResult<Party> {
        let policy = self.policy(restaurant_id).await?;
        self.manager.call_next(restaurant_id, &policy).await
    }

    pub async fn mark_ready(&self, party_id: &str) -> WaitlistResult<Party> {
        self.manager.mark_ready(party_id).await
    }

    pub async fn confirm_arrival(&self, party_id: &str) -> WaitlistResult<Party> {
        self.manager.confirm_arrival(party_id).await
    }

    pub async fn mark_no_show(
        &self,
        party_id: &str,
        trigger: NoShowTrigger,
    ) -> WaitlistResult<Party> {
        self.manager.mark_no_show(party_id, trigger).await
    }

    pub async fn leave(&self, party_id: &str) -> WaitlistResult<Party> {
        self.manager.leave(party_id).await
    }

    /// Recover a NO_SHOW party; the explicit policy (if any) overrides the
    /// restaurant default.
    pub async fn reinsert(
        &self,
        party_id: &str,
        override_policy: Option<ReinsertionPolicy>,
    ) -> WaitlistResult<Party> {
        let party = self.manager.get_party(party_id)?;
        let policy = self.policy(&party.restaurant_id).await?;
        self.manager
            .reinsert(party_id, &policy, override_policy)
            .await
    }

    pub async fn queue_snapshot(&self, restaurant_id: &str) -> WaitlistResult<QueueSnapshot> {
        // 先解析餐厅，未注册的 ID 返回 404 而非空快照
        self.policy(restaurant_id).await?;
        self.manager.queue_snapshot(restaurant_id).await
    }

    /// One tolerance sweep pass.
    ///
    /// Scans every called party, recomputes `now` fresh, and drives the
    /// expired ones through the state machine so notifications and events
    /// fire exactly as they would for a manual removal. Per-party failures
    /// are collected; a lost race (`InvalidTransition`) counts as a skip.
    /// Safe to invoke concurrently with itself.
    pub async fn run_sweep(&self) -> WaitlistResult<SweepReport> {
        let candidates = self.manager.called_parties()?;
        let now = now_millis();

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for party in candidates {
            let Some(deadline) = party.tolerance_deadline() else {
                // 被叫号却没有期限，只有数据损坏才会走到这里
                report.errors.push(SweepError {
                    party_id: party.id.clone(),
                    error: "called party has no tolerance deadline".to_string(),
                });
                continue;
            };
            if !is_expired(deadline, now) {
                report.skipped += 1;
                continue;
            }

            match self
                .manager
                .mark_no_show(&party.id, NoShowTrigger::Sweep)
                .await
            {
                Ok(_) => report.expired += 1,
                Err(e) if e.is_benign_conflict() => {
                    // 别人（前台确认到场 / 并发清扫）先一步处理了
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(party_id = %party.id, error = %e, "Sweep transition failed");
                    report.errors.push(SweepError {
                        party_id: party.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}
