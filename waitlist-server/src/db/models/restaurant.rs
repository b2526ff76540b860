//! Restaurant Model
//!
//! 引擎只关心三个设置：宽容分钟数、重新入队策略、队列容量上限。
//! 其余字段属于注册表。

use serde::{Deserialize, Serialize};
use shared::waitlist::ReinsertionPolicy;
use surrealdb::RecordId;

/// Default arrival grace period after a party is called (minutes)
pub const DEFAULT_TOLERANCE_MINUTES: u32 = 10;

/// Restaurant entity (餐厅)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    /// 叫号后的到场宽容期（分钟，≥ 1）
    pub tolerance_minutes: u32,
    /// NO_SHOW 恢复时的落点
    #[serde(default)]
    pub reinsertion_policy: ReinsertionPolicy,
    /// 等待集容量上限；None 表示不限制
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<u32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

impl Restaurant {
    /// Record key without the table prefix; the engine uses this as the
    /// restaurant id in its own storage.
    pub fn key(&self) -> Option<String> {
        self.id.as_ref().map(|id| id.key().to_string())
    }
}

/// Create restaurant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinsertion_policy: Option<ReinsertionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<u32>,
}

/// Update restaurant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinsertion_policy: Option<ReinsertionPolicy>,
    /// Some(0) 清除容量上限
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
