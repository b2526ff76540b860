//! Mesa Waitlist Server - 虚拟候位队列引擎节点
//!
//! # 架构概述
//!
//! 本模块是候位服务器的主入口，提供以下核心功能：
//!
//! - **排队引擎** (`waitlist`): 位置分配、生命周期状态机、容忍窗口清扫
//! - **餐厅注册表** (`db`): 嵌入式 SurrealDB 存储餐厅设置
//! - **HTTP API** (`api`): RESTful API 接口
//! - **变更事件** (`waitlist::manager`): broadcast 队列事件，供实时层订阅
//!
//! # 模块结构
//!
//! ```text
//! waitlist-server/src/
//! ├── core/          # 配置、状态、后台任务、错误
//! ├── db/            # 餐厅注册表 (SurrealDB)
//! ├── waitlist/      # 排队引擎 (redb)
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志、校验等工具
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod utils;
pub mod waitlist;

// Re-export 公共类型
pub use crate::core::{BackgroundTasks, Config, Server, ServerState, TaskKind};
pub use utils::{AppError, AppResult};
pub use waitlist::{
    QueueService, RestaurantPolicy, ToleranceSweeper, WaitlistError, WaitlistManager,
    WaitlistStorage,
};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    __  ___
   /  |/  /__  _________ _
  / /|_/ / _ \/ ___/ __ `/
 / /  / /  __(__  ) /_/ /
/_/  /_/\___/____/\__,_/
        waitlist
    "#
    );
}
