use std::sync::Arc;
use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::broadcast;

use crate::core::config::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::DbService;
use crate::db::repository::RestaurantRepository;
use crate::waitlist::{LogNotifier, QueueService, ToleranceSweeper, WaitlistManager};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是候位节点的核心数据结构，使用 Arc 实现浅拷贝。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 餐厅注册表 (嵌入式 SurrealDB) |
/// | queue | Arc<QueueService> | 排队引擎门面 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 餐厅注册表
    pub db: Surreal<Db>,
    /// 排队引擎门面 (settings + manager + sweep)
    pub queue: Arc<QueueService>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize()`] 方法代替
    pub fn new(config: Config, db: Surreal<Db>, queue: Arc<QueueService>) -> Self {
        Self { config, db, queue }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 餐厅注册表 (work_dir/database)
    /// 3. 引擎存储 (work_dir/queue/waitlist.redb) + 管理器
    /// 4. QueueService 门面
    ///
    /// # Panics
    ///
    /// 任一存储初始化失败时 panic —— 没有存储就没有队列
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_service = DbService::new(&config.database_dir())
            .await
            .expect("Failed to initialize restaurant registry");
        let db = db_service.db;

        let manager = WaitlistManager::new(config.queue_db_path(), Arc::new(LogNotifier))
            .expect("Failed to open waitlist storage");
        let queue = Arc::new(QueueService::new(
            Arc::new(manager),
            RestaurantRepository::new(db.clone()),
        ));

        Self::new(config.clone(), db, queue)
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 接收流量之前调用
    ///
    /// 启动的任务：
    /// - 容忍窗口清扫器 (Periodic)
    /// - 变更事件日志 (Listener)
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let sweeper = ToleranceSweeper::new(
            self.queue.clone(),
            Duration::from_secs(self.config.sweep_interval_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("tolerance_sweeper", TaskKind::Periodic, sweeper.run());

        // 变更事件的原始落日志（外部 fan-out 层自行订阅 broadcast）
        let mut rx = self.queue.manager().subscribe();
        let token = tasks.shutdown_token();
        tasks.spawn("event_feed_logger", TaskKind::Listener, async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(e) => tracing::debug!(
                            sequence = e.sequence,
                            event_type = %e.event_type,
                            restaurant_id = %e.restaurant_id,
                            party_id = %e.party_id,
                            "Queue event"
                        ),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Event feed logger lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取排队引擎门面
    pub fn queue_service(&self) -> &Arc<QueueService> {
        &self.queue
    }
}
