//! Database Module
//!
//! 餐厅注册表使用嵌入式 SurrealDB 存储；排队引擎本身的数据
//! (party 记录、位置索引) 在 `waitlist::storage` 的 redb 中。

pub mod models;
pub mod repository;

use std::path::Path;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "mesa";
const DATABASE: &str = "waitlist";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the on-disk database under the given directory
    pub async fn new(path: &Path) -> Result<Self, AppError> {
        let db = Surreal::new::<RocksDb>(path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        tracing::info!(path = %path.display(), "Restaurant registry opened (SurrealDB/RocksDB)");
        Ok(Self { db })
    }

    /// Open an in-memory database (tests, ephemeral runs)
    pub async fn new_in_memory() -> Result<Self, AppError> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;
        Ok(Self { db })
    }
}
