//! Repository Module
//!
//! Provides CRUD operations for SurrealDB tables.

pub mod notification;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use notification::NotificationRepository;
pub use order::{OrderFilter, OrderRepository};
pub use product::ProductRepository;
pub use user::UserRepository;

use shared::{AppError, ErrorCode};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// 乐观事务读写冲突，可重试
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl RepoError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepoError::Conflict(_))
    }
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if is_conflict_message(&msg) {
            RepoError::Conflict(msg)
        } else {
            RepoError::Database(msg)
        }
    }
}

/// SurrealDB 提交冲突: "... read or write conflict. This transaction can be retried"
fn is_conflict_message(msg: &str) -> bool {
    msg.contains("read or write conflict") || msg.contains("can be retried")
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Conflict(msg) => AppError::conflict(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// 写冲突最大尝试次数
pub const MAX_CONFLICT_ATTEMPTS: u32 = 5;
/// 重试基础延迟 (ms)，指数退避
pub const CONFLICT_BASE_DELAY_MS: u64 = 10;

/// 写冲突时指数退避重试，其他错误立即返回
pub async fn retry_on_conflict<T, F, Fut>(label: &str, mut op: F) -> RepoResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = RepoResult<T>>,
{
    let mut last_error = None;
    for attempt in 0..MAX_CONFLICT_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_conflict() => {
                tracing::debug!(op = label, attempt = attempt + 1, error = %e, "Write conflict");
                last_error = Some(e);
                if attempt + 1 < MAX_CONFLICT_ATTEMPTS {
                    let delay_ms = CONFLICT_BASE_DELAY_MS * 2u64.pow(attempt);
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
    tracing::error!(op = label, attempts = MAX_CONFLICT_ATTEMPTS, "Write conflict retries exhausted");
    Err(last_error.unwrap_or_else(|| RepoError::Conflict(format!("{} conflicted", label))))
}

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================
//
//   - 解析: parse_record_id("product", "product:abc")
//   - 获取表名: id.table()
//   - CRUD: 直接绑定 RecordId (`.bind(("id", id))`)

/// 解析 "table:id" 字符串，并校验表名
pub fn parse_record_id(table: &str, id: &str) -> RepoResult<RecordId> {
    let record: RecordId = id
        .parse()
        .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
    if record.table() != table {
        return Err(RepoError::Validation(format!(
            "Invalid ID: {} is not a {} record",
            id, table
        )));
    }
    Ok(record)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
