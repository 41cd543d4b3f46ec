//! Database Module
//!
//! 嵌入式 SurrealDB：生产环境使用 RocksDB，测试使用内存引擎。

pub mod models;
pub mod repository;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::db::repository::RepoResult;

/// 表结构定义
///
/// 表为 SCHEMALESS，仅对参与不变量的字段声明类型：
/// - `product.stock` 非负 (原子扣减的最后一道防线)
/// - `user.username` 唯一
/// - `order.status` 只能是四种状态之一
const SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS product SCHEMALESS;
DEFINE FIELD IF NOT EXISTS name ON product TYPE string;
DEFINE FIELD IF NOT EXISTS price ON product TYPE number ASSERT $value >= 0;
DEFINE FIELD IF NOT EXISTS discount ON product TYPE number ASSERT $value >= 0 AND $value <= 100;
DEFINE FIELD IF NOT EXISTS stock ON product TYPE int ASSERT $value >= 0;

DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
DEFINE FIELD IF NOT EXISTS username ON user TYPE string;
DEFINE FIELD IF NOT EXISTS role ON user TYPE string ASSERT $value IN ['customer', 'admin'];
DEFINE FIELD IF NOT EXISTS approved ON user TYPE bool;
DEFINE FIELD IF NOT EXISTS reward_points ON user TYPE int ASSERT $value >= 0;
DEFINE INDEX IF NOT EXISTS user_username ON user FIELDS username UNIQUE;

DEFINE TABLE IF NOT EXISTS order SCHEMALESS;
DEFINE FIELD IF NOT EXISTS user ON order TYPE record<user>;
DEFINE FIELD IF NOT EXISTS status ON order TYPE string
    ASSERT $value IN ['pending', 'accepted', 'delivered', 'cancelled'];
DEFINE FIELD IF NOT EXISTS total_price ON order TYPE number;
DEFINE FIELD IF NOT EXISTS reward_points_earned ON order TYPE int;
DEFINE FIELD IF NOT EXISTS created_at ON order TYPE int;
DEFINE INDEX IF NOT EXISTS order_user ON order FIELDS user;
DEFINE INDEX IF NOT EXISTS order_status ON order FIELDS status;

DEFINE TABLE IF NOT EXISTS notification SCHEMALESS;
DEFINE FIELD IF NOT EXISTS order_id ON notification TYPE record<order>;
DEFINE FIELD IF NOT EXISTS is_read ON notification TYPE bool;
"#;

/// Database service — owns the SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// 打开 RocksDB 存储并应用表结构
    pub async fn new(db_path: &str, namespace: &str, database: &str) -> RepoResult<Self> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path).await?;
        Self::prepare(db, namespace, database).await
    }

    /// 内存数据库 (测试 / 演示)
    pub async fn memory() -> RepoResult<Self> {
        let db: Surreal<Db> = Surreal::new::<Mem>(()).await?;
        Self::prepare(db, "test", "test").await
    }

    async fn prepare(db: Surreal<Db>, namespace: &str, database: &str) -> RepoResult<Self> {
        db.use_ns(namespace).use_db(database).await?;
        db.query(SCHEMA).await?.check()?;
        tracing::info!(namespace, database, "Database schema applied");
        Ok(Self { db })
    }
}
