use std::path::PathBuf;
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::auth::password::hash_password;
use crate::core::{Config, Result, ServerError};
use crate::db::DbService;
use crate::db::repository::UserRepository;
use crate::db::repository::user::NewUser;
use crate::live::{EventPublisher, SessionManager};
use crate::orders::{OrderWorkflow, RewardAccrual};
use crate::utils::validation::validate_password;
use shared::models::Role;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc / 内部共享句柄实现浅拷贝，每个请求 clone 的成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | sessions | SessionManager | WebSocket 连接注册表 |
/// | workflow | OrderWorkflow | 订单工作流 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 实时连接注册表
    pub sessions: SessionManager,
    /// 订单工作流 (事件经由 sessions 推送)
    pub workflow: OrderWorkflow,
}

impl ServerState {
    /// 基于已打开的数据库构造状态
    ///
    /// 测试中配合 `DbService::memory()` 使用
    pub fn with_db(config: Config, db: Surreal<Db>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let sessions = SessionManager::new(config.ws_channel_capacity);
        let publisher: Arc<dyn EventPublisher> = Arc::new(sessions.clone());
        let workflow = OrderWorkflow::new(
            db.clone(),
            publisher,
            RewardAccrual::new(config.reward_points_per_order),
        );

        Self {
            config,
            db,
            jwt_service,
            sessions,
            workflow,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/orders.db)
    /// 3. 各服务 (JWT, Sessions, Workflow)
    /// 4. 管理员账号 (如已配置)
    pub async fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir_structure()?;

        let db_path = config.database_dir().join("orders.db");
        let db_path_str = db_path.to_string_lossy();
        let db_service = DbService::new(
            &db_path_str,
            &config.database_namespace,
            &config.database_name,
        )
        .await?;

        let state = Self::with_db(config.clone(), db_service.db);
        state.ensure_admin().await?;

        tracing::info!(database = %db_path_str, "Server state initialized");
        Ok(state)
    }

    /// 确保配置的管理员账号存在
    pub async fn ensure_admin(&self) -> Result<()> {
        let (Some(username), Some(password)) =
            (&self.config.admin_username, &self.config.admin_password)
        else {
            return Ok(());
        };

        let users = UserRepository::new(self.db.clone());
        if users.find_by_username(username).await?.is_some() {
            return Ok(());
        }

        if let Err(e) = validate_password(password) {
            if self.config.is_production() {
                return Err(ServerError::Config(format!(
                    "ADMIN_PASSWORD rejected in production: {}",
                    e.message
                )));
            }
            tracing::warn!(environment = %self.config.environment, error = %e.message, "Weak bootstrap admin password");
        }

        let hash_pass = hash_password(password)
            .map_err(|e| ServerError::Config(format!("Failed to hash admin password: {}", e)))?;
        users
            .create(NewUser {
                username: username.clone(),
                hash_pass,
                name: "Administrator".to_string(),
                mobile: String::new(),
                role: Role::Admin,
                approved: true,
            })
            .await?;
        tracing::info!(username = %username, "Bootstrap admin account created");
        Ok(())
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 事件出口
    pub fn publisher(&self) -> &dyn EventPublisher {
        &self.sessions
    }
}
