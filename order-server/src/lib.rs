//! Pourline Order Server - 饮品店订单系统后端
//!
//! # 架构概述
//!
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储 (商品 / 订单 / 通知 / 用户)
//! - **订单流程** (`orders`): 库存预留、订单状态机、积分发放
//! - **实时推送** (`live`): WebSocket 会话管理与事件分发
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (models + repository)
//! ├── orders/        # 库存账本、订单工作流、积分
//! ├── live/          # WebSocket 会话与事件分发
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod live;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use live::{EventPublisher, SessionManager};
pub use orders::{InventoryLedger, OrderWorkflow, RewardAccrual};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境: 加载 .env、创建工作目录、初始化日志
pub fn setup_environment() -> Result<(), std::io::Error> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
    let log_dir = std::path::Path::new(&work_dir).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.to_str());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____                  ___
   / __ \____  __  ______/ (_)___  ___
  / /_/ / __ \/ / / / __/ / / __ \/ _ \
 / ____/ /_/ / /_/ / / / / / / / /  __/
/_/    \____/\__,_/_/ /_/_/_/ /_/\___/
                  order server
    "#
    );
}
