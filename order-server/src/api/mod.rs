//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 注册、登录、修改密码
//! - [`users`] - 用户审核 (管理员)
//! - [`products`] - 商品管理接口
//! - [`orders`] - 订单接口 (下单、修改、取消、状态变更)
//! - [`notifications`] - 新订单通知 (管理员)

pub mod auth;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod users;

// Re-export common types for handlers
pub use crate::utils::{ApiResponse, AppResult};
