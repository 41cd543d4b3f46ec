//! 实时消息协议
//!
//! WebSocket 上传输的消息类型，在 order-server 与客户端（顾客端 / 管理后台）之间共享。
//!
//! Server → client: `{"event": "new_order", "data": {...}}`
//! Client → server: `{"type": "join", "user_id": "user:abc"}`

use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务端推送的事件名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveEventKind {
    // ========== 订单 ==========
    NewOrder,
    OrderModified,
    OrderCancelled,
    /// 仅推送给订单所属用户频道
    OrderStatusUpdated,

    // ========== 商品 ==========
    ProductAdded,
    ProductUpdated,
    ProductDeleted,

    // ========== 用户 ==========
    UserRegistered,

    // ========== 连接控制 ==========
    Joined,
    Left,
    Pong,
    Error,
}

impl LiveEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewOrder => "new_order",
            Self::OrderModified => "order_modified",
            Self::OrderCancelled => "order_cancelled",
            Self::OrderStatusUpdated => "order_status_updated",
            Self::ProductAdded => "product_added",
            Self::ProductUpdated => "product_updated",
            Self::ProductDeleted => "product_deleted",
            Self::UserRegistered => "user_registered",
            Self::Joined => "joined",
            Self::Left => "left",
            Self::Pong => "pong",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LiveEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务端推送消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event: LiveEventKind,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl LiveEvent {
    pub fn new(event: LiveEventKind, data: impl Serialize) -> Self {
        // 序列化失败时推送空 payload，客户端会走全量刷新
        let data = serde_json::to_value(data).unwrap_or(serde_json::Value::Null);
        Self { event, data }
    }

    pub fn pong() -> Self {
        Self {
            event: LiveEventKind::Pong,
            data: serde_json::Value::Null,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            LiveEventKind::Error,
            serde_json::json!({ "message": message.into() }),
        )
    }
}

/// 客户端发送的指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// 加入某个用户的专属频道
    Join { user_id: String },
    /// 离开用户频道
    Leave { user_id: String },
    Ping,
}
