//! 实时事件分发
//!
//! ```text
//! OrderWorkflow / API handlers
//!       │ EventPublisher::broadcast / publish_to_user
//!       ▼
//! SessionManager
//!   └── connections: ConnectionId → (owner, joined channels, mpsc::Sender)
//!           │ try_send (队列满则丢弃)
//!           ▼
//!   WS session task (ws.rs) → client
//! ```
//!
//! 投递语义为 at-most-once：断线的客户端会错过事件，重连后需全量刷新。

pub mod ws;

use dashmap::DashMap;
use shared::LiveEvent;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

pub type ConnectionId = u64;

/// 工作流依赖的事件出口
///
/// 生产环境由 [`SessionManager`] 实现；测试注入记录型实现。
pub trait EventPublisher: Send + Sync {
    /// 推送给所有在线连接
    fn broadcast(&self, event: LiveEvent);

    /// 推送给加入了该用户频道的连接
    fn publish_to_user(&self, user_id: &str, event: LiveEvent);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    #[error("Cannot join channel of another user: {0}")]
    Forbidden(String),
}

struct Connection {
    /// 已认证的连接所有者
    owner: String,
    is_admin: bool,
    channels: HashSet<String>,
    tx: mpsc::Sender<LiveEvent>,
}

/// 连接注册表
#[derive(Clone)]
pub struct SessionManager {
    connections: Arc<DashMap<ConnectionId, Connection>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl SessionManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// 注册新连接，返回连接 ID 与出站队列的接收端
    pub fn register(&self, owner: &str, is_admin: bool) -> (ConnectionId, mpsc::Receiver<LiveEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.connections.insert(
            id,
            Connection {
                owner: owner.to_string(),
                is_admin,
                channels: HashSet::new(),
                tx,
            },
        );
        tracing::debug!(connection_id = id, owner, "Live connection registered");
        (id, rx)
    }

    pub fn unregister(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            tracing::debug!(connection_id = id, "Live connection unregistered");
        }
    }

    /// 加入用户频道 (非管理员只能加入自己的频道)
    pub fn join(&self, id: ConnectionId, user_id: &str) -> Result<(), JoinError> {
        let mut conn = self
            .connections
            .get_mut(&id)
            .ok_or(JoinError::UnknownConnection(id))?;
        if !conn.is_admin && conn.owner != user_id {
            return Err(JoinError::Forbidden(user_id.to_string()));
        }
        conn.channels.insert(user_id.to_string());
        Ok(())
    }

    pub fn leave(&self, id: ConnectionId, user_id: &str) {
        if let Some(mut conn) = self.connections.get_mut(&id) {
            conn.channels.remove(user_id);
        }
    }

    /// 加入了该用户频道的连接
    pub fn lookup_by_user(&self, user_id: &str) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|entry| entry.value().channels.contains(user_id))
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn deliver(id: ConnectionId, tx: &mpsc::Sender<LiveEvent>, event: LiveEvent) {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::debug!(
                    connection_id = id,
                    event = %event.event,
                    "Live queue full, event dropped"
                );
            }
            // 会话任务已退出，等待 unregister
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

impl EventPublisher for SessionManager {
    fn broadcast(&self, event: LiveEvent) {
        for entry in self.connections.iter() {
            Self::deliver(*entry.key(), &entry.value().tx, event.clone());
        }
    }

    fn publish_to_user(&self, user_id: &str, event: LiveEvent) {
        for entry in self.connections.iter() {
            if entry.value().channels.contains(user_id) {
                Self::deliver(*entry.key(), &entry.value().tx, event.clone());
            }
        }
    }
}
