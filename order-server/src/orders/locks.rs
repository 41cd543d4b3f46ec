//! 进程内键控锁
//!
//! - 订单锁: 同一订单的修改 / 取消 / 状态变更串行执行
//! - 商品锁: 同一商品的库存预留 / 归还串行执行，修改订单时整批持有
//!
//! 加锁顺序固定为 订单锁 → 商品锁 (一次性按键排序获取)，商品锁之间不嵌套。

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 获取单个键的锁，guard 释放前其它同键操作会等待
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.mutex(key).lock_owned().await
    }

    /// 一次性获取多个键的锁
    ///
    /// 键先排序去重，所有调用方按同一顺序加锁，不会互相死锁。
    pub async fn lock_all<I, S>(&self, keys: I) -> KeyedGuard
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.mutex(key).lock_owned().await);
        }
        KeyedGuard {
            keys,
            _guards: guards,
        }
    }

    /// 清理无人持有的锁条目
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// 一批键的锁，drop 时全部释放
pub struct KeyedGuard {
    keys: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyedGuard {
    pub fn covers(&self, key: &str) -> bool {
        self.keys.binary_search_by(|k| k.as_str().cmp(key)).is_ok()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}
