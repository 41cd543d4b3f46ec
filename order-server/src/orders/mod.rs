//! 订单模块
//!
//! - [`InventoryLedger`] - 库存原子预留 / 归还
//! - [`OrderWorkflow`] - 下单、修改、取消、状态变更
//! - [`RewardAccrual`] - 送达积分
//! - [`KeyedLocks`] - 单订单 / 单商品串行化

pub mod error;
pub mod ledger;
pub mod locks;
pub mod patch;
pub mod rewards;
pub mod workflow;

pub use error::OrderError;
pub use ledger::{InventoryLedger, ReserveRequest, StockGuard};
pub use locks::{KeyedGuard, KeyedLocks};
pub use rewards::RewardAccrual;
pub use workflow::OrderWorkflow;

#[cfg(test)]
mod tests;
