//! Inventory Ledger
//!
//! 库存只通过存储层的原子条件更新修改 (见 `ProductRepository::reserve_stock`)，
//! 从不读后写。同一商品的预留 / 归还在进程内按商品串行，存储层写冲突按退避重试，
//! 并发下单既不会超卖，也不会因冲突被误拒。

use super::error::OrderError;
use super::locks::{KeyedGuard, KeyedLocks};
use crate::db::models::{LineItem, ProductId};
use crate::db::repository::ProductRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// 待预留的订单行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRequest {
    pub product: ProductId,
    pub quantity: i64,
}

/// 一批商品的库存锁
///
/// 持有期间其它预留 / 归还这些商品的操作会等待。
pub struct StockGuard(KeyedGuard);

impl StockGuard {
    pub fn covers(&self, product: &ProductId) -> bool {
        self.0.covers(&product.to_string())
    }
}

#[derive(Clone)]
pub struct InventoryLedger {
    products: ProductRepository,
    locks: KeyedLocks,
}

impl InventoryLedger {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            products: ProductRepository::new(db),
            locks: KeyedLocks::new(),
        }
    }

    /// 锁定一批商品的库存
    pub async fn lock_products<'a, I>(&self, products: I) -> StockGuard
    where
        I: IntoIterator<Item = &'a ProductId>,
    {
        StockGuard(self.locks.lock_all(products.into_iter().map(|p| p.to_string())).await)
    }

    /// 释放 guard 后清理空闲锁条目
    pub fn unlock(&self, guard: StockGuard) {
        drop(guard);
        self.locks.prune();
    }

    /// 预留库存，成功时返回带价格快照的订单行与剩余库存
    pub async fn reserve(
        &self,
        product: &ProductId,
        quantity: i64,
    ) -> Result<(LineItem, i64), OrderError> {
        let guard = self.lock_products([product]).await;
        let result = self.reserve_held(&guard, product, quantity).await;
        self.unlock(guard);
        result
    }

    async fn reserve_held(
        &self,
        guard: &StockGuard,
        product: &ProductId,
        quantity: i64,
    ) -> Result<(LineItem, i64), OrderError> {
        debug_assert!(guard.covers(product));
        if quantity < 1 {
            return Err(OrderError::Validation(format!(
                "quantity must be at least 1 ({})",
                quantity
            )));
        }

        if let Some(updated) = self.products.reserve_stock(product, quantity).await? {
            let item = LineItem {
                product: product.clone(),
                name: updated.name.clone(),
                price: updated.effective_price(),
                quantity,
            };
            return Ok((item, updated.stock));
        }

        // 条件未满足：区分商品不存在与库存不足
        match self.products.find_by_record(product).await? {
            None => Err(OrderError::ProductNotFound(product.to_string())),
            Some(current) => Err(OrderError::InsufficientStock {
                product: current.name,
                available: current.stock,
                requested: quantity,
            }),
        }
    }

    /// 归还库存，返回新的库存量
    ///
    /// 商品已被删除时返回 `None`（没有可归还的计数器）。
    pub async fn release(&self, product: &ProductId, quantity: i64) -> Result<Option<i64>, OrderError> {
        let guard = self.lock_products([product]).await;
        let result = self.release_held(&guard, product, quantity).await;
        self.unlock(guard);
        result
    }

    async fn release_held(
        &self,
        guard: &StockGuard,
        product: &ProductId,
        quantity: i64,
    ) -> Result<Option<i64>, OrderError> {
        debug_assert!(guard.covers(product));
        let updated = self.products.release_stock(product, quantity).await?;
        if updated.is_none() {
            tracing::warn!(product = %product, quantity, "Release skipped, product no longer exists");
        }
        Ok(updated.map(|p| p.stock))
    }

    /// 按顺序预留所有订单行；任一失败时归还本次已预留的部分
    pub async fn reserve_all(&self, requests: &[ReserveRequest]) -> Result<Vec<LineItem>, OrderError> {
        let products: Vec<&ProductId> = requests.iter().map(|r| &r.product).collect();
        let guard = self.lock_products(products).await;
        let result = self.reserve_all_held(&guard, requests).await;
        self.unlock(guard);
        result
    }

    /// 同 [`reserve_all`](Self::reserve_all)，调用方已持有这些商品的锁
    pub async fn reserve_all_held(
        &self,
        guard: &StockGuard,
        requests: &[ReserveRequest],
    ) -> Result<Vec<LineItem>, OrderError> {
        let mut reserved: Vec<LineItem> = Vec::with_capacity(requests.len());
        for request in requests {
            match self.reserve_held(guard, &request.product, request.quantity).await {
                Ok((item, _)) => reserved.push(item),
                Err(e) => {
                    if !reserved.is_empty() {
                        tracing::warn!(
                            failed = %request.product,
                            rolled_back = reserved.len(),
                            "Reservation failed, releasing earlier line items"
                        );
                        self.release_all_held(guard, &reserved).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(reserved)
    }

    /// 归还所有订单行 (补偿路径，单条失败只记录日志)
    pub async fn release_all(&self, items: &[LineItem]) {
        let products: Vec<&ProductId> = items.iter().map(|i| &i.product).collect();
        let guard = self.lock_products(products).await;
        self.release_all_held(&guard, items).await;
        self.unlock(guard);
    }

    /// 同 [`release_all`](Self::release_all)，调用方已持有这些商品的锁
    pub async fn release_all_held(&self, guard: &StockGuard, items: &[LineItem]) {
        for item in items {
            if let Err(e) = self.release_held(guard, &item.product, item.quantity).await {
                tracing::error!(
                    product = %item.product,
                    quantity = item.quantity,
                    error = %e,
                    "Failed to release stock"
                );
            }
        }
    }

    /// 归还订单行；中途失败时把已归还的部分重新预留，库存回到调用前
    pub async fn release_exact_held(
        &self,
        guard: &StockGuard,
        items: &[LineItem],
    ) -> Result<(), OrderError> {
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = self.release_held(guard, &item.product, item.quantity).await {
                self.restore_all_held(guard, &items[..index]).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// 重新预留已归还的订单行 (修改失败时的回滚)
    ///
    /// 保留原有的价格快照，返回无法重新预留的订单行。调用方从归还起一直持有锁，
    /// 归还的数量不会被其它下单占用。
    pub async fn restore_all_held(&self, guard: &StockGuard, items: &[LineItem]) -> Vec<LineItem> {
        let mut failed = Vec::new();
        for item in items {
            debug_assert!(guard.covers(&item.product));
            match self.products.reserve_stock(&item.product, item.quantity).await {
                Ok(Some(_)) => {}
                Ok(None) => failed.push(item.clone()),
                Err(e) => {
                    tracing::error!(product = %item.product, error = %e, "Failed to restore reservation");
                    failed.push(item.clone());
                }
            }
        }
        failed
    }
}
