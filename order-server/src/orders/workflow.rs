//! Order Workflow Engine
//!
//! 编排下单 / 修改 / 取消 / 状态变更：
//!
//! ```text
//! request ─► validate ─► InventoryLedger (reserve / release)
//!                            │
//!                            ▼
//!                     OrderRepository (persist)
//!                            │
//!                            ▼
//!                     EventPublisher (仅在写入成功后)
//! ```
//!
//! 中途失败时通过显式补偿 (归还 / 重新预留) 恢复库存，不依赖跨文档事务。

use super::error::OrderError;
use super::ledger::{InventoryLedger, ReserveRequest, StockGuard};
use super::locks::KeyedLocks;
use super::patch::{validate_create, validate_patch, validate_reason};
use super::rewards::RewardAccrual;
use crate::auth::CurrentUser;
use crate::db::models::{LineItem, Notification, Order, OrderId, ProductId};
use crate::db::repository::order::{NewOrder, OrderDetails};
use crate::db::repository::{
    NotificationRepository, OrderFilter, OrderRepository, UserRepository, parse_record_id,
};
use crate::live::EventPublisher;
use shared::models::{OrderCreate, OrderListQuery, OrderPatch, OrderStatus};
use shared::util::{day_end_millis, day_start_millis, parse_date};
use shared::{LiveEvent, LiveEventKind, PaginatedResponse, Pagination};
use std::sync::Arc;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct OrderWorkflow {
    orders: OrderRepository,
    users: UserRepository,
    notifications: NotificationRepository,
    ledger: InventoryLedger,
    rewards: RewardAccrual,
    locks: KeyedLocks,
    events: Arc<dyn EventPublisher>,
}

impl OrderWorkflow {
    pub fn new(db: Surreal<Db>, events: Arc<dyn EventPublisher>, rewards: RewardAccrual) -> Self {
        Self {
            orders: OrderRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            notifications: NotificationRepository::new(db.clone()),
            ledger: InventoryLedger::new(db),
            rewards,
            locks: KeyedLocks::new(),
            events,
        }
    }

    /// 库存台账，管理端直接设置库存时用于锁定商品
    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// 下单：按顺序预留库存 → 持久化订单 → 创建通知 → 广播 `new_order`
    pub async fn create(&self, requester: &CurrentUser, input: OrderCreate) -> Result<Order, OrderError> {
        let validated = validate_create(input)?;

        let user_id = parse_record_id("user", &requester.id)?;
        let user = self
            .users
            .find_by_record(&user_id)
            .await?
            .ok_or_else(|| OrderError::UserNotFound(requester.id.clone()))?;
        if !user.can_order() {
            return Err(OrderError::UserNotApproved);
        }

        let items = self.ledger.reserve_all(&validated.items).await?;

        let order = match self
            .orders
            .create(NewOrder {
                user: user_id,
                customer_name: user.name.clone(),
                customer_mobile: user.mobile.clone(),
                products: items.clone(),
                delivery_address: validated.delivery_address,
                pickup_date: validated.pickup_date,
                pickup_time: validated.pickup_time,
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(user_id = %requester.id, error = %e, "Order persist failed, releasing stock");
                self.ledger.release_all(&items).await;
                return Err(e.into());
            }
        };

        let notification = self.create_notification(&order).await;

        tracing::info!(
            order_id = %order.id_string(),
            user_id = %requester.id,
            total = %order.total_price,
            "Order created"
        );
        self.events.broadcast(LiveEvent::new(
            LiveEventKind::NewOrder,
            serde_json::json!({ "order": &order, "notification": notification }),
        ));
        Ok(order)
    }

    /// 订单已落库后通知写入失败不回滚订单，事件中 notification 为 null
    async fn create_notification(&self, order: &Order) -> Option<Notification> {
        let id = order.id.as_ref()?;
        match self
            .notifications
            .create(id, &order.customer_name, &Order::product_summary(&order.products))
            .await
        {
            Ok(notification) => Some(notification),
            Err(e) => {
                tracing::error!(order_id = %id, error = %e, "Failed to create order notification");
                None
            }
        }
    }

    // ========================================================================
    // Modify
    // ========================================================================

    /// 修改 Pending 订单 (仅限订单所有者)
    ///
    /// 替换订单行时锁定新旧订单行涉及的全部商品，先归还旧库存再预留新库存；
    /// 预留或写入失败则重新预留旧订单行。锁一直持有到写入完成，回滚不会与
    /// 其它下单争抢刚归还的库存。
    pub async fn modify(
        &self,
        order_id: &str,
        requester: &CurrentUser,
        patch: OrderPatch,
    ) -> Result<Order, OrderError> {
        let validated = validate_patch(patch)?;

        let guard = self.locks.lock(order_id).await;
        let order = self.load_owned(order_id, requester).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidState {
                status: order.status,
                operation: "modify",
            });
        }
        let id = record_of(&order)?;

        let (new_items, stock) = match &validated.items {
            Some(requests) => {
                let products: Vec<&ProductId> = order
                    .products
                    .iter()
                    .map(|item| &item.product)
                    .chain(requests.iter().map(|r| &r.product))
                    .collect();
                let stock = self.ledger.lock_products(products).await;
                let items = self
                    .replace_items(&stock, &id, &order.products, requests)
                    .await?;
                (Some(items), Some(stock))
            }
            None => (None, None),
        };

        let details = OrderDetails {
            products: new_items.clone(),
            delivery_address: validated.delivery_address,
            pickup_date: validated.pickup_date,
            pickup_time: validated.pickup_time,
        };

        let persisted = self.orders.update_details(&id, details).await;
        let updated = match persisted {
            Ok(Some(updated)) => updated,
            other => {
                if let (Some(items), Some(stock)) = (&new_items, &stock) {
                    self.ledger.release_all_held(stock, items).await;
                    self.restore_reservation(stock, &id, &order.products).await;
                }
                return match other {
                    Err(e) => Err(e.into()),
                    _ => Err(self.invalid_state_of(&id, "modify").await),
                };
            }
        };
        if let Some(stock) = stock {
            self.ledger.unlock(stock);
        }
        drop(guard);
        self.locks.prune();

        tracing::info!(
            order_id = %id,
            user_id = %requester.id,
            items_replaced = new_items.is_some(),
            "Order modified"
        );
        self.events
            .broadcast(LiveEvent::new(LiveEventKind::OrderModified, &updated));
        Ok(updated)
    }

    /// 归还旧订单行并预留新订单行；预留失败时恢复旧订单行
    async fn replace_items(
        &self,
        stock: &StockGuard,
        id: &OrderId,
        current: &[LineItem],
        requests: &[ReserveRequest],
    ) -> Result<Vec<LineItem>, OrderError> {
        self.ledger.release_exact_held(stock, current).await?;
        match self.ledger.reserve_all_held(stock, requests).await {
            Ok(items) => Ok(items),
            Err(e) => {
                self.restore_reservation(stock, id, current).await;
                Err(e)
            }
        }
    }

    async fn restore_reservation(&self, stock: &StockGuard, id: &OrderId, items: &[LineItem]) {
        let failed = self.ledger.restore_all_held(stock, items).await;
        if failed.is_empty() {
            tracing::warn!(order_id = %id, "Modification rolled back, original reservation restored");
        } else {
            tracing::error!(
                order_id = %id,
                unrestored = ?failed.iter().map(|i| i.product.to_string()).collect::<Vec<_>>(),
                "Modification rollback could not restore every line item"
            );
        }
    }

    // ========================================================================
    // Cancel
    // ========================================================================

    /// 取消 Pending / Accepted 订单 (仅限订单所有者)，归还全部库存
    pub async fn cancel(
        &self,
        order_id: &str,
        requester: &CurrentUser,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        validate_reason(&reason)?;

        let guard = self.locks.lock(order_id).await;
        let order = self.load_owned(order_id, requester).await?;
        if !order.status.holds_stock() {
            return Err(OrderError::InvalidState {
                status: order.status,
                operation: "cancel",
            });
        }
        let cancelled = self.cancel_and_release(&order, reason).await?;
        drop(guard);
        self.locks.prune();

        tracing::info!(order_id = %cancelled.id_string(), user_id = %requester.id, "Order cancelled");
        self.events
            .broadcast(LiveEvent::new(LiveEventKind::OrderCancelled, &cancelled));
        Ok(cancelled)
    }

    /// 条件翻转为 Cancelled；只有完成翻转的调用才归还库存
    async fn cancel_and_release(
        &self,
        order: &Order,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let id = record_of(order)?;
        match self.orders.cancel_if_live(&id, reason).await? {
            Some(cancelled) => {
                self.ledger.release_all(&cancelled.products).await;
                Ok(cancelled)
            }
            None => Err(self.invalid_state_of(&id, "cancel").await),
        }
    }

    // ========================================================================
    // Transition
    // ========================================================================

    /// 管理员设置订单状态
    ///
    /// 进入 Delivered 时发放积分 (同一事务)；进入 Cancelled 时归还库存。
    /// 已取消的订单库存已归还，不能再恢复为其它状态；已送达的订单库存已消耗，
    /// 不能重新打开为 Pending / Accepted。
    pub async fn transition(
        &self,
        order_id: &str,
        requester: &CurrentUser,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        if !requester.is_admin() {
            return Err(OrderError::Forbidden(
                "Only admins can change order status".to_string(),
            ));
        }

        let guard = self.locks.lock(order_id).await;
        let order = self.load(order_id).await?;
        let previous = order.status;

        let updated = match (previous, next) {
            (OrderStatus::Cancelled, OrderStatus::Cancelled) => order,
            (OrderStatus::Cancelled, _) => {
                return Err(OrderError::InvalidState {
                    status: previous,
                    operation: "change the status of",
                });
            }
            (OrderStatus::Delivered, to) if to.holds_stock() => {
                return Err(OrderError::InvalidState {
                    status: previous,
                    operation: "reopen",
                });
            }
            (from, OrderStatus::Cancelled) if from.holds_stock() => {
                let reason = order.cancellation_reason.clone();
                self.cancel_and_release(&order, reason).await?
            }
            _ => self.rewards.apply(&self.orders, &order, next).await?,
        };
        drop(guard);
        self.locks.prune();

        tracing::info!(
            order_id = %updated.id_string(),
            from = %previous,
            to = %updated.status,
            "Order status updated"
        );
        self.events.publish_to_user(
            &updated.user_string(),
            LiveEvent::new(LiveEventKind::OrderStatusUpdated, &updated),
        );
        Ok(updated)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// 订单详情 (所有者或管理员)
    pub async fn get(&self, order_id: &str, requester: &CurrentUser) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        if !requester.is_admin() && !requester.is_user(&order.user_string()) {
            return Err(OrderError::Forbidden("Not your order".to_string()));
        }
        Ok(order)
    }

    /// 当前用户的订单，最新的在前
    pub async fn my_orders(&self, requester: &CurrentUser) -> Result<Vec<Order>, OrderError> {
        let user = parse_record_id("user", &requester.id)?;
        Ok(self.orders.find_by_user(&user).await?)
    }

    /// 管理端分页列表
    pub async fn list(&self, query: OrderListQuery) -> Result<PaginatedResponse<Order>, OrderError> {
        let filter = OrderFilter {
            status: query.status,
            user: match &query.user {
                Some(user) => Some(parse_record_id("user", user)?),
                None => None,
            },
            from: match &query.from {
                Some(from) => Some(day_start_millis(parse_query_date("from", from)?)),
                None => None,
            },
            to: match &query.to {
                Some(to) => Some(day_end_millis(parse_query_date("to", to)?)),
                None => None,
            },
        };
        let (page, limit) = Pagination::normalize(query.page, query.limit);
        let (orders, total) = self
            .orders
            .list(&filter, Pagination::offset(page, limit), limit)
            .await?;
        Ok(PaginatedResponse::new(orders, total, page, limit))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    async fn load_owned(&self, order_id: &str, requester: &CurrentUser) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        if !requester.is_user(&order.user_string()) {
            crate::security_log!(
                "WARN",
                "order_access_denied",
                order_id = order_id,
                user_id = requester.id.as_str()
            );
            return Err(OrderError::Forbidden("Not your order".to_string()));
        }
        Ok(order)
    }

    /// 条件写入未生效时，按当前状态构造 InvalidState
    async fn invalid_state_of(&self, id: &OrderId, operation: &'static str) -> OrderError {
        match self.orders.find_by_record(id).await {
            Ok(Some(current)) => OrderError::InvalidState {
                status: current.status,
                operation,
            },
            Ok(None) => OrderError::OrderNotFound(id.to_string()),
            Err(e) => e.into(),
        }
    }
}

fn record_of(order: &Order) -> Result<OrderId, OrderError> {
    order
        .id
        .clone()
        .ok_or_else(|| OrderError::OrderNotFound(order.id_string()))
}

fn parse_query_date(field: &str, value: &str) -> Result<chrono::NaiveDate, OrderError> {
    parse_date(value)
        .ok_or_else(|| OrderError::Validation(format!("{} must be YYYY-MM-DD ({})", field, value)))
}
