//! Order Repository
//!
//! 订单的持久化。状态相关的写入都带条件 (`WHERE status ...`)，
//! 返回 `None` 表示条件未满足，由调用方决定如何报错。

use super::{BaseRepository, RepoError, RepoResult, parse_record_id, retry_on_conflict};
use crate::db::models::{LineItem, Order, OrderId, UserId};
use serde::Deserialize;
use shared::models::OrderStatus;
use shared::util::{money_to_f64, now_millis};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// 新订单 (状态固定为 Pending)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user: UserId,
    pub customer_name: String,
    pub customer_mobile: String,
    pub products: Vec<LineItem>,
    pub delivery_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
}

/// 订单详情修改 (只写入存在的字段)
#[derive(Debug, Clone, Default)]
pub struct OrderDetails {
    pub products: Option<Vec<LineItem>>,
    pub delivery_address: Option<String>,
    pub pickup_date: Option<String>,
    pub pickup_time: Option<String>,
}

/// 管理端列表筛选
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user: Option<UserId>,
    /// created_at >= from (millis)
    pub from: Option<i64>,
    /// created_at <= to (millis)
    pub to: Option<i64>,
}

impl OrderFilter {
    fn where_clause(&self) -> String {
        let mut conditions = Vec::new();
        if self.status.is_some() {
            conditions.push("status = $status");
        }
        if self.user.is_some() {
            conditions.push("user = $user");
        }
        if self.from.is_some() {
            conditions.push("created_at >= $from");
        }
        if self.to.is_some() {
            conditions.push("created_at <= $to");
        }
        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new Pending order
    pub async fn create(&self, order: NewOrder) -> RepoResult<Order> {
        let total = Order::compute_total(&order.products);
        let now = now_millis();
        retry_on_conflict("order.create", || {
            let order = order.clone();
            async move {
                let mut result = self
                    .base
                    .db()
                    .query(
                        r#"CREATE order SET
                            user = $user,
                            customer_name = $customer_name,
                            customer_mobile = $customer_mobile,
                            products = $products,
                            total_price = $total_price,
                            delivery_address = $delivery_address,
                            pickup_date = $pickup_date,
                            pickup_time = $pickup_time,
                            status = $status,
                            cancellation_reason = NONE,
                            reward_points_earned = 0,
                            created_at = $now,
                            updated_at = $now
                        RETURN AFTER"#,
                    )
                    .bind(("user", order.user))
                    .bind(("customer_name", order.customer_name))
                    .bind(("customer_mobile", order.customer_mobile))
                    .bind(("products", order.products))
                    .bind(("total_price", money_to_f64(total)))
                    .bind(("delivery_address", order.delivery_address))
                    .bind(("pickup_date", order.pickup_date))
                    .bind(("pickup_time", order.pickup_time))
                    .bind(("status", OrderStatus::Pending.as_str()))
                    .bind(("now", now))
                    .await?;

                let created: Option<Order> = result.take(0)?;
                created.ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
            }
        })
        .await
    }

    /// Find order by "order:xxx" id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let thing = parse_record_id("order", id)?;
        self.find_by_record(&thing).await
    }

    pub async fn find_by_record(&self, id: &OrderId) -> RepoResult<Option<Order>> {
        let order: Option<Order> = self.base.db().select(id.clone()).await?;
        Ok(order)
    }

    /// 用户自己的订单，最新的在前
    pub async fn find_by_user(&self, user: &UserId) -> RepoResult<Vec<Order>> {
        let orders: Vec<Order> = self
            .base
            .db()
            .query("SELECT * FROM order WHERE user = $user ORDER BY created_at DESC")
            .bind(("user", user.clone()))
            .await?
            .take(0)?;
        Ok(orders)
    }

    /// 分页查询，返回 (当前页, 总数)
    pub async fn list(
        &self,
        filter: &OrderFilter,
        offset: u64,
        limit: u32,
    ) -> RepoResult<(Vec<Order>, u64)> {
        let where_clause = filter.where_clause();
        let sql = format!(
            "SELECT count() FROM order{where_clause} GROUP ALL; \
             SELECT * FROM order{where_clause} ORDER BY created_at DESC LIMIT $limit START $start;"
        );

        let mut result = self
            .base
            .db()
            .query(sql)
            .bind(("status", filter.status.map(|s| s.as_str())))
            .bind(("user", filter.user.clone()))
            .bind(("from", filter.from))
            .bind(("to", filter.to))
            .bind(("limit", limit))
            .bind(("start", offset))
            .await?;

        let count: Option<CountRow> = result.take(0)?;
        let orders: Vec<Order> = result.take(1)?;
        Ok((orders, count.map(|c| c.count).unwrap_or(0)))
    }

    /// 修改订单详情，仅当订单仍为 Pending
    pub async fn update_details(
        &self,
        id: &OrderId,
        details: OrderDetails,
    ) -> RepoResult<Option<Order>> {
        let mut patch = serde_json::Map::new();
        if let Some(products) = details.products {
            let total = Order::compute_total(&products);
            patch.insert("products".into(), to_json(&products)?);
            patch.insert("total_price".into(), money_to_f64(total).into());
        }
        if let Some(address) = details.delivery_address {
            patch.insert("delivery_address".into(), address.into());
        }
        if let Some(date) = details.pickup_date {
            patch.insert("pickup_date".into(), date.into());
        }
        if let Some(time) = details.pickup_time {
            patch.insert("pickup_time".into(), time.into());
        }
        patch.insert("updated_at".into(), now_millis().into());

        let patch = serde_json::Value::Object(patch);
        retry_on_conflict("order.update_details", || {
            let patch = patch.clone();
            async move {
                let mut result = self
                    .base
                    .db()
                    .query("UPDATE $order MERGE $patch WHERE status = 'pending' RETURN AFTER")
                    .bind(("order", id.clone()))
                    .bind(("patch", patch))
                    .await?;
                let updated: Vec<Order> = result.take(0)?;
                Ok(updated.into_iter().next())
            }
        })
        .await
    }

    /// 条件取消: 仅当订单仍占用库存 (pending / accepted) 时改为 cancelled
    ///
    /// 返回 `Some` 表示本次调用完成了状态翻转，调用方负责归还库存。
    pub async fn cancel_if_live(
        &self,
        id: &OrderId,
        reason: Option<String>,
    ) -> RepoResult<Option<Order>> {
        retry_on_conflict("order.cancel", || {
            let reason = reason.clone();
            async move {
                let mut result = self
                    .base
                    .db()
                    .query(
                        "UPDATE $order SET status = 'cancelled', cancellation_reason = $reason, \
                         updated_at = $now WHERE status IN ['pending', 'accepted'] RETURN AFTER",
                    )
                    .bind(("order", id.clone()))
                    .bind(("reason", reason))
                    .bind(("now", now_millis()))
                    .await?;
                let updated: Vec<Order> = result.take(0)?;
                Ok(updated.into_iter().next())
            }
        })
        .await
    }

    /// 写入新状态；`award_points > 0` 时在同一事务内发放积分
    ///
    /// 积分只在状态真正改变且订单尚未获得积分时发放，重复调用不会重复累计。
    pub async fn update_status(
        &self,
        id: &OrderId,
        user: &UserId,
        status: OrderStatus,
        award_points: i64,
    ) -> RepoResult<Option<Order>> {
        retry_on_conflict("order.update_status", || async move {
            self.base
                .db()
                .query(
                    r#"BEGIN TRANSACTION;
                    LET $current = (SELECT status, reward_points_earned FROM ONLY $order);
                    UPDATE $order SET status = $status, updated_at = $now;
                    IF $current AND $points > 0 AND $current.status != $status AND $current.reward_points_earned = 0 {
                        UPDATE $user SET reward_points += $points;
                        UPDATE $order SET reward_points_earned = $points;
                    };
                    COMMIT TRANSACTION;"#,
                )
                .bind(("order", id.clone()))
                .bind(("user", user.clone()))
                .bind(("status", status.as_str()))
                .bind(("points", award_points))
                .bind(("now", now_millis()))
                .await?
                .check()?;
            Ok(())
        })
        .await?;

        self.find_by_record(id).await
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> RepoResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RepoError::Database(e.to_string()))
}
