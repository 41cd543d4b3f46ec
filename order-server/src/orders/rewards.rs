//! Reward Accrual
//!
//! 订单进入 Delivered 时为下单用户累计固定积分，并把发放的积分记录在订单上。
//! 状态写入与积分发放在同一个数据库事务内提交。

use super::error::OrderError;
use crate::db::models::Order;
use crate::db::repository::OrderRepository;
use shared::models::OrderStatus;

pub const DEFAULT_POINTS_PER_ORDER: i64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct RewardAccrual {
    points: i64,
}

impl Default for RewardAccrual {
    fn default() -> Self {
        Self::new(DEFAULT_POINTS_PER_ORDER)
    }
}

impl RewardAccrual {
    pub fn new(points: i64) -> Self {
        Self {
            points: points.max(0),
        }
    }

    pub fn points(&self) -> i64 {
        self.points
    }

    /// 本次状态变更应发放的积分
    ///
    /// 只有从非 Delivered 进入 Delivered 且订单尚未获得积分时才发放。
    pub fn points_for(&self, order: &Order, next: OrderStatus) -> i64 {
        if next == OrderStatus::Delivered
            && order.status != OrderStatus::Delivered
            && order.reward_points_earned == 0
        {
            self.points
        } else {
            0
        }
    }

    /// 写入新状态，必要时在同一事务内发放积分
    pub async fn apply(
        &self,
        orders: &OrderRepository,
        order: &Order,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let id = order
            .id
            .as_ref()
            .ok_or_else(|| OrderError::OrderNotFound(order.id_string()))?;
        let points = self.points_for(order, next);

        let updated = orders
            .update_status(id, &order.user, next, points)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order.id_string()))?;

        if updated.reward_points_earned > 0 && order.reward_points_earned == 0 {
            tracing::info!(
                order_id = %id,
                user_id = %order.user,
                points = updated.reward_points_earned,
                "Reward points awarded"
            );
        }
        Ok(updated)
    }
}
