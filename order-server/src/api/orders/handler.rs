//! Order API Handlers
//!
//! 业务规则在 [`OrderWorkflow`](crate::orders::OrderWorkflow) 中，这里只做提取与响应转换。

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::Order;
use crate::utils::{AppError, AppResult};
use shared::PaginatedResponse;
use shared::models::{CancelRequest, OrderCreate, OrderListQuery, OrderPatch, StatusUpdate};

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub order: Order,
}

/// POST /api/orders - 下单并预留库存
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<OrderCreate>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.workflow.create(&current_user, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders - 订单列表 (管理员)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    let page = state.workflow.list(query).await?;
    Ok(Json(page))
}

/// GET /api/orders/my-orders - 当前用户的订单
pub async fn my_orders(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.workflow.my_orders(&current_user).await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id} - 订单详情
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.workflow.get(&id, &current_user).await?;
    Ok(Json(order))
}

/// PUT /api/orders/{id} - 修改 Pending 订单
pub async fn modify(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<OrderPatch>,
) -> AppResult<Json<Order>> {
    let order = state.workflow.modify(&id, &current_user, payload).await?;
    Ok(Json(order))
}

/// DELETE /api/orders/{id} - 取消订单并归还库存
///
/// 请求体可选: `{"reason": "..."}`
pub async fn cancel(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<CancelResponse>> {
    let reason = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<CancelRequest>(&body)
            .map_err(|e| AppError::invalid_request(format!("Invalid cancel body: {}", e)))?
            .reason
    };

    let order = state.workflow.cancel(&id, &current_user, reason).await?;
    Ok(Json(CancelResponse {
        message: "Order cancelled".to_string(),
        order,
    }))
}

/// PATCH /api/orders/{id}/status - 设置订单状态 (管理员)
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<Order>> {
    let order = state
        .workflow
        .transition(&id, &current_user, payload.status)
        .await?;
    Ok(Json(order))
}
