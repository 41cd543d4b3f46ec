//! Order API 模块
//!
//! | 路径 | 方法 | 说明 | 权限 |
//! |------|------|------|------|
//! | /api/orders | POST | 下单 | 已审核顾客 |
//! | /api/orders | GET | 订单列表 (分页、筛选) | 管理员 |
//! | /api/orders/my-orders | GET | 我的订单 | 登录用户 |
//! | /api/orders/{id} | GET | 订单详情 | 所有者 / 管理员 |
//! | /api/orders/{id} | PUT | 修改 Pending 订单 | 所有者 |
//! | /api/orders/{id} | DELETE | 取消订单 | 所有者 |
//! | /api/orders/{id}/status | PATCH | 设置状态 | 管理员 |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    let customer_routes = Router::new()
        .route("/", post(handler::create))
        .route("/my-orders", get(handler::my_orders))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::modify)
                .delete(handler::cancel),
        );

    let manage_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}/status", patch(handler::update_status))
        .layer(middleware::from_fn(require_admin));

    customer_routes.merge(manage_routes)
}
