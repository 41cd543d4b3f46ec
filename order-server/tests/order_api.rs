//! HTTP 端到端测试: 注册 → 审核 → 上架 → 下单 → 取消 / 送达

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use order_server::auth::password::hash_password;
use order_server::db::DbService;
use order_server::db::repository::UserRepository;
use order_server::db::repository::user::NewUser;
use order_server::{Config, ServerState, core::build_app};
use serde_json::{Value, json};
use shared::models::Role;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    _dir: tempfile::TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
        let db = DbService::memory().await.unwrap().db;
        let state = ServerState::with_db(config, db.clone());

        let hash_pass = hash_password("admin-pass").unwrap();
        UserRepository::new(db)
            .create(NewUser {
                username: "admin".into(),
                hash_pass,
                name: "Admin".into(),
                mobile: String::new(),
                role: Role::Admin,
                approved: true,
            })
            .await
            .unwrap();

        Self {
            app: build_app(state),
            _dir: dir,
        }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// 注册并由管理员审核，返回 (user_id, token)
    async fn approved_customer(&self, admin: &str, username: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "password": "secret-pass",
                    "name": format!("{username} name"),
                    "mobile": "0400000000"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let user_id = body["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .call(
                Method::PUT,
                &format!("/api/users/{user_id}/approval"),
                Some(admin),
                Some(json!({ "approved": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let token = self.login(username, "secret-pass").await;
        (user_id, token)
    }

    async fn add_product(&self, admin: &str, name: &str, price: f64, stock: i64) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/products",
                Some(admin),
                Some(json!({ "name": name, "price": price, "stock": stock })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn stock(&self, token: &str, product: &str) -> i64 {
        let (_, body) = self
            .call(Method::GET, &format!("/api/products/{product}"), Some(token), None)
            .await;
        body["stock"].as_i64().unwrap()
    }
}

fn order_body(product: &str, quantity: i64) -> Value {
    json!({
        "products": [{ "product": product, "quantity": quantity }],
        "delivery_address": "1 Main St",
        "pickup_date": "2024-05-01",
        "pickup_time": "09:30"
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/orders/my-orders", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unapproved_customer_cannot_order() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 5).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "pending",
                "password": "secret-pass",
                "name": "Pending",
                "mobile": "0400000000"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = app.login("pending", "secret-pass").await;

    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(&token), Some(order_body(&latte, 1)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 1008);
    assert_eq!(app.stock(&admin, &latte).await, 5);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = TestApp::new().await;
    let body = json!({
        "username": "admin",
        "password": "secret-pass",
        "name": "Someone",
        "mobile": "0400000000"
    });
    let (status, body) = app
        .call(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 8002);
}

#[tokio::test]
async fn test_customer_cannot_manage_products() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/products",
            Some(&alice),
            Some(json!({ "name": "Mocha", "price": 5.0, "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, "/api/products", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_order_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (alice_id, alice) = app.approved_customer(&admin, "alice").await;
    let (_, bob) = app.approved_customer(&admin, "bob").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 5).await;

    // 下单: 201 + 库存扣减
    let (status, order) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 2)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "create order failed: {order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_price"].as_f64().unwrap(), 9.0);
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock(&admin, &latte).await, 3);

    // 库存不足
    let (status, body) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 4)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 6003);
    assert_eq!(
        body["message"],
        "Insufficient stock for Latte: available 3, requested 4"
    );
    assert_eq!(app.stock(&admin, &latte).await, 3);

    // 管理员收到新订单通知
    let (status, notifications) = app
        .call(Method::GET, "/api/notifications?unread=true", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["customer_name"], "alice name");

    // 非所有者不能修改
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(&bob),
            Some(json!({ "delivery_address": "Elsewhere" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 顾客不能通过修改接口改状态
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(&alice),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert!(status.is_client_error());

    // 所有者修改数量
    let (status, modified) = app
        .call(
            Method::PUT,
            &format!("/api/orders/{order_id}"),
            Some(&alice),
            Some(json!({ "products": [{ "product": latte, "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "modify failed: {modified}");
    assert_eq!(app.stock(&admin, &latte).await, 4);

    // 管理员送达 → 积分 10
    let (status, delivered) = app
        .call(
            Method::PATCH,
            &format!("/api/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "transition failed: {delivered}");
    assert_eq!(delivered["reward_points_earned"], 10);

    let (_, me) = app.call(Method::GET, "/api/auth/me", Some(&alice), None).await;
    assert_eq!(me["id"], alice_id.as_str());
    assert_eq!(me["reward_points"], 10);

    // 已送达订单不能取消
    let (status, body) = app
        .call(Method::DELETE, &format!("/api/orders/{order_id}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4008);
}

#[tokio::test]
async fn test_cancel_restores_stock() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 5).await;

    let (_, order) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 3)))
        .await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(app.stock(&admin, &latte).await, 2);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/orders/{order_id}"),
            Some(&alice),
            Some(json!({ "reason": "changed my mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "cancel failed: {body}");
    assert_eq!(body["order"]["status"], "cancelled");
    assert_eq!(body["order"]["cancellation_reason"], "changed my mind");
    assert_eq!(app.stock(&admin, &latte).await, 5);

    // 再次取消不会重复归还
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/orders/{order_id}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock(&admin, &latte).await, 5);
}

#[tokio::test]
async fn test_admin_order_listing() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 10).await;

    for _ in 0..3 {
        let (status, _) = app
            .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 1)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app
        .call(Method::GET, "/api/orders?page=1&limit=2", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["pagination"]["total"], 3);

    let (status, _) = app.call(Method::GET, "/api/orders", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, mine) = app
        .call(Method::GET, "/api/orders/my-orders", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/auth/password",
            Some(&alice),
            Some(json!({ "current_password": "wrong", "new_password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/auth/password",
            Some(&alice),
            Some(json!({ "current_password": "secret-pass", "new_password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("alice", "new-secret").await;
}

#[tokio::test]
async fn test_concurrent_orders_all_succeed() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 100).await;

    let body = order_body(&latte, 3);
    let requests =
        (0..10).map(|_| app.call(Method::POST, "/api/orders", Some(&alice), Some(body.clone())));
    let responses = futures::future::join_all(requests).await;

    for (status, body) in &responses {
        assert_eq!(*status, StatusCode::CREATED, "create order failed: {body}");
    }
    assert_eq!(app.stock(&admin, &latte).await, 70);
}

#[tokio::test]
async fn test_admin_restock() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin-pass").await;
    let (_, alice) = app.approved_customer(&admin, "alice").await;
    let latte = app.add_product(&admin, "Latte", 4.5, 1).await;

    let (status, _) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 1)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.stock(&admin, &latte).await, 0);

    let (status, product) = app
        .call(
            Method::PUT,
            &format!("/api/products/{latte}"),
            Some(&admin),
            Some(json!({ "stock": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "restock failed: {product}");
    assert_eq!(product["stock"], 5);
    assert_eq!(product["name"], "Latte");

    let (status, _) = app
        .call(Method::POST, "/api/orders", Some(&alice), Some(order_body(&latte, 5)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.stock(&admin, &latte).await, 0);

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/products/order:latte",
            Some(&admin),
            Some(json!({ "stock": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
