use super::*;
use shared::models::{OrderListQuery, OrderPatch, OrderStatus};

// ========================================================================
// Create
// ========================================================================

#[tokio::test]
async fn test_create_reserves_stock_and_snapshots() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let latte = h.add_product("Latte", 450, 10).await;
    let mocha = h.add_product("Mocha", 525, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&latte, 2), line(&mocha, 1)]))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.customer_name, "ada name");
    assert_eq!(order.products.len(), 2);
    assert_eq!(order.products[0].name, "Latte");
    assert_eq!(order.total_price, Decimal::new(1425, 2));
    assert_eq!(h.stock(&latte).await, 8);
    assert_eq!(h.stock(&mocha).await, 9);

    // new_order 携带订单和通知
    let event = h.events.last().unwrap();
    assert_eq!(event.event, LiveEventKind::NewOrder);
    assert_eq!(event.data["order"]["id"], order.id_string());
    assert_eq!(event.data["notification"]["product_summary"], "Latte x2, Mocha x1");
    assert_eq!(event.data["notification"]["is_read"], false);
}

#[tokio::test]
async fn test_create_exhausts_stock_then_fails() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("Product A", 300, 5).await;

    h.workflow
        .create(&ada, order_input(vec![line(&a, 5)]))
        .await
        .unwrap();
    assert_eq!(h.stock(&a).await, 0);

    let err = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 1)]))
        .await
        .unwrap_err();
    match err {
        OrderError::InsufficientStock {
            product,
            available,
            requested,
        } => {
            assert_eq!(product, "Product A");
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(h.stock(&a).await, 0);
    assert_eq!(h.events.kinds(), vec![LiveEventKind::NewOrder]);
}

#[tokio::test]
async fn test_create_rolls_back_earlier_items() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 5).await;
    let b = h.add_product("B", 100, 1).await;

    let err = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 3), line(&b, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { .. }));

    assert_eq!(h.stock(&a).await, 5);
    assert_eq!(h.stock(&b).await, 1);
    assert!(h.events.kinds().is_empty());
}

#[tokio::test]
async fn test_create_unknown_product_rolls_back() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 5).await;

    let err = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 2), line("product:ghost", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductNotFound(_)));
    assert_eq!(h.stock(&a).await, 5);
}

#[tokio::test]
async fn test_create_requires_approval() {
    let h = create_harness().await;
    let pending = h.create_user("newbie", Role::Customer, false).await;
    let a = h.add_product("A", 100, 5).await;

    let err = h
        .workflow
        .create(&pending, order_input(vec![line(&a, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::UserNotApproved));
    assert_eq!(h.stock(&a).await, 5);
}

#[tokio::test]
async fn test_create_rejects_invalid_quantity() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 5).await;

    let err = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    assert_eq!(h.stock(&a).await, 5);
}

#[tokio::test]
async fn test_sum_of_decrements_equals_quantities() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 20).await;
    let b = h.add_product("B", 100, 20).await;

    let baskets = vec![
        vec![line(&a, 3), line(&b, 1)],
        vec![line(&a, 2)],
        vec![line(&b, 4), line(&a, 1), line(&b, 2)],
    ];
    let mut ordered_a = 0;
    let mut ordered_b = 0;
    for basket in baskets {
        for item in &basket {
            if item.product == a {
                ordered_a += item.quantity;
            } else {
                ordered_b += item.quantity;
            }
        }
        h.workflow.create(&ada, order_input(basket)).await.unwrap();
    }

    assert_eq!(20 - h.stock(&a).await, ordered_a);
    assert_eq!(20 - h.stock(&b).await, ordered_b);
}

#[tokio::test]
async fn test_concurrent_creates_all_succeed_with_enough_stock() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 100).await;
    let b = h.add_product("B", 100, 100).await;

    let creates = (0..20).map(|i| {
        let basket = if i % 2 == 0 {
            vec![line(&a, 2), line(&b, 1)]
        } else {
            vec![line(&b, 1), line(&a, 1)]
        };
        h.workflow.create(&ada, order_input(basket))
    });
    let results = futures::future::join_all(creates).await;

    for result in &results {
        assert!(result.is_ok(), "create failed: {:?}", result.as_ref().err());
    }
    assert_eq!(h.stock(&a).await, 100 - 30);
    assert_eq!(h.stock(&b).await, 100 - 20);
}

#[tokio::test]
async fn test_concurrent_cancels_restore_exact_stock() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 50).await;
    let b = h.add_product("B", 100, 50).await;

    let mut ids = Vec::new();
    for _ in 0..10 {
        let order = h
            .workflow
            .create(&ada, order_input(vec![line(&a, 3), line(&b, 2)]))
            .await
            .unwrap();
        ids.push(order.id_string());
    }
    assert_eq!(h.stock(&a).await, 20);
    assert_eq!(h.stock(&b).await, 30);

    let cancels = ids.iter().map(|id| h.workflow.cancel(id, &ada, None));
    let results = futures::future::join_all(cancels).await;

    for result in &results {
        assert!(result.is_ok(), "cancel failed: {:?}", result.as_ref().err());
    }
    assert_eq!(h.stock(&a).await, 50);
    assert_eq!(h.stock(&b).await, 50);
}

// ========================================================================
// Modify
// ========================================================================

#[tokio::test]
async fn test_modify_replaces_items() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;
    let b = h.add_product("B", 250, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();

    let patch = OrderPatch {
        products: Some(vec![line(&a, 1), line(&b, 2)]),
        pickup_time: Some("11:00".into()),
        ..Default::default()
    };
    let updated = h
        .workflow
        .modify(&order.id_string(), &ada, patch)
        .await
        .unwrap();

    assert_eq!(h.stock(&a).await, 9);
    assert_eq!(h.stock(&b).await, 8);
    assert_eq!(updated.total_price, Decimal::new(600, 2));
    assert_eq!(updated.pickup_time, "11:00");
    assert_eq!(updated.delivery_address, "1 Main St");
    assert!(updated.updated_at >= order.updated_at);
    assert_eq!(h.events.last().unwrap().event, LiveEventKind::OrderModified);
}

#[tokio::test]
async fn test_modify_failure_restores_old_reservation() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;
    let b = h.add_product("B", 100, 1).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    let before = (h.stock(&a).await, h.stock(&b).await);

    // 第二个新订单行库存不足
    let patch = OrderPatch {
        products: Some(vec![line(&a, 6), line(&b, 2)]),
        ..Default::default()
    };
    let err = h
        .workflow
        .modify(&order.id_string(), &ada, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { .. }));

    assert_eq!((h.stock(&a).await, h.stock(&b).await), before);
    let stored = h.orders.find_by_id(&order.id_string()).await.unwrap().unwrap();
    assert_eq!(stored.products, order.products);
    assert_eq!(h.events.kinds(), vec![LiveEventKind::NewOrder]);
}

#[tokio::test]
async fn test_failed_modify_keeps_stock_under_concurrent_creates() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let bob = h.customer("bob").await;
    let a = h.add_product("A", 100, 10).await;
    let b = h.add_product("B", 100, 0).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    let id = order.id_string();

    // 修改必然失败 (B 无库存)；同时 bob 抢购刚归还的 A
    let patch = OrderPatch {
        products: Some(vec![line(&a, 1), line(&b, 1)]),
        ..Default::default()
    };
    let modify = h.workflow.modify(&id, &ada, patch);
    let creates = futures::future::join_all(
        (0..8).map(|_| h.workflow.create(&bob, order_input(vec![line(&a, 1)]))),
    );
    let (modified, created) = tokio::join!(modify, creates);

    assert!(matches!(modified, Err(OrderError::InsufficientStock { .. })));
    let stored = h.orders.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.products, order.products);

    // 原订单的 4 件仍被占用，bob 最多买到剩下的 6 件
    let bought = created.iter().filter(|r| r.is_ok()).count() as i64;
    assert_eq!(bought, 6);
    assert_eq!(h.stock(&a).await, 0);
    assert_eq!(h.stock(&b).await, 0);
}

#[tokio::test]
async fn test_modify_by_non_owner_is_forbidden() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let bob = h.customer("bob").await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 2)]))
        .await
        .unwrap();

    let patch = OrderPatch {
        products: Some(vec![line(&a, 5)]),
        delivery_address: Some("Elsewhere".into()),
        ..Default::default()
    };
    let err = h
        .workflow
        .modify(&order.id_string(), &bob, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));

    assert_eq!(h.stock(&a).await, 8);
    let stored = h.orders.find_by_id(&order.id_string()).await.unwrap().unwrap();
    assert_eq!(stored.delivery_address, "1 Main St");
    assert_eq!(stored.products, order.products);
}

#[tokio::test]
async fn test_modify_requires_pending() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 2)]))
        .await
        .unwrap();
    h.workflow
        .transition(&order.id_string(), &admin, OrderStatus::Accepted)
        .await
        .unwrap();

    let patch = OrderPatch {
        delivery_address: Some("Elsewhere".into()),
        ..Default::default()
    };
    let err = h
        .workflow
        .modify(&order.id_string(), &ada, patch)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidState {
            status: OrderStatus::Accepted,
            ..
        }
    ));
}

// ========================================================================
// Cancel
// ========================================================================

#[tokio::test]
async fn test_cancel_restores_stock_and_stores_reason() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;
    let b = h.add_product("B", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 3), line(&b, 2)]))
        .await
        .unwrap();

    let cancelled = h
        .workflow
        .cancel(&order.id_string(), &ada, Some("Changed my mind".into()))
        .await
        .unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Changed my mind"));
    assert_eq!(h.stock(&a).await, 10);
    assert_eq!(h.stock(&b).await, 10);
    assert_eq!(h.events.last().unwrap().event, LiveEventKind::OrderCancelled);
}

#[tokio::test]
async fn test_cancel_accepted_order() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    h.workflow
        .transition(&order.id_string(), &admin, OrderStatus::Accepted)
        .await
        .unwrap();

    h.workflow
        .cancel(&order.id_string(), &ada, None)
        .await
        .unwrap();
    assert_eq!(h.stock(&a).await, 10);
}

#[tokio::test]
async fn test_cancel_twice_releases_once() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    h.workflow
        .cancel(&order.id_string(), &ada, None)
        .await
        .unwrap();

    let err = h
        .workflow
        .cancel(&order.id_string(), &ada, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidState {
            status: OrderStatus::Cancelled,
            ..
        }
    ));
    assert_eq!(h.stock(&a).await, 10);
}

#[tokio::test]
async fn test_concurrent_cancel_releases_once() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();

    let id = order.id_string();
    let (first, second) = tokio::join!(
        h.workflow.cancel(&id, &ada, None),
        h.workflow.cancel(&id, &ada, None)
    );
    assert!(first.is_ok() ^ second.is_ok());
    assert_eq!(h.stock(&a).await, 10);
}

#[tokio::test]
async fn test_cancel_by_non_owner_is_forbidden() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let bob = h.customer("bob").await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    let err = h
        .workflow
        .cancel(&order.id_string(), &bob, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    assert_eq!(h.stock(&a).await, 6);
}

#[tokio::test]
async fn test_cancel_delivered_is_invalid() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    h.workflow
        .transition(&order.id_string(), &admin, OrderStatus::Delivered)
        .await
        .unwrap();

    let err = h
        .workflow
        .cancel(&order.id_string(), &ada, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidState { .. }));
    assert_eq!(h.stock(&a).await, 6);
}

// ========================================================================
// Transition + rewards
// ========================================================================

#[tokio::test]
async fn test_delivered_awards_points_once() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 1)]))
        .await
        .unwrap();

    let delivered = h
        .workflow
        .transition(&order.id_string(), &admin, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(delivered.reward_points_earned, 10);
    assert_eq!(h.reward_points(&ada).await, 10);

    // 重复设置 Delivered 不再发放
    let again = h
        .workflow
        .transition(&order.id_string(), &admin, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(again.reward_points_earned, 10);
    assert_eq!(h.reward_points(&ada).await, 10);
}

#[tokio::test]
async fn test_delivered_cannot_reopen() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 4)]))
        .await
        .unwrap();
    let id = order.id_string();
    h.workflow
        .transition(&id, &admin, OrderStatus::Accepted)
        .await
        .unwrap();
    h.workflow
        .transition(&id, &admin, OrderStatus::Delivered)
        .await
        .unwrap();

    for status in [OrderStatus::Pending, OrderStatus::Accepted] {
        let err = h.workflow.transition(&id, &admin, status).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidState {
                status: OrderStatus::Delivered,
                operation: "reopen"
            }
        ));
    }

    // 仍为 Delivered，取消不会把已消耗的库存再归还一次
    let err = h.workflow.cancel(&id, &ada, None).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidState { .. }));
    assert_eq!(h.stock(&a).await, 6);

    let stored = h.orders.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
    h.workflow
        .transition(&id, &admin, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(h.reward_points(&ada).await, 10);
}

#[tokio::test]
async fn test_status_event_scoped_to_owner() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 1)]))
        .await
        .unwrap();
    h.workflow
        .transition(&order.id_string(), &admin, OrderStatus::Accepted)
        .await
        .unwrap();

    assert_eq!(
        h.events.scoped_to(LiveEventKind::OrderStatusUpdated),
        vec![Some(ada.id.clone())]
    );
    assert_eq!(h.reward_points(&ada).await, 0);
}

#[tokio::test]
async fn test_transition_requires_admin() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 1)]))
        .await
        .unwrap();
    let err = h
        .workflow
        .transition(&order.id_string(), &ada, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Forbidden(_)));
    assert_eq!(h.reward_points(&ada).await, 0);
}

#[tokio::test]
async fn test_admin_cancel_releases_and_cannot_reopen() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 3)]))
        .await
        .unwrap();
    let id = order.id_string();

    h.workflow
        .transition(&id, &admin, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(h.stock(&a).await, 10);

    // 同状态重复设置不会再次归还
    h.workflow
        .transition(&id, &admin, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(h.stock(&a).await, 10);

    let err = h
        .workflow
        .transition(&id, &admin, OrderStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidState { .. }));
}

#[tokio::test]
async fn test_transition_unknown_order() {
    let h = create_harness().await;
    let admin = h.admin().await;
    let err = h
        .workflow
        .transition("order:missing", &admin, OrderStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));
}

// ========================================================================
// Queries
// ========================================================================

#[tokio::test]
async fn test_get_owner_or_admin() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let bob = h.customer("bob").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 10).await;

    let order = h
        .workflow
        .create(&ada, order_input(vec![line(&a, 1)]))
        .await
        .unwrap();
    let id = order.id_string();

    assert!(h.workflow.get(&id, &ada).await.is_ok());
    assert!(h.workflow.get(&id, &admin).await.is_ok());
    assert!(matches!(
        h.workflow.get(&id, &bob).await,
        Err(OrderError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_my_orders_and_list() {
    let h = create_harness().await;
    let ada = h.customer("ada").await;
    let bob = h.customer("bob").await;
    let admin = h.admin().await;
    let a = h.add_product("A", 100, 50).await;

    for _ in 0..3 {
        h.workflow
            .create(&ada, order_input(vec![line(&a, 1)]))
            .await
            .unwrap();
    }
    let bobs = h
        .workflow
        .create(&bob, order_input(vec![line(&a, 1)]))
        .await
        .unwrap();
    h.workflow
        .transition(&bobs.id_string(), &admin, OrderStatus::Accepted)
        .await
        .unwrap();

    let mine = h.workflow.my_orders(&ada).await.unwrap();
    assert_eq!(mine.len(), 3);
    assert!(mine.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let page = h
        .workflow
        .list(OrderListQuery {
            page: Some(2),
            limit: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 4);
    assert_eq!(page.pagination.pages, 2);
    assert_eq!(page.data.len(), 1);

    let accepted = h
        .workflow
        .list(OrderListQuery {
            status: Some(OrderStatus::Accepted),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(accepted.pagination.total, 1);
    assert_eq!(accepted.data[0].id_string(), bobs.id_string());

    let err = h
        .workflow
        .list(OrderListQuery {
            from: Some("yesterday".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
}
