//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::core::ServerState;
use crate::db::models::Product;
use crate::db::repository::{ProductRepository, parse_record_id};
use crate::live::EventPublisher;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_discount, validate_optional_text,
    validate_price, validate_required_text, validate_stock,
};
use crate::utils::{AppError, AppResult, ErrorCode};
use shared::models::{ProductCreate, ProductUpdate};
use shared::{LiveEvent, LiveEventKind};

/// GET /api/products - 获取所有商品
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let repo = ProductRepository::new(state.db.clone());
    let products = repo.find_all().await?;
    Ok(Json(products))
}

/// GET /api/products/{id} - 获取单个商品
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let repo = ProductRepository::new(state.db.clone());
    let product = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::ProductNotFound, format!("Product {} not found", id)))?;
    Ok(Json(product))
}

/// POST /api/products - 创建商品
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<(StatusCode, Json<Product>)> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.size, "size", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.category, "category", MAX_SHORT_TEXT_LEN)?;
    validate_price(payload.price)?;
    validate_discount(payload.discount)?;
    validate_stock(payload.stock)?;

    let repo = ProductRepository::new(state.db.clone());
    let product = repo.create(payload).await?;

    tracing::info!(product_id = %product.id_string(), name = %product.name, "Product created");
    state
        .publisher()
        .broadcast(LiveEvent::new(LiveEventKind::ProductAdded, &product));

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id} - 更新商品 (仅写入提供的字段)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    if payload.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.size, "size", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.category, "category", MAX_SHORT_TEXT_LEN)?;
    if let Some(price) = payload.price {
        validate_price(price)?;
    }
    if let Some(discount) = payload.discount {
        validate_discount(discount)?;
    }
    if let Some(stock) = payload.stock {
        validate_stock(stock)?;
    }

    // 直接设置库存时锁定该商品，避免与进行中的预留 / 归还交错
    let record = parse_record_id("product", &id)?;
    let ledger = state.workflow.ledger();
    let stock = ledger.lock_products([&record]).await;
    let repo = ProductRepository::new(state.db.clone());
    let updated = repo.update(&id, payload).await;
    ledger.unlock(stock);
    let product = updated?;

    tracing::info!(product_id = %product.id_string(), "Product updated");
    state
        .publisher()
        .broadcast(LiveEvent::new(LiveEventKind::ProductUpdated, &product));

    Ok(Json(product))
}

/// DELETE /api/products/{id} - 删除商品
///
/// 已下单订单中的商品快照不受影响。
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    let repo = ProductRepository::new(state.db.clone());
    let deleted = repo.delete(&id).await?;
    if !deleted {
        return Err(AppError::with_message(
            ErrorCode::ProductNotFound,
            format!("Product {} not found", id),
        ));
    }

    tracing::info!(product_id = %id, "Product deleted");
    state.publisher().broadcast(LiveEvent::new(
        LiveEventKind::ProductDeleted,
        serde_json::json!({ "id": id }),
    ));

    Ok(Json(true))
}
