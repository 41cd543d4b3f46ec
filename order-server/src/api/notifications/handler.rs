//! Notification API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::Notification;
use crate::db::repository::NotificationRepository;
use crate::utils::AppResult;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// GET /api/notifications - 获取通知列表 (`?unread=true` 仅未读)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let repo = NotificationRepository::new(state.db.clone());
    let notifications = repo.find_all(query.unread).await?;
    Ok(Json(notifications))
}

/// PUT /api/notifications/{id}/read - 标记已读
pub async fn mark_read(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    let repo = NotificationRepository::new(state.db.clone());
    let notification = repo.mark_read(&id).await?;
    Ok(Json(notification))
}

/// PUT /api/notifications/read-all - 全部标记已读
pub async fn mark_all_read(
    State(state): State<ServerState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let repo = NotificationRepository::new(state.db.clone());
    let updated = repo.mark_all_read().await?;
    tracing::debug!(updated, "Notifications marked as read");
    Ok(Json(MarkAllReadResponse { updated }))
}
