//! User API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::UserRepository;
use crate::security_log;
use crate::utils::AppResult;
use shared::models::{ApprovalUpdate, UserInfo};

/// GET /api/users - 获取所有用户 (不含密码哈希)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<UserInfo>>> {
    let repo = UserRepository::new(state.db.clone());
    let users = repo.find_all().await?;
    Ok(Json(users.iter().map(|u| u.to_info()).collect()))
}

/// PUT /api/users/{id}/approval - 审核顾客账号
pub async fn set_approval(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ApprovalUpdate>,
) -> AppResult<Json<UserInfo>> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo.set_approved(&id, payload.approved).await?;

    security_log!(
        "INFO",
        "user_approval_changed",
        admin_id = current_user.id.as_str(),
        user_id = id.as_str(),
        approved = payload.approved
    );
    Ok(Json(user.to_info()))
}
