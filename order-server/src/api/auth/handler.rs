//! Auth API Handlers

use axum::{Json, extract::State, http::StatusCode};

use crate::auth::CurrentUser;
use crate::auth::password::hash_password;
use crate::core::ServerState;
use crate::db::repository::user::NewUser;
use crate::db::repository::{RepoError, UserRepository};
use crate::live::EventPublisher;
use crate::security_log;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_password, validate_required_text,
};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{LoginRequest, LoginResponse, PasswordChange, RegisterRequest, Role, UserInfo};
use shared::{LiveEvent, LiveEventKind};

/// POST /api/auth/register - 顾客注册 (需管理员审核后才能下单)
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    validate_required_text(&payload.username, "username", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.mobile, "mobile", MAX_SHORT_TEXT_LEN)?;
    validate_password(&payload.password)?;

    let hash_pass = hash_password(&payload.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .create(NewUser {
            username: payload.username.trim().to_string(),
            hash_pass,
            name: payload.name,
            mobile: payload.mobile,
            role: Role::Customer,
            approved: false,
        })
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::UsernameExists, msg),
            other => other.into(),
        })?;

    let info = user.to_info();
    tracing::info!(user_id = %info.id, username = %info.username, "User registered");
    state
        .publisher()
        .broadcast(LiveEvent::new(LiveEventKind::UserRegistered, &info));

    Ok((StatusCode::CREATED, Json(info)))
}

/// POST /api/auth/login - 登录并获取 JWT
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_username(payload.username.trim()).await?;

    // 用户不存在与密码错误返回相同错误
    let Some(user) = user else {
        security_log!("WARN", "login_failed", username = payload.username.as_str());
        return Err(AppError::invalid_credentials());
    };

    let valid = user
        .verify_password(&payload.password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
    if !valid {
        security_log!("WARN", "login_failed", username = payload.username.as_str());
        return Err(AppError::invalid_credentials());
    }

    let token = state
        .get_jwt_service()
        .generate_token(&user.id_string(), &user.username, user.role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(user_id = %user.id_string(), "User logged in");
    Ok(Json(LoginResponse {
        token,
        user: user.to_info(),
    }))
}

/// GET /api/auth/me - 当前用户信息
pub async fn me(State(state): State<ServerState>, current_user: CurrentUser) -> AppResult<Json<UserInfo>> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&current_user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(user.to_info()))
}

/// PUT /api/auth/password - 修改自己的密码
///
/// 校验当前密码后对新密码做一次哈希。
pub async fn change_password(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<PasswordChange>,
) -> AppResult<Json<ApiResponse<()>>> {
    validate_password(&payload.new_password)?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo
        .find_by_id(&current_user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    let valid = user
        .verify_password(&payload.current_password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
    if !valid {
        security_log!("WARN", "password_change_failed", user_id = current_user.id.as_str());
        return Err(AppError::invalid_credentials());
    }

    let hash_pass = hash_password(&payload.new_password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    repo.update_password(&user_id, hash_pass).await?;

    security_log!("INFO", "password_changed", user_id = current_user.id.as_str());
    Ok(Json(ApiResponse::ok()))
}
