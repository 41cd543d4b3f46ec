use crate::db::repository::RepoError;
use shared::models::OrderStatus;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Workflow errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User is not approved to place orders")]
    UserNotApproved,

    #[error("Cannot {operation} an order in status '{status}'")]
    InvalidState {
        status: OrderStatus,
        operation: &'static str,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    /// 共享校验函数返回的错误，保留原始错误码与详情
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InsufficientStock {
                product,
                available,
                requested,
            } => AppError::insufficient_stock(&product, available, requested),
            OrderError::ProductNotFound(id) => {
                AppError::with_message(ErrorCode::ProductNotFound, format!("Product {} not found", id))
                    .with_detail("product", id)
            }
            OrderError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {} not found", id))
            }
            OrderError::UserNotFound(id) => {
                AppError::with_message(ErrorCode::UserNotFound, format!("User {} not found", id))
            }
            OrderError::Forbidden(msg) => AppError::forbidden(msg),
            OrderError::UserNotApproved => AppError::user_not_approved(),
            OrderError::InvalidState { status, operation } => {
                AppError::invalid_state(status.as_str(), operation)
            }
            OrderError::Validation(msg) => AppError::validation(msg),
            OrderError::Repo(e) => e.into(),
            OrderError::App(e) => e,
        }
    }
}
