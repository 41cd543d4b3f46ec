//! Shared types for the Pourline order system
//!
//! Wire-level types used by the order server and its clients (customer app,
//! admin dashboard): error codes, response envelopes, order/product/user
//! DTOs and the realtime message protocol.

pub mod error;
pub mod message;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{ClientCommand, LiveEvent, LiveEventKind};
pub use response::{PaginatedResponse, Pagination};
