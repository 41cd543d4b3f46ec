//! Database Models

// Serde helpers
pub mod serde_helpers;

pub mod notification;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use notification::{Notification, NotificationId};
pub use order::{LineItem, Order, OrderId};
pub use product::{Product, ProductId};
pub use user::{User, UserId};
