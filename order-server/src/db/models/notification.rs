//! Notification Model (admin-facing)

use super::serde_helpers;
use super::OrderId;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Notification ID type
pub type NotificationId = RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<NotificationId>,
    #[serde(rename = "order", alias = "order_id", with = "serde_helpers::record_id")]
    pub order_id: OrderId,
    pub customer_name: String,
    pub product_summary: String,
    #[serde(default, deserialize_with = "serde_helpers::bool_false")]
    pub is_read: bool,
    pub created_at: i64,
}
