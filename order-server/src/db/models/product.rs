//! Product Model

use super::serde_helpers;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::discounted_price;
use surrealdb::RecordId;

/// Product ID type
pub type ProductId = RecordId;

/// Product model matching SurrealDB schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Discount percentage (0-100)
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    /// 可用库存 (非负)
    pub stock: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Product {
    /// 下单时快照的单价 (已折扣)
    pub fn effective_price(&self) -> Decimal {
        discounted_price(self.price, self.discount)
    }

    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}
