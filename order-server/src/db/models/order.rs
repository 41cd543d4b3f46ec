//! Order Model

use super::serde_helpers;
use super::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::OrderStatus;
use surrealdb::RecordId;

/// Order ID type
pub type OrderId = RecordId;

/// 订单行 (下单时快照商品名称和单价)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(with = "serde_helpers::record_id")]
    pub product: RecordId,
    pub name: String,
    /// 折扣后单价快照
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i64,
}

impl LineItem {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Order model matching SurrealDB schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<OrderId>,
    #[serde(with = "serde_helpers::record_id")]
    pub user: UserId,
    /// 下单时的顾客姓名快照
    pub customer_name: String,
    pub customer_mobile: String,
    pub products: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub delivery_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub reward_points_earned: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }

    pub fn user_string(&self) -> String {
        self.user.to_string()
    }

    /// 所有订单行小计之和
    pub fn compute_total(items: &[LineItem]) -> Decimal {
        items.iter().map(LineItem::subtotal).sum()
    }

    /// "Latte x2, Mocha x1"
    pub fn product_summary(items: &[LineItem]) -> String {
        items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, name: &str, price: Decimal, quantity: i64) -> LineItem {
        LineItem {
            product: RecordId::from_table_key("product", key),
            name: name.to_string(),
            price,
            quantity,
        }
    }

    #[test]
    fn test_compute_total() {
        let items = vec![
            item("latte", "Latte", Decimal::new(450, 2), 2),
            item("mocha", "Mocha", Decimal::new(525, 2), 1),
        ];
        assert_eq!(Order::compute_total(&items), Decimal::new(1425, 2));
        assert_eq!(Order::compute_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_product_summary() {
        let items = vec![
            item("latte", "Latte", Decimal::ONE, 2),
            item("mocha", "Mocha", Decimal::ONE, 1),
        ];
        assert_eq!(Order::product_summary(&items), "Latte x2, Mocha x1");
    }

    #[test]
    fn test_line_item_wire_format() {
        let json = serde_json::to_value(item("latte", "Latte", Decimal::new(450, 2), 2)).unwrap();
        assert_eq!(json["product"], "product:latte");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["price"], 4.5);
    }
}
