//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Unit price in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Discount percentage (0-100)
    #[serde(default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(default)]
    pub stock: i64,
    /// Size classification (small / medium / large ...)
    #[serde(default)]
    pub size: Option<String>,
    /// Type classification (coffee / tea / juice ...)
    #[serde(default)]
    pub category: Option<String>,
}

/// Update product payload (only present fields are written)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub discount: Option<Decimal>,
    /// Absolute stock level set by an admin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.discount.is_none()
            && self.stock.is_none()
            && self.size.is_none()
            && self.category.is_none()
    }
}

/// Unit price after applying the discount percentage, rounded to cents
pub fn discounted_price(price: Decimal, discount: Decimal) -> Decimal {
    let factor = Decimal::ONE_HUNDRED - discount;
    (price * factor / Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_discounted_price() {
        let price = Decimal::new(450, 2); // 4.50
        assert_eq!(discounted_price(price, Decimal::ZERO), Decimal::new(450, 2));
        assert_eq!(discounted_price(price, Decimal::from(10)), Decimal::new(405, 2));
        assert_eq!(discounted_price(price, Decimal::from(100)), Decimal::ZERO);
        // 3.99 * 0.85 = 3.3915
        assert_eq!(
            discounted_price(Decimal::new(399, 2), Decimal::from(15)),
            Decimal::new(339, 2)
        );
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        assert!(serde_json::from_str::<ProductUpdate>(r#"{"id":"product:1"}"#).is_err());
        let update: ProductUpdate = serde_json::from_str(r#"{"stock":12}"#).unwrap();
        assert_eq!(update.stock, Some(12));
        assert!(!update.is_empty());
    }
}
