//! 订单输入校验
//!
//! `OrderCreate` / `OrderPatch` 在进入工作流前转换为已校验的类型：
//! 商品 ID 已解析、数量 >= 1、日期时间格式正确。
//! 允许修改的字段由 `OrderPatch` 的结构本身限定 (`deny_unknown_fields`)。

use super::error::OrderError;
use super::ledger::ReserveRequest;
use crate::db::repository::parse_record_id;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NOTE_LEN, validate_optional_text, validate_required_text,
};
use shared::models::{LineItemInput, OrderCreate, OrderPatch};
use shared::util::{parse_date, parse_time};

#[derive(Debug, Clone)]
pub struct ValidatedCreate {
    pub items: Vec<ReserveRequest>,
    pub delivery_address: String,
    pub pickup_date: String,
    pub pickup_time: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatedPatch {
    pub items: Option<Vec<ReserveRequest>>,
    pub delivery_address: Option<String>,
    pub pickup_date: Option<String>,
    pub pickup_time: Option<String>,
}

pub fn validate_create(input: OrderCreate) -> Result<ValidatedCreate, OrderError> {
    let items = parse_items(&input.products)?;
    validate_required_text(&input.delivery_address, "delivery_address", MAX_ADDRESS_LEN)?;
    validate_pickup_date(&input.pickup_date)?;
    validate_pickup_time(&input.pickup_time)?;
    Ok(ValidatedCreate {
        items,
        delivery_address: input.delivery_address,
        pickup_date: input.pickup_date,
        pickup_time: input.pickup_time,
    })
}

pub fn validate_patch(patch: OrderPatch) -> Result<ValidatedPatch, OrderError> {
    if patch.is_empty() {
        return Err(OrderError::Validation(
            "order update must change at least one field".to_string(),
        ));
    }

    let items = match &patch.products {
        Some(products) => Some(parse_items(products)?),
        None => None,
    };
    if let Some(address) = &patch.delivery_address {
        validate_required_text(address, "delivery_address", MAX_ADDRESS_LEN)?;
    }
    if let Some(date) = &patch.pickup_date {
        validate_pickup_date(date)?;
    }
    if let Some(time) = &patch.pickup_time {
        validate_pickup_time(time)?;
    }

    Ok(ValidatedPatch {
        items,
        delivery_address: patch.delivery_address,
        pickup_date: patch.pickup_date,
        pickup_time: patch.pickup_time,
    })
}

pub fn validate_reason(reason: &Option<String>) -> Result<(), OrderError> {
    validate_optional_text(reason, "reason", MAX_NOTE_LEN)?;
    Ok(())
}

fn parse_items(products: &[LineItemInput]) -> Result<Vec<ReserveRequest>, OrderError> {
    if products.is_empty() {
        return Err(OrderError::Validation(
            "order must contain at least one product".to_string(),
        ));
    }
    products
        .iter()
        .map(|input| {
            if input.quantity < 1 {
                return Err(OrderError::Validation(format!(
                    "quantity for {} must be at least 1",
                    input.product
                )));
            }
            let product = parse_record_id("product", &input.product)?;
            Ok(ReserveRequest {
                product,
                quantity: input.quantity,
            })
        })
        .collect()
}

fn validate_pickup_date(value: &str) -> Result<(), OrderError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| OrderError::Validation(format!("pickup_date must be YYYY-MM-DD ({})", value)))
}

fn validate_pickup_time(value: &str) -> Result<(), OrderError> {
    parse_time(value)
        .map(|_| ())
        .ok_or_else(|| OrderError::Validation(format!("pickup_time must be HH:MM ({})", value)))
}
