//! Input validation helpers
//!
//! Centralized text length constants and validation functions.

use crate::utils::AppError;
use rust_decimal::Decimal;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product, customer, category
pub const MAX_NAME_LEN: usize = 200;

/// Descriptions, cancellation reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: username, mobile, size labels
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Minimum password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Delivery addresses
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<(), AppError> {
    if value.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    validate_required_text(value, "password", MAX_PASSWORD_LEN)
}

/// 0 <= price
pub fn validate_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::with_message(
            shared::ErrorCode::ProductInvalidPrice,
            format!("price must not be negative ({price})"),
        ));
    }
    Ok(())
}

/// 0 <= discount <= 100
pub fn validate_discount(discount: Decimal) -> Result<(), AppError> {
    if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
        return Err(AppError::validation(format!(
            "discount must be between 0 and 100 ({discount})"
        )));
    }
    Ok(())
}

pub fn validate_stock(stock: i64) -> Result<(), AppError> {
    if stock < 0 {
        return Err(AppError::validation(format!(
            "stock must not be negative ({stock})"
        )));
    }
    Ok(())
}
