//! Core domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised when constructing core domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Unknown status code: {0}")]
    UnknownStatusCode(u8),
}
