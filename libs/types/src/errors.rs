//! Error taxonomy for the matching core
//!
//! Validation failures and cancel errors are synchronous, caller-facing,
//! and side-effect free. Ledger failures during reservation fail closed
//! (the order is rejected). A settlement invariant violation is an
//! integration bug, fatal to the affected match.

use crate::ids::OrderId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level error returned by the matching core API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("order not found: {order_id}")]
    NotFound { order_id: OrderId },

    #[error("order {order_id} does not belong to the requesting user")]
    NotOwner { order_id: OrderId },

    #[error("order {order_id} is not open: {status}")]
    InvalidState { order_id: OrderId, status: String },

    #[error("settlement invariant violated: {detail}")]
    SettlementInvariant { detail: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Bad input, rejected before any state mutation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unsupported symbol: {symbol}")]
    UnsupportedSymbol { symbol: String },

    #[error("amount {amount} below minimum lot size {minimum}")]
    AmountBelowMinimum { amount: Decimal, minimum: Decimal },

    #[error("price is required for this order")]
    MissingPrice,

    #[error("price must be positive, got {price}")]
    InvalidPrice { price: Decimal },

    #[error("contradictory order flags: {detail}")]
    ContradictoryFlags { detail: String },
}

/// Failures from a balance ledger implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient funds in {currency}: required {required}, available {available}")]
    InsufficientFunds {
        currency: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient locked {currency}: required {required}, locked {locked}")]
    InsufficientLocked {
        currency: String,
        required: Decimal,
        locked: Decimal,
    },

    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::UnsupportedSymbol {
            symbol: "FOO/BAR".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported symbol: FOO/BAR");
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::InsufficientFunds {
            currency: "USDT".to_string(),
            required: Decimal::from(1500),
            available: Decimal::from(1000),
        };
        assert!(err.to_string().contains("USDT"));
        assert!(err.to_string().contains("1500"));
    }

    #[test]
    fn test_core_error_from_validation() {
        let err: CoreError = ValidationError::MissingPrice.into();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_core_error_from_ledger() {
        let err: CoreError = LedgerError::Unavailable {
            reason: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Ledger(_)));
    }
}
