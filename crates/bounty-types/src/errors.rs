//! Error types for marketplace operations

use crate::{AccountId, Amount};
use serde::{Deserialize, Serialize};

/// Errors that can occur in marketplace operations.
///
/// Nested component errors propagate to the top-level caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("Unauthorized: {caller} may not {action}")]
    Unauthorized {
        caller: AccountId,
        action: &'static str,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Too early: {0}")]
    TooEarly(String),

    #[error("System paused")]
    SystemPaused,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    pub fn unauthorized(caller: &AccountId, action: &'static str) -> Self {
        MarketError::Unauthorized {
            caller: caller.clone(),
            action,
        }
    }

    /// The tag callers match on
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Unauthorized { .. } => ErrorKind::Unauthorized,
            MarketError::InvalidParams(_) => ErrorKind::InvalidParams,
            MarketError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            MarketError::TransferFailed(_) => ErrorKind::TransferFailed,
            MarketError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            MarketError::NotFound(_) => ErrorKind::NotFound,
            MarketError::InvalidState(_) => ErrorKind::InvalidState,
            MarketError::Expired(_) => ErrorKind::Expired,
            MarketError::TooEarly(_) => ErrorKind::TooEarly,
            MarketError::SystemPaused => ErrorKind::SystemPaused,
            MarketError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Error taxonomy without context
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    InvalidParams,
    InsufficientFunds,
    TransferFailed,
    AlreadyExists,
    NotFound,
    InvalidState,
    Expired,
    TooEarly,
    SystemPaused,
    Config,
}

/// Result type alias for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_context() {
        let err = MarketError::InsufficientFunds {
            required: Amount::new(10_000),
            available: Amount::new(5_000),
        };
        let s = err.to_string();
        assert!(s.contains("10000"));
        assert!(s.contains("5000"));

        let err = MarketError::unauthorized(&AccountId::new("mallory"), "release escrow");
        assert_eq!(err.to_string(), "Unauthorized: mallory may not release escrow");
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(MarketError::SystemPaused.kind(), ErrorKind::SystemPaused);
        assert_eq!(
            MarketError::NotFound("bounty-1".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            MarketError::TooEarly("deadline".into()).kind(),
            ErrorKind::TooEarly
        );
    }
}
