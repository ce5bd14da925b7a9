//! Ledger errors

use flightsure_core::{Address, Amount};
use thiserror::Error;

/// Errors that can occur in ledger operations.
///
/// Every error is a rejection of the attempted operation: no state is
/// modified when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ledger is not operational")]
    NotOperational,

    #[error("Caller {0} is not authorized")]
    Unauthorized(Address),

    #[error("Airline {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("Airline {0} is not registered")]
    NotRegistered(Address),

    #[error("Airline {airline} has funded {funded}, requires {required}")]
    InsufficientFunding {
        airline: Address,
        funded: Amount,
        required: Amount,
    },

    #[error("Premium cap exceeded for {insuree}: paid {paid}, requested {requested}, cap {cap}")]
    PremiumCapExceeded {
        insuree: Address,
        paid: Amount,
        requested: Amount,
        cap: Amount,
    },

    #[error("No balance to withdraw for {0}")]
    ZeroBalance(Address),

    #[error("Airline {0} already exists")]
    AlreadyExists(Address),

    #[error("Airline {voter} already voted for {target}")]
    DuplicateVote { voter: Address, target: Address },

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Operational flag is already {0}")]
    OperationalUnchanged(bool),

    #[error("Transfer to {to} failed: {reason}")]
    TransferFailed { to: Address, reason: String },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
