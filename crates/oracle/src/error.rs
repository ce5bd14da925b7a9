//! Oracle error types

use flightsure_core::{Address, Amount};
use flightsure_ledger::LedgerError;
use thiserror::Error;

/// Oracle-related errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The request already resolved and accepts no more responses
    #[error("Request {index} for flight {flight} is closed")]
    RequestClosed { index: u8, flight: String },

    /// The oracle was not assigned this index
    #[error("Oracle {oracle} is not assigned index {index}")]
    UnknownOracleIndex { oracle: Address, index: u8 },

    #[error("Oracle {0} is not registered")]
    UnknownOracle(Address),

    #[error("No status request {index} for flight {flight}")]
    RequestNotFound { index: u8, flight: String },

    #[error("Oracle {0} already responded to this request")]
    DuplicateResponse(Address),

    #[error("Registration fee {paid} is below the required {required}")]
    InsufficientFee { paid: Amount, required: Amount },

    #[error("Oracle {0} is already registered")]
    AlreadyRegistered(Address),

    /// Raised by oracle agents that have no data for a flight
    #[error("No status known for flight {0}")]
    FlightNotFound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
