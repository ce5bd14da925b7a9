//! FlightSure Ledger - the state machine behind flight insurance
//!
//! All airline, premium and payout state changes go through this crate.
//!
//! # Key Types
//! - `AccessController`: Operational flag and authorized-caller set
//! - `AccountRegistry`: Airline registration, voting and funding
//! - `PolicyLedger`: Premiums, per-flight insurees and payout balances
//! - `FlightLedger`: State container wiring the three together

pub mod access;
pub mod config;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod registry;

pub use access::{AccessController, Caller};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use ledger::FlightLedger;
pub use policy::{CreditSummary, FundsTransfer, PayoutBook, PolicyEntry, PolicyLedger};
pub use registry::{AccountRegistry, Airline, AirlineStatus, RegistrationOutcome};
