//! FlightSure Core - Domain types
//!
//! This crate contains the fundamental types shared by every FlightSure crate:
//! - `Amount`: Non-negative decimal wrapper for premiums, stakes and payouts
//! - `Address`: Identity of an airline, insuree, oracle or service
//! - `FlightKey`: Deterministic identifier of a (airline, flight, timestamp) triple
//! - `StatusCode`: Flight status reported by oracles

pub mod address;
pub mod amount;
pub mod error;
pub mod flight;

pub use address::Address;
pub use amount::Amount;
pub use error::CoreError;
pub use flight::{Flight, FlightKey, StatusCode};
