//! FlightSure Oracle Consensus
//!
//! Independent oracles report the status of a flight. A status request is
//! resolved once `quorum` oracles agree on the same status code; an
//! airline-caused delay then credits every insuree of the flight.
//!
//! `MockOracle` is a deterministic stand-in for external oracle agents.

mod consensus;
mod error;
mod mock;
mod request;
mod types;

pub use consensus::OracleConsensus;
pub use error::OracleError;
pub use mock::MockOracle;
pub use request::{OracleRequest, RequestKey, RequestStatus};
pub use types::{FlightStatusOracle, OracleEvent, OracleRegistration, ResponseOutcome};
