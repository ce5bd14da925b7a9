//! Oracle registrations, events and the external agent interface

use async_trait::async_trait;
use flightsure_core::{Address, Amount, Flight, FlightKey, StatusCode};
use flightsure_ledger::CreditSummary;
use serde::{Deserialize, Serialize};

use crate::OracleError;

/// A registered oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRegistration {
    /// Only requests issued with one of these indexes may be answered
    pub indexes: Vec<u8>,
    pub fee_paid: Amount,
}

impl OracleRegistration {
    pub fn has_index(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

/// Events observable by external oracle agents and clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleEvent {
    /// Oracles holding `index` should report the status of `flight`
    StatusRequested {
        index: u8,
        flight: Flight,
        flight_key: FlightKey,
    },

    /// An oracle response was accepted
    OracleReport {
        index: u8,
        flight: Flight,
        oracle: Address,
        status: StatusCode,
    },

    /// A request reached quorum
    FlightStatusResolved {
        index: u8,
        flight: Flight,
        status: StatusCode,
    },
}

/// Result of an accepted oracle response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Recorded, quorum not reached for this status yet
    Accepted { votes: usize, required: usize },
    /// This response resolved the request. `credited` is set when the status
    /// triggered a payout.
    Resolved {
        status: StatusCode,
        credited: Option<CreditSummary>,
    },
}

/// Flight status oracle - interface for external status feeds
///
/// Implementations can be:
/// - MockOracle: For testing with fixed statuses
/// - Live agents backed by an airline status API
#[async_trait]
pub trait FlightStatusOracle: Send + Sync {
    /// Identity this agent responds as
    fn identity(&self) -> &Address;

    /// Get the current status of a flight
    async fn flight_status(&self, flight: &Flight) -> Result<StatusCode, OracleError>;

    /// Answer a status request event; other events yield `None`
    async fn answer(
        &self,
        event: &OracleEvent,
    ) -> Option<Result<(u8, Flight, StatusCode), OracleError>> {
        match event {
            OracleEvent::StatusRequested { index, flight, .. } => Some(
                self.flight_status(flight)
                    .await
                    .map(|status| (*index, flight.clone(), status)),
            ),
            _ => None,
        }
    }
}
