//! Oracle request state machine
//!
//! ```text
//! Open --(quorum matching responses)--> Resolved(status)
//! ```
//!
//! `Resolved` is terminal. Open requests never expire.

use chrono::{DateTime, Utc};
use flightsure_core::{Address, Flight, FlightKey, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requests are keyed by the index drawn when the status check was issued
/// and the flight key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub index: u8,
    pub flight_key: FlightKey,
}

impl RequestKey {
    pub fn new(index: u8, flight_key: FlightKey) -> Self {
        Self { index, flight_key }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Resolved { status: StatusCode },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    pub flight: Flight,
    pub requester: Address,
    pub status: RequestStatus,
    /// Responding oracles per reported status, in arrival order
    pub responses: BTreeMap<StatusCode, Vec<Address>>,
    pub created_at: DateTime<Utc>,
}

impl OracleRequest {
    pub fn open(flight: Flight, requester: Address) -> Self {
        Self {
            flight,
            requester,
            status: RequestStatus::Open,
            responses: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }

    pub fn has_responded(&self, oracle: &Address) -> bool {
        self.responses.values().any(|oracles| oracles.contains(oracle))
    }

    pub fn votes_for(&self, status: StatusCode) -> usize {
        self.responses.get(&status).map_or(0, Vec::len)
    }

    pub fn resolved_status(&self) -> Option<StatusCode> {
        match self.status {
            RequestStatus::Resolved { status } => Some(status),
            RequestStatus::Open => None,
        }
    }

    pub(crate) fn record(&mut self, oracle: Address, status: StatusCode) -> usize {
        let oracles = self.responses.entry(status).or_default();
        oracles.push(oracle);
        oracles.len()
    }
}
