//! Mock oracle agent for testing
//!
//! Reports fixed, configurable statuses per flight designator.

use async_trait::async_trait;
use flightsure_core::flight::normalize_designator;
use flightsure_core::{Address, Flight, StatusCode};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::OracleError;
use crate::types::FlightStatusOracle;

/// Mock flight status oracle
///
/// Statuses are keyed by flight designator. Flights without a configured
/// status fall back to `fallback`, or fail with `FlightNotFound` when no
/// fallback is set.
pub struct MockOracle {
    identity: Address,
    statuses: RwLock<HashMap<String, StatusCode>>,
    fallback: Option<StatusCode>,
}

impl MockOracle {
    pub fn new(identity: Address) -> Self {
        Self {
            identity,
            statuses: RwLock::new(HashMap::new()),
            fallback: None,
        }
    }

    /// Report `status` for every flight without an explicit entry
    pub fn with_fallback(mut self, status: StatusCode) -> Self {
        self.fallback = Some(status);
        self
    }

    pub fn set_status(&self, designator: &str, status: StatusCode) {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        statuses.insert(normalize_designator(designator), status);
    }

    pub fn remove_status(&self, designator: &str) {
        let mut statuses = self.statuses.write().unwrap_or_else(|e| e.into_inner());
        statuses.remove(&normalize_designator(designator));
    }
}

#[async_trait]
impl FlightStatusOracle for MockOracle {
    fn identity(&self) -> &Address {
        &self.identity
    }

    async fn flight_status(&self, flight: &Flight) -> Result<StatusCode, OracleError> {
        let statuses = self.statuses.read().unwrap_or_else(|e| e.into_inner());
        statuses
            .get(&flight.designator)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| OracleError::FlightNotFound(flight.designator.clone()))
    }
}
