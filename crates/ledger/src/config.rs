//! Ledger configuration
//!
//! Every threshold is configurable via a JSON file, none is hardcoded in the
//! components. Missing fields fall back to the defaults below.

use crate::error::LedgerError;
use flightsure_core::{Address, Amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a `FlightLedger` and its oracle consensus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    // === Identities ===
    /// Sole identity allowed to toggle the operational flag and manage callers
    #[serde(default = "default_owner")]
    pub owner: Address,

    /// Airline registered at construction
    #[serde(default = "default_first_airline")]
    pub first_airline: Address,

    #[serde(default = "default_first_airline_name")]
    pub first_airline_name: String,

    /// Services allowed to invoke mutating entry points from the start
    #[serde(default = "default_authorized_callers")]
    pub authorized_callers: Vec<Address>,

    // === Airlines ===
    /// Minimum funding before an airline may participate
    #[serde(default = "default_min_airline_stake")]
    pub min_airline_stake: Amount,

    /// Number of registered airlines below which a funded airline registers
    /// another one directly; from then on registration needs votes
    #[serde(default = "default_direct_registration_limit")]
    pub direct_registration_limit: usize,

    // === Insurance ===
    /// Maximum cumulative premium per insuree
    #[serde(default = "default_premium_cap")]
    pub premium_cap: Amount,

    /// Payout = premium * multiplier on an airline-caused delay
    #[serde(default = "default_payout_multiplier")]
    pub payout_multiplier: Decimal,

    // === Oracles ===
    #[serde(default = "default_oracle_registration_fee")]
    pub oracle_registration_fee: Amount,

    /// Matching responses required to resolve a status request
    #[serde(default = "default_oracle_quorum")]
    pub oracle_quorum: usize,

    /// Indexes are drawn from `0..oracle_index_space`
    #[serde(default = "default_oracle_index_space")]
    pub oracle_index_space: u8,

    #[serde(default = "default_indexes_per_oracle")]
    pub indexes_per_oracle: usize,
}

fn default_owner() -> Address {
    Address::new_unchecked("owner")
}

fn default_first_airline() -> Address {
    Address::new_unchecked("airline-genesis")
}

fn default_first_airline_name() -> String {
    "Genesis Air".to_string()
}

fn default_authorized_callers() -> Vec<Address> {
    vec![Address::new_unchecked("app")]
}

fn default_min_airline_stake() -> Amount {
    Amount::units(10)
}

fn default_direct_registration_limit() -> usize {
    4
}

fn default_premium_cap() -> Amount {
    Amount::ONE
}

fn default_payout_multiplier() -> Decimal {
    Decimal::from(2)
}

fn default_oracle_registration_fee() -> Amount {
    Amount::ONE
}

fn default_oracle_quorum() -> usize {
    3
}

fn default_oracle_index_space() -> u8 {
    10
}

fn default_indexes_per_oracle() -> usize {
    3
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            first_airline: default_first_airline(),
            first_airline_name: default_first_airline_name(),
            authorized_callers: default_authorized_callers(),
            min_airline_stake: default_min_airline_stake(),
            direct_registration_limit: default_direct_registration_limit(),
            premium_cap: default_premium_cap(),
            payout_multiplier: default_payout_multiplier(),
            oracle_registration_fee: default_oracle_registration_fee(),
            oracle_quorum: default_oracle_quorum(),
            oracle_index_space: default_oracle_index_space(),
            indexes_per_oracle: default_indexes_per_oracle(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Reject parameter combinations the components cannot honor
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.premium_cap.is_zero() {
            return Err(LedgerError::InvalidConfig("premium_cap must be positive".into()));
        }
        if self.payout_multiplier < Decimal::ZERO {
            return Err(LedgerError::InvalidConfig(
                "payout_multiplier cannot be negative".into(),
            ));
        }
        if self.oracle_quorum == 0 {
            return Err(LedgerError::InvalidConfig("oracle_quorum must be at least 1".into()));
        }
        if self.indexes_per_oracle == 0
            || self.indexes_per_oracle > self.oracle_index_space as usize
        {
            return Err(LedgerError::InvalidConfig(format!(
                "indexes_per_oracle must be within 1..={}",
                self.oracle_index_space
            )));
        }
        Ok(())
    }
}
