//! Journal record - one accepted command

use crate::command::Command;
use crate::hash::calculate_record_hash;
use chrono::{DateTime, Utc};
use flightsure_core::Address;
use serde::{Deserialize, Serialize};

/// Genesis marker used as `prev_hash` of the first record
pub const GENESIS: &str = "GENESIS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// 1-based, strictly increasing
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    /// Service the command arrived through
    pub service: Address,
    /// Account acting through the service
    pub sender: Address,
    pub command: Command,
}

impl JournalRecord {
    /// Build the record following `prev` (or the genesis record) and seal it
    pub fn next(
        prev: Option<(u64, &str)>,
        correlation_id: impl Into<String>,
        service: Address,
        sender: Address,
        command: Command,
    ) -> Self {
        let (sequence, prev_hash) = match prev {
            Some((sequence, hash)) => (sequence + 1, hash.to_string()),
            None => (1, GENESIS.to_string()),
        };

        let mut record = Self {
            sequence,
            prev_hash,
            hash: String::new(),
            timestamp: Utc::now(),
            correlation_id: correlation_id.into(),
            service,
            sender,
            command,
        };
        record.hash = calculate_record_hash(&record);
        record
    }
}
