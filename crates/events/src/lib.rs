//! FlightSure Events - JSONL command journal
//!
//! Every command the ledger accepts is appended to a JSONL journal. The
//! journal is the Source of Truth: in-memory ledger state is rebuilt by
//! replaying it. Records are linked by a SHA-256 hash chain.

pub mod command;
pub mod error;
pub mod hash;
pub mod reader;
pub mod record;
pub mod store;

pub use command::Command;
pub use error::EventError;
pub use hash::{verify_chain, ChainError};
pub use reader::EventReader;
pub use record::JournalRecord;
pub use store::EventStore;
