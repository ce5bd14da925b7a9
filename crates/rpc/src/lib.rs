//! FlightSure RPC - CLI orchestrator
//!
//! This crate provides the CLI binary, the application context that owns
//! all ledger state, and journal replay.

pub mod commands;
pub mod context;

pub use context::{AppContext, CommandError, Outcome, Receipt};
