//! JSONL journal store - append-only writer with daily rotation

use crate::command::Command;
use crate::error::EventError;
use crate::hash::ChainError;
use crate::reader::EventReader;
use crate::record::{JournalRecord, GENESIS};
use flightsure_core::Address;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only JSONL journal, one file per UTC day
pub struct EventStore {
    base_path: PathBuf,
    current_file: Option<BufWriter<File>>,
    current_date: Option<String>,
    /// (sequence, hash) of the last record written
    head: Option<(u64, String)>,
}

impl EventStore {
    /// Open the journal at the given path, continuing after its last record
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self, EventError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let head = EventReader::from_directory(&base_path)?
            .last_record()?
            .map(|r| (r.sequence, r.hash));

        Ok(Self {
            base_path,
            current_file: None,
            current_date: None,
            head,
        })
    }

    /// Sequence of the last record, 0 for an empty journal
    pub fn last_sequence(&self) -> u64 {
        self.head.as_ref().map_or(0, |(seq, _)| *seq)
    }

    /// Hash the next record will link to
    pub fn last_hash(&self) -> &str {
        self.head.as_ref().map_or(GENESIS, |(_, hash)| hash.as_str())
    }

    /// Seal a command into the next record and append it
    pub fn record(
        &mut self,
        correlation_id: impl Into<String>,
        service: Address,
        sender: Address,
        command: Command,
    ) -> Result<JournalRecord, EventError> {
        let prev = self.head.as_ref().map(|(seq, hash)| (*seq, hash.as_str()));
        let record = JournalRecord::next(prev, correlation_id, service, sender, command);
        self.append(&record)?;
        Ok(record)
    }

    /// Append a sealed record; it must link to the current head
    pub fn append(&mut self, record: &JournalRecord) -> Result<(), EventError> {
        let expected = self.last_sequence() + 1;
        if record.sequence != expected {
            return Err(ChainError::InvalidSequence {
                expected,
                actual: record.sequence,
            }
            .into());
        }
        if record.prev_hash != self.last_hash() {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: self.last_hash().to_string(),
                actual: record.prev_hash.clone(),
            }
            .into());
        }

        let date = record.timestamp.format("%Y-%m-%d").to_string();

        // Rotate file if date changed
        if self.current_date.as_ref() != Some(&date) {
            self.rotate_file(&date)?;
        }

        if let Some(ref mut writer) = self.current_file {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
            writer.flush()?;
        }

        debug!(sequence = record.sequence, command = record.command.name(), "journaled");
        self.head = Some((record.sequence, record.hash.clone()));
        Ok(())
    }

    fn rotate_file(&mut self, date: &str) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }

        let file_path = self.base_path.join(format!("{}.jsonl", date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(BufWriter::new(file));
        self.current_date = Some(date.to_string());

        Ok(())
    }

    /// List all JSONL files in the store
    pub fn list_files(&self) -> Result<Vec<PathBuf>, EventError> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Flush and close the current file
    pub fn close(&mut self) -> Result<(), EventError> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;
        self.current_date = None;
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
