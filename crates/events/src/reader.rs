//! JSONL journal reader - sequential reader for replay

use crate::error::EventError;
use crate::hash::verify_chain;
use crate::record::JournalRecord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Sequential journal reader for replay
pub struct EventReader {
    files: Vec<PathBuf>,
}

impl EventReader {
    /// Create a new reader from a directory; a missing directory reads as empty
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref();
        let mut files = Vec::new();

        if path.exists() {
            for entry in std::fs::read_dir(path)? {
                let file_path = entry?.path();
                if file_path.extension().map_or(false, |ext| ext == "jsonl") {
                    files.push(file_path);
                }
            }
        }

        // YYYY-MM-DD names sort chronologically
        files.sort();

        Ok(Self { files })
    }

    /// Read all records from all files in order
    pub fn read_all(&self) -> Result<Vec<JournalRecord>, EventError> {
        let mut records = Vec::new();
        for file_path in &self.files {
            read_file(file_path, |record| records.push(record))?;
        }
        Ok(records)
    }

    /// Read all records and verify the hash chain
    pub fn read_verified(&self) -> Result<Vec<JournalRecord>, EventError> {
        let records = self.read_all()?;
        verify_chain(&records)?;
        Ok(records)
    }

    /// Last record of the newest file
    pub fn last_record(&self) -> Result<Option<JournalRecord>, EventError> {
        let Some(last_file) = self.files.last() else {
            return Ok(None);
        };

        let mut last = None;
        read_file(last_file, |record| last = Some(record))?;
        Ok(last)
    }

    /// Count total records across all files
    pub fn count(&self) -> Result<usize, EventError> {
        let mut count = 0;

        for file_path in &self.files {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines() {
                if !line?.trim().is_empty() {
                    count += 1;
                }
            }
        }

        Ok(count)
    }
}

fn read_file(path: &Path, mut f: impl FnMut(JournalRecord)) -> Result<(), EventError> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        f(serde_json::from_str(&line)?);
    }
    Ok(())
}
