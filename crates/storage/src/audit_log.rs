// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL audit log

use seal_core::AuditEntry;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Audit trail file; one JSON entry per line
pub struct AuditLog {
    path: PathBuf,
    sequence: u64,
}

impl AuditLog {
    /// Open or create an audit log, continuing its sequence
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let sequence = if path.exists() {
            let file = File::open(&path)?;
            BufReader::new(file)
                .lines()
                .map_while(Result::ok)
                .filter(|line| !line.trim().is_empty())
                .count() as u64
        } else {
            0
        };

        Ok(Self { path, sequence })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry, assigning the next sequence number
    pub fn append(&mut self, mut entry: AuditEntry) -> io::Result<AuditEntry> {
        entry.sequence = self.sequence + 1;

        let json = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        self.sequence = entry.sequence;
        Ok(entry)
    }

    pub fn read_all(&self) -> io::Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = File::open(&self.path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Entries after a sequence number
    pub fn after(&self, sequence: u64) -> io::Result<Vec<AuditEntry>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.sequence > sequence)
            .collect())
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
#[path = "audit_log_tests.rs"]
mod tests;
