// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage
//!
//! One JSON line per committed batch, so a batch is either fully present on
//! replay or not at all. A torn final line (crash mid-write) is dropped.

use seal_core::Operation;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    ///
    /// A torn tail is cut off here so the next append starts on a fresh line.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let scan = Self::scan(path)?;
        let len = file.metadata()?.len();
        if scan.valid_len < len {
            tracing::warn!(
                path = %path.display(),
                dropped = len - scan.valid_len,
                "truncating torn WAL tail"
            );
            file.set_len(scan.valid_len)?;
        }
        if scan.missing_newline {
            file.write_all(b"\n")?;
        }
        if scan.valid_len < len || scan.missing_newline {
            file.sync_all()?;
        }

        let sequence = scan.entries.last().map(|entry| entry.seq).unwrap_or(0);
        Ok(Self { file, sequence })
    }

    /// Append a batch of operations as a single entry
    pub fn append(&mut self, ops: &[Operation]) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            ops: ops.to_vec(),
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_all()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Replay all operations from the log, in commit order
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        Ok(Self::read_entries(path)?
            .into_iter()
            .flat_map(|entry| entry.ops)
            .collect())
    }

    fn read_entries(path: &Path) -> Result<Vec<WalEntry>, WalError> {
        Ok(Self::scan(path)?.entries)
    }

    fn scan(path: &Path) -> Result<Scan, WalError> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Scan::default()),
            Err(e) => return Err(e.into()),
        };

        let is_blank = |line: &[u8]| line.iter().all(u8::is_ascii_whitespace);
        let lines: Vec<&[u8]> = bytes.split_inclusive(|b| *b == b'\n').collect();
        let last = lines.iter().rposition(|l| !is_blank(*l));
        let mut scan = Scan::default();
        let mut offset = 0u64;

        for (index, chunk) in lines.iter().copied().enumerate() {
            let end = offset + chunk.len() as u64;
            offset = end;
            if is_blank(chunk) {
                if chunk.ends_with(b"\n") {
                    scan.valid_len = end;
                }
                continue;
            }
            match serde_json::from_slice::<WalEntry>(chunk) {
                Ok(entry) => {
                    scan.entries.push(entry);
                    scan.valid_len = end;
                    scan.missing_newline = !chunk.ends_with(b"\n");
                }
                Err(source) if Some(index) == last => {
                    tracing::warn!(line = index + 1, error = %source, "dropping torn WAL tail");
                    break;
                }
                Err(source) => {
                    return Err(WalError::Corrupt {
                        line: index + 1,
                        source,
                    })
                }
            }
        }

        Ok(scan)
    }
}

/// Result of reading a log: the intact entries and where they end
#[derive(Default)]
struct Scan {
    entries: Vec<WalEntry>,
    valid_len: u64,
    missing_newline: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    ops: Vec<Operation>,
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
