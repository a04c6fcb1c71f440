// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit sinks
//!
//! Audit is observability: a failed append is logged at error level and the
//! transition that produced it stands.

use seal_core::AuditEntry;
use seal_storage::AuditLog;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    /// Append an entry, returning it with its assigned sequence
    fn append(&self, entry: AuditEntry) -> io::Result<AuditEntry>;
}

/// Keeps entries in memory; clones share the same trail
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, mut entry: AuditEntry) -> io::Result<AuditEntry> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entry.sequence = entries.len() as u64 + 1;
        entries.push(entry.clone());
        Ok(entry)
    }
}

/// Appends JSON lines to a file
pub struct JsonlAuditSink {
    log: Mutex<AuditLog>,
}

impl JsonlAuditSink {
    pub fn open(path: PathBuf) -> io::Result<Self> {
        Ok(Self {
            log: Mutex::new(AuditLog::open(path)?),
        })
    }
}

impl AuditSink for JsonlAuditSink {
    fn append(&self, entry: AuditEntry) -> io::Result<AuditEntry> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .append(entry)
    }
}

/// Write to the sink, logging instead of failing
pub(crate) fn record(sink: &dyn AuditSink, entry: AuditEntry) {
    let action = entry.action.clone();
    let resource = format!("{}/{}", entry.resource.kind(), entry.resource.id());
    if let Err(e) = sink.append(entry) {
        tracing::error!(%action, %resource, error = %e, "audit write failed");
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
