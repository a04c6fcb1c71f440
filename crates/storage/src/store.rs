// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned, all-or-nothing commits over the WAL and materialized state

use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use seal_core::{EnvelopeId, LockToken, Operation};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),

    #[error("envelope {envelope_id} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        envelope_id: EnvelopeId,
        expected: u64,
        found: u64,
    },

    #[error("lock on envelope {envelope_id} changed concurrently")]
    LockChanged { envelope_id: EnvelopeId },
}

/// Condition that must still hold when a batch is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The stored envelope is at exactly this version
    EnvelopeVersion { envelope_id: EnvelopeId, version: u64 },
    /// The stored lock row carries this token (None: no row)
    LockToken {
        envelope_id: EnvelopeId,
        token: Option<LockToken>,
    },
}

/// Operations committed together
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub preconditions: Vec<Precondition>,
    pub ops: Vec<Operation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(mut self, envelope_id: &EnvelopeId, version: u64) -> Self {
        self.preconditions.push(Precondition::EnvelopeVersion {
            envelope_id: envelope_id.clone(),
            version,
        });
        self
    }

    pub fn expect_lock(mut self, envelope_id: &EnvelopeId, token: Option<&LockToken>) -> Self {
        self.preconditions.push(Precondition::LockToken {
            envelope_id: envelope_id.clone(),
            token: token.cloned(),
        });
        self
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn with(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Durable store: materialized state plus an optional WAL
pub struct Store {
    state: MaterializedState,
    wal: Option<Wal>,
}

impl Store {
    /// Volatile store for tests and embedded use
    pub fn in_memory() -> Self {
        Self {
            state: MaterializedState::default(),
            wal: None,
        }
    }

    /// Open a WAL-backed store, replaying existing entries
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let ops = Wal::replay(path)?;
        let mut state = MaterializedState::default();
        for op in &ops {
            state.apply(op);
        }
        let wal = Wal::open(path)?;
        tracing::info!(path = %path.display(), operations = ops.len(), "store replayed");
        Ok(Self {
            state,
            wal: Some(wal),
        })
    }

    pub fn state(&self) -> &MaterializedState {
        &self.state
    }

    /// Validate every precondition and envelope version bump, then write
    /// and apply the whole batch. Nothing is written when any check fails.
    pub fn commit(&mut self, batch: Batch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.validate(&batch)?;

        if let Some(wal) = self.wal.as_mut() {
            wal.append(&batch.ops)?;
        }
        for op in &batch.ops {
            self.state.apply(op);
        }
        tracing::debug!(operations = batch.ops.len(), "batch committed");
        Ok(())
    }

    fn validate(&self, batch: &Batch) -> Result<(), StoreError> {
        for precondition in &batch.preconditions {
            match precondition {
                Precondition::EnvelopeVersion {
                    envelope_id,
                    version,
                } => {
                    let found = self
                        .state
                        .envelope_including_deleted(envelope_id)
                        .map(|e| e.version)
                        .unwrap_or(0);
                    if found != *version {
                        return Err(StoreError::VersionConflict {
                            envelope_id: envelope_id.clone(),
                            expected: *version,
                            found,
                        });
                    }
                }
                Precondition::LockToken { envelope_id, token } => {
                    let stored = self.state.lock_row(envelope_id).map(|l| &l.token);
                    if stored != token.as_ref() {
                        return Err(StoreError::LockChanged {
                            envelope_id: envelope_id.clone(),
                        });
                    }
                }
            }
        }

        // Each save must bump the version by exactly one over what is stored
        // (or over the previous save of the same envelope in this batch)
        let mut versions: HashMap<&EnvelopeId, Option<u64>> = HashMap::new();
        for op in &batch.ops {
            let Operation::EnvelopeSaved { envelope } = op else {
                continue;
            };
            let current = *versions.entry(&envelope.id).or_insert_with(|| {
                self.state
                    .envelope_including_deleted(&envelope.id)
                    .map(|e| e.version)
            });
            let expected = current.map(|v| v + 1).unwrap_or(0);
            if envelope.version != expected {
                return Err(StoreError::VersionConflict {
                    envelope_id: envelope.id.clone(),
                    expected,
                    found: envelope.version,
                });
            }
            versions.insert(&envelope.id, Some(envelope.version));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
