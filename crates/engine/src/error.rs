// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine service

use seal_core::{ConfigError, WorkflowError};
use seal_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// State machine, routing, lock or validation failure
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("storage error: {0}")]
    Store(StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open audit log: {0}")]
    AuditOpen(#[source] std::io::Error),
}

impl EngineError {
    /// The domain error, when this is one
    pub fn workflow(&self) -> Option<&WorkflowError> {
        match self {
            EngineError::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                envelope_id,
                expected,
                found,
            } => EngineError::Workflow(WorkflowError::VersionConflict {
                envelope_id,
                expected,
                found,
            }),
            // Someone else's acquire, release or reclaim landed first
            StoreError::LockChanged { envelope_id } => {
                EngineError::Workflow(WorkflowError::TokenMismatch { envelope_id })
            }
            other => EngineError::Store(other),
        }
    }
}
