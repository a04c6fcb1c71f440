// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for envelope workflow operations

use crate::id::{EnvelopeId, RecipientId, StepId};
use thiserror::Error;

/// Errors surfaced synchronously by the state machines, router and lock table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("cannot {attempted} {resource} {id}: current state is {current}")]
    InvalidTransition {
        resource: &'static str,
        id: String,
        current: String,
        attempted: &'static str,
    },

    #[error("envelope {envelope_id} is locked by {holder}")]
    AlreadyLocked {
        envelope_id: EnvelopeId,
        holder: String,
    },

    #[error("lock on envelope {envelope_id} is held under a different token")]
    TokenMismatch { envelope_id: EnvelopeId },

    #[error("lock on envelope {envelope_id} has expired or does not exist")]
    LockExpired { envelope_id: EnvelopeId },

    #[error(
        "recipient {recipient_id} (routing order {routing_order}) cannot act yet: {reason}"
    )]
    RoutingBlocked {
        recipient_id: RecipientId,
        routing_order: u32,
        reason: String,
    },

    #[error("delivery to {target} for envelope {envelope_id} exhausted {attempts} retries")]
    RetryExhausted {
        envelope_id: EnvelopeId,
        target: String,
        attempts: u32,
    },

    #[error("workflow step {step_id} is {current}, expected {expected}")]
    StepState {
        step_id: StepId,
        current: String,
        expected: &'static str,
    },

    #[error("envelope {envelope_id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        envelope_id: EnvelopeId,
        expected: u64,
        found: u64,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("validation error: {0}")]
    Validation(String),
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
