// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log
//!
//! Each operation is a whole-record upsert or removal, so replaying the log
//! in order always reproduces the last committed state.

use crate::coordination::EnvelopeLock;
use crate::delivery::{ConnectConfig, ConnectFailure, ConnectLog, FailureKey};
use crate::document::{Document, Tab};
use crate::envelope::Envelope;
use crate::event::Event;
use crate::id::EnvelopeId;
use crate::recipient::Recipient;
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    EnvelopeSaved { envelope: Envelope },
    RecipientSaved { recipient: Recipient },
    DocumentSaved { document: Document },
    TabSaved { tab: Tab },
    WorkflowSaved { workflow: Workflow },

    LockSaved { lock: EnvelopeLock },
    LockCleared { envelope_id: EnvelopeId },

    ConnectConfigSaved { config: ConnectConfig },
    FailureSaved { failure: ConnectFailure },
    FailureResolved { key: FailureKey },
    ConnectLogAppended { entry: ConnectLog },

    /// Deliverable events, committed with the change that produced them
    EventsQueued { events: Vec<Event> },
    /// Queued events `from..=through` have been handed to every endpoint
    EventsDelivered { from: u64, through: u64 },
}

impl Operation {
    /// Envelope this operation touches, if any
    pub fn envelope_id(&self) -> Option<&EnvelopeId> {
        match self {
            Operation::EnvelopeSaved { envelope } => Some(&envelope.id),
            Operation::RecipientSaved { recipient } => recipient.envelope_id(),
            Operation::DocumentSaved { document } => document.parent.as_envelope(),
            Operation::TabSaved { tab } => tab.parent.as_envelope(),
            Operation::WorkflowSaved { workflow } => Some(&workflow.envelope_id),
            Operation::LockSaved { lock } => Some(&lock.envelope_id),
            Operation::LockCleared { envelope_id } => Some(envelope_id),
            Operation::FailureSaved { failure } => Some(&failure.key.envelope_id),
            Operation::FailureResolved { key } => Some(&key.envelope_id),
            Operation::ConnectLogAppended { entry } => Some(&entry.envelope_id),
            Operation::EventsQueued { events } => events.first().map(|e| &e.envelope_id),
            Operation::ConnectConfigSaved { .. } | Operation::EventsDelivered { .. } => None,
        }
    }
}
