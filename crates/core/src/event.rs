// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events emitted by envelope, recipient, workflow and lock transitions

use crate::envelope::EnvelopeStatus;
use crate::id::{AccountId, EnvelopeId, RecipientId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    EnvelopeSent,
    EnvelopeDelivered,
    EnvelopeSigned,
    EnvelopeCompleted,
    EnvelopeDeclined {
        recipient_id: RecipientId,
        reason: String,
    },
    EnvelopeVoided {
        reason: String,
    },
    EnvelopeDeleted,

    RecipientSent {
        recipient_id: RecipientId,
    },
    RecipientDelivered {
        recipient_id: RecipientId,
    },
    RecipientCompleted {
        recipient_id: RecipientId,
    },
    RecipientDeclined {
        recipient_id: RecipientId,
        reason: String,
    },

    StepActivated {
        step_id: StepId,
    },
    StepCompleted {
        step_id: StepId,
    },

    LockAcquired {
        holder: String,
    },
    LockReclaimed {
        previous_holder: String,
        new_holder: String,
    },
    LockReleased {
        holder: String,
    },
    LockRenewed {
        holder: String,
    },
}

/// An event about one envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub envelope_id: EnvelopeId,
    pub account_id: AccountId,
    /// Envelope status at the time the event was produced
    pub status: EnvelopeStatus,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

impl Event {
    /// Get the event name in `category:action` format (e.g., "envelope:sent")
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EventKind::EnvelopeSent => "envelope:sent",
            EventKind::EnvelopeDelivered => "envelope:delivered",
            EventKind::EnvelopeSigned => "envelope:signed",
            EventKind::EnvelopeCompleted => "envelope:completed",
            EventKind::EnvelopeDeclined { .. } => "envelope:declined",
            EventKind::EnvelopeVoided { .. } => "envelope:voided",
            EventKind::EnvelopeDeleted => "envelope:deleted",
            EventKind::RecipientSent { .. } => "recipient:sent",
            EventKind::RecipientDelivered { .. } => "recipient:delivered",
            EventKind::RecipientCompleted { .. } => "recipient:completed",
            EventKind::RecipientDeclined { .. } => "recipient:declined",
            EventKind::StepActivated { .. } => "workflow:step-activated",
            EventKind::StepCompleted { .. } => "workflow:step-completed",
            EventKind::LockAcquired { .. } => "lock:acquired",
            EventKind::LockReclaimed { .. } => "lock:reclaimed",
            EventKind::LockReleased { .. } => "lock:released",
            EventKind::LockRenewed { .. } => "lock:renewed",
        }
    }

    /// Recipient the event is about, for recipient-scoped events
    pub fn recipient_id(&self) -> Option<&RecipientId> {
        match &self.kind {
            EventKind::RecipientSent { recipient_id }
            | EventKind::RecipientDelivered { recipient_id }
            | EventKind::RecipientCompleted { recipient_id }
            | EventKind::RecipientDeclined { recipient_id, .. } => Some(recipient_id),
            _ => None,
        }
    }

    /// Lock events are audited but never leave the system
    pub fn is_deliverable(&self) -> bool {
        !matches!(
            self.kind,
            EventKind::LockAcquired { .. }
                | EventKind::LockReclaimed { .. }
                | EventKind::LockReleased { .. }
                | EventKind::LockRenewed { .. }
        )
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
