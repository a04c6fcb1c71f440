// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::policy::EnvelopeSettings;
use super::status::EnvelopeStatus;
use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::event::{Event, EventKind};
use crate::id::{AccountId, EnvelopeId, RecipientId};
use crate::recipient::{Recipient, RecipientStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signing transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub account_id: AccountId,
    pub subject: String,
    pub status: EnvelopeStatus,
    pub settings: EnvelopeSettings,
    pub created_date_time: DateTime<Utc>,
    pub sent_date_time: Option<DateTime<Utc>>,
    pub delivered_date_time: Option<DateTime<Utc>>,
    pub signed_date_time: Option<DateTime<Utc>>,
    pub completed_date_time: Option<DateTime<Utc>>,
    pub declined_date_time: Option<DateTime<Utc>>,
    pub voided_date_time: Option<DateTime<Utc>>,
    pub voided_reason: Option<String>,
    pub declined_reason: Option<String>,
    pub declined_by: Option<RecipientId>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Bumped by every committed change; the store rejects stale writes
    pub version: u64,
}

/// Status-changing actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeAction {
    Send,
    /// First successful delivery to any recipient
    Deliver,
    /// Every mandatory signer has signed
    Sign,
    Complete,
    Decline {
        recipient_id: RecipientId,
        reason: String,
    },
    Void {
        reason: String,
    },
}

impl EnvelopeAction {
    pub fn name(&self) -> &'static str {
        match self {
            EnvelopeAction::Send => "send",
            EnvelopeAction::Deliver => "mark delivered",
            EnvelopeAction::Sign => "mark signed",
            EnvelopeAction::Complete => "complete",
            EnvelopeAction::Decline { .. } => "decline",
            EnvelopeAction::Void { .. } => "void",
        }
    }
}

/// Outcome of a successful transition
#[derive(Debug, Clone)]
pub struct Transition {
    pub envelope: Envelope,
    pub events: Vec<Event>,
}

impl Transition {
    fn unchanged(envelope: &Envelope) -> Self {
        Self {
            envelope: envelope.clone(),
            events: Vec::new(),
        }
    }

    pub fn changed(&self, before: &Envelope) -> bool {
        self.envelope.version != before.version
    }
}

impl Envelope {
    pub fn new(
        id: EnvelopeId,
        account_id: AccountId,
        subject: impl Into<String>,
        settings: EnvelopeSettings,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            account_id,
            subject: subject.into(),
            status: EnvelopeStatus::Created,
            settings,
            created_date_time: clock.now(),
            sent_date_time: None,
            delivered_date_time: None,
            signed_date_time: None,
            completed_date_time: None,
            declined_date_time: None,
            voided_date_time: None,
            voided_reason: None,
            declined_reason: None,
            declined_by: None,
            deleted_at: None,
            version: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Documents, recipients and tabs may only be edited directly before any
    /// recipient has acted
    pub fn can_be_modified(&self) -> bool {
        !self.is_deleted()
            && matches!(self.status, EnvelopeStatus::Created | EnvelopeStatus::Sent)
    }

    /// Derived on read; never persisted as a transition
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.sent_date_time) {
            (EnvelopeStatus::Sent, Some(sent)) => self.settings.expiration.is_expired(sent, now),
            _ => false,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.sent_date_time
            .and_then(|sent| self.settings.expiration.expires_at(sent))
    }

    pub fn in_expiry_warning(&self, now: DateTime<Utc>) -> bool {
        match self.sent_date_time {
            Some(sent) if self.status.is_in_flight() => {
                self.settings.expiration.in_warning_window(sent, now)
            }
            _ => false,
        }
    }

    pub fn next_reminder_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.status, self.sent_date_time) {
            (EnvelopeStatus::Sent | EnvelopeStatus::Delivered, Some(sent)) => {
                self.settings.reminders.next_reminder_at(sent, now)
            }
            _ => None,
        }
    }

    /// Percentage of recipients that have finished successfully
    pub fn completion_percentage(recipients: &[Recipient]) -> u8 {
        if recipients.is_empty() {
            return 0;
        }
        let done = recipients.iter().filter(|r| r.status.is_success()).count();
        ((done * 100) / recipients.len()) as u8
    }

    /// Apply a status-changing action.
    ///
    /// Pure: the receiver is untouched and the returned envelope carries every
    /// status and timestamp change at once, so a failed check writes nothing.
    pub fn transition(
        &self,
        action: EnvelopeAction,
        recipients: &[Recipient],
        clock: &impl Clock,
    ) -> Result<Transition, WorkflowError> {
        if self.is_deleted() {
            return Err(self.invalid(action.name(), "deleted"));
        }

        let now = self.stamp(clock);
        let mut next = self.clone();

        let kind = match &action {
            EnvelopeAction::Send => {
                if self.status != EnvelopeStatus::Created {
                    return Err(self.invalid(action.name(), self.status.as_str()));
                }
                if recipients.is_empty() {
                    return Err(WorkflowError::validation(format!(
                        "envelope {} has no recipients",
                        self.id
                    )));
                }
                next.status = EnvelopeStatus::Sent;
                next.sent_date_time = Some(now);
                EventKind::EnvelopeSent
            }

            EnvelopeAction::Deliver => match self.status {
                EnvelopeStatus::Sent => {
                    next.status = EnvelopeStatus::Delivered;
                    next.delivered_date_time = Some(now);
                    EventKind::EnvelopeDelivered
                }
                // Milestone only: later deliveries change nothing
                EnvelopeStatus::Delivered | EnvelopeStatus::Signed => {
                    return Ok(Transition::unchanged(self))
                }
                _ => return Err(self.invalid(action.name(), self.status.as_str())),
            },

            EnvelopeAction::Sign => {
                if !matches!(
                    self.status,
                    EnvelopeStatus::Sent | EnvelopeStatus::Delivered
                ) {
                    return Err(self.invalid(action.name(), self.status.as_str()));
                }
                let unsigned = recipients
                    .iter()
                    .filter(|r| r.kind.signs() && !r.optional && r.status != RecipientStatus::Signed)
                    .count();
                if unsigned > 0 {
                    return Err(self.invalid(
                        action.name(),
                        &format!("{} ({} signer(s) outstanding)", self.status, unsigned),
                    ));
                }
                next.status = EnvelopeStatus::Signed;
                next.signed_date_time = Some(now);
                EventKind::EnvelopeSigned
            }

            EnvelopeAction::Complete => {
                if !self.status.is_in_flight() {
                    return Err(self.invalid(action.name(), self.status.as_str()));
                }
                let outstanding = recipients
                    .iter()
                    .filter(|r| r.kind.is_blocking() && !r.is_satisfied())
                    .count();
                if outstanding > 0 {
                    return Err(self.invalid(
                        action.name(),
                        &format!("{} ({} recipient(s) outstanding)", self.status, outstanding),
                    ));
                }
                if next.signed_date_time.is_none() {
                    next.signed_date_time = Some(now);
                }
                next.status = EnvelopeStatus::Completed;
                next.completed_date_time = Some(now);
                EventKind::EnvelopeCompleted
            }

            EnvelopeAction::Decline {
                recipient_id,
                reason,
            } => {
                if reason.trim().is_empty() {
                    return Err(WorkflowError::validation("decline reason is required"));
                }
                if !self.status.is_in_flight() {
                    return Err(self.invalid(action.name(), self.status.as_str()));
                }
                next.status = EnvelopeStatus::Declined;
                next.declined_date_time = Some(now);
                next.declined_reason = Some(reason.trim().to_string());
                next.declined_by = Some(recipient_id.clone());
                EventKind::EnvelopeDeclined {
                    recipient_id: recipient_id.clone(),
                    reason: reason.trim().to_string(),
                }
            }

            EnvelopeAction::Void { reason } => {
                if reason.trim().is_empty() {
                    return Err(WorkflowError::validation("void reason is required"));
                }
                if !self.status.is_in_flight() {
                    return Err(self.invalid(action.name(), self.status.as_str()));
                }
                next.status = EnvelopeStatus::Voided;
                next.voided_date_time = Some(now);
                next.voided_reason = Some(reason.trim().to_string());
                EventKind::EnvelopeVoided {
                    reason: reason.trim().to_string(),
                }
            }
        };

        next.version += 1;
        let event = next.event(kind, now);
        Ok(Transition {
            envelope: next,
            events: vec![event],
        })
    }

    /// Logical delete; in-flight envelopes must be voided first
    pub fn soft_delete(&self, clock: &impl Clock) -> Result<Transition, WorkflowError> {
        if self.is_deleted() {
            return Err(WorkflowError::validation(format!(
                "envelope {} is already deleted",
                self.id
            )));
        }
        if self.status.is_in_flight() {
            return Err(self.invalid("delete", self.status.as_str()));
        }
        let now = clock.now();
        let mut next = self.clone();
        next.deleted_at = Some(now);
        next.version += 1;
        let event = next.event(EventKind::EnvelopeDeleted, now);
        Ok(Transition {
            envelope: next,
            events: vec![event],
        })
    }

    /// Next version with no status change, for commits that only touch
    /// recipients, tabs or the workflow
    pub fn touched(&self) -> Envelope {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    /// Build an event stamped with this envelope's identity and status
    pub fn event(&self, kind: EventKind, at: DateTime<Utc>) -> Event {
        Event {
            envelope_id: self.id.clone(),
            account_id: self.account_id.clone(),
            status: self.status,
            at,
            kind,
        }
    }

    /// Status timestamps in lifecycle order
    pub fn status_timestamps(&self) -> [Option<DateTime<Utc>>; 7] {
        [
            Some(self.created_date_time),
            self.sent_date_time,
            self.delivered_date_time,
            self.signed_date_time,
            self.completed_date_time,
            self.declined_date_time,
            self.voided_date_time,
        ]
    }

    fn latest_timestamp(&self) -> DateTime<Utc> {
        self.status_timestamps()
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(self.created_date_time)
    }

    /// Never earlier than any timestamp already set
    fn stamp(&self, clock: &impl Clock) -> DateTime<Utc> {
        clock.now().max(self.latest_timestamp())
    }

    fn invalid(&self, attempted: &'static str, current: &str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            resource: "envelope",
            id: self.id.to_string(),
            current: current.to_string(),
            attempted,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
