// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope lifecycle: create, send, void, delete, scheduled ticks

use super::Engine;
use crate::error::EngineError;
use crate::publisher;
use chrono::{DateTime, Utc};
use seal_adapters::WebhookAdapter;
use seal_core::{
    AccountId, Actor, AuditEntry, Clock, Envelope, EnvelopeAction, EnvelopeId, EnvelopeSettings,
    EnvelopeStatus, IdGen, Operation, RecipientId, ResourceRef, Trigger, UserId, Workflow,
    WorkflowError, WorkflowStatus,
};
use seal_storage::Batch;

/// Read-side view of an envelope for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeSummary {
    pub envelope_id: EnvelopeId,
    pub status: EnvelopeStatus,
    pub version: u64,
    pub completion_percentage: u8,
    pub expired: bool,
    pub in_expiry_warning: bool,
    pub next_reminder_at: Option<DateTime<Utc>>,
    /// Routing order currently open for action
    pub current_routing_order: Option<u32>,
    /// Mandatory recipient whose decline stopped routing
    pub halted_by: Option<RecipientId>,
    pub workflow_status: WorkflowStatus,
    pub next_wakeup: Option<DateTime<Utc>>,
    pub lock_holder: Option<UserId>,
}

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn create_envelope(
        &self,
        actor: &Actor,
        account_id: AccountId,
        subject: &str,
        settings: EnvelopeSettings,
    ) -> Result<Envelope, EngineError> {
        if subject.trim().is_empty() {
            return Err(WorkflowError::validation("envelope subject is required").into());
        }
        let id = EnvelopeId::new(self.next_id());
        let envelope = Envelope::new(id.clone(), account_id, subject.trim(), settings, &self.clock);
        let workflow = Workflow::new(id.clone());

        self.commit(
            Batch::new()
                .with(Operation::EnvelopeSaved {
                    envelope: envelope.clone(),
                })
                .with(Operation::WorkflowSaved { workflow }),
        )?;

        tracing::info!(envelope_id = %id, account_id = %envelope.account_id, "envelope created");
        self.audit(
            AuditEntry::new(
                envelope.account_id.clone(),
                actor.clone(),
                "envelope.create",
                ResourceRef::Envelope { id },
                self.clock.now(),
            )
            .after(Some(&envelope)),
        );
        Ok(envelope)
    }

    /// created -> sent, activating the first routing group
    pub fn send_envelope(&self, actor: &Actor, envelope_id: &EnvelopeId) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        let mut after = before.clone();
        after.apply(EnvelopeAction::Send, &self.clock)?;
        after.settle(vec![Trigger::EnvelopeSent], &self.clock)?;
        self.save(actor, "envelope.send", &before, after, Batch::new())
    }

    /// Void an in-flight envelope, freezing every pending recipient
    pub fn void_envelope(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        reason: &str,
    ) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        let mut after = before.clone();
        after.apply(
            EnvelopeAction::Void {
                reason: reason.to_string(),
            },
            &self.clock,
        )?;
        after.freeze_pending();
        self.save(actor, "envelope.void", &before, after, Batch::new())
    }

    /// Soft delete; the envelope disappears from every read path
    pub fn delete_envelope(&self, actor: &Actor, envelope_id: &EnvelopeId) -> Result<Envelope, EngineError> {
        let before = self
            .read(|state| state.envelope_including_deleted(envelope_id).cloned())
            .ok_or_else(|| WorkflowError::not_found("envelope", envelope_id))?;
        let transition = before.soft_delete(&self.clock)?;

        let mut batch = Batch::new().with(Operation::EnvelopeSaved {
            envelope: transition.envelope.clone(),
        });
        let queued = publisher::enqueue(&mut batch, &transition.events);
        self.commit(batch)?;

        tracing::info!(envelope_id = %envelope_id, "envelope deleted");
        self.audit(
            AuditEntry::new(
                before.account_id.clone(),
                actor.clone(),
                "envelope.delete",
                ResourceRef::Envelope {
                    id: envelope_id.clone(),
                },
                self.clock.now(),
            )
            .before(Some(&before))
            .after(Some(&transition.envelope)),
        );
        if queued {
            self.outbox.notify();
        }
        Ok(transition.envelope)
    }

    /// Activate delayed workflow steps whose time has come and let routing
    /// follow. Returns the envelopes that advanced.
    ///
    /// An envelope that loses a race to a concurrent writer is skipped; the
    /// next tick picks it up again.
    pub fn tick(&self) -> Vec<EnvelopeId> {
        let now = self.clock.now();
        let due: Vec<EnvelopeId> = self.read(|state| {
            state
                .workflows
                .values()
                .filter(|w| w.next_wakeup().is_some_and(|at| at <= now))
                .map(|w| w.envelope_id.clone())
                .collect()
        });

        let mut advanced = Vec::new();
        for envelope_id in due {
            match self.tick_envelope(&envelope_id, now) {
                Ok(true) => advanced.push(envelope_id),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(envelope_id = %envelope_id, error = %e, "workflow tick skipped")
                }
            }
        }
        if !advanced.is_empty() {
            tracing::info!(envelopes = advanced.len(), "workflow tick advanced envelopes");
        }
        advanced
    }

    fn tick_envelope(&self, envelope_id: &EnvelopeId, now: DateTime<Utc>) -> Result<bool, EngineError> {
        let before = self.load(envelope_id)?;
        if !before.envelope.status.is_in_flight() {
            return Ok(false);
        }
        let mut after = before.clone();
        after.tick(now);
        if after.workflow == before.workflow {
            return Ok(false);
        }
        after.settle(Vec::new(), &self.clock)?;
        self.save(&Actor::System, "workflow.tick", &before, after, Batch::new())?;
        Ok(true)
    }

    pub fn envelope(&self, envelope_id: &EnvelopeId) -> Option<Envelope> {
        self.read(|state| state.envelope(envelope_id).cloned())
    }

    pub fn envelopes(&self, account_id: &AccountId) -> Vec<Envelope> {
        self.read(|state| state.envelopes_for(account_id).into_iter().cloned().collect())
    }

    pub fn status_summary(&self, envelope_id: &EnvelopeId) -> Result<EnvelopeSummary, EngineError> {
        let progress = self.load(envelope_id)?;
        let now = self.clock.now();
        let lock_holder = self.read(|state| state.live_lock(envelope_id, now).map(|l| l.holder.clone()));
        let router = progress.router();
        let envelope = &progress.envelope;

        Ok(EnvelopeSummary {
            envelope_id: envelope.id.clone(),
            status: envelope.status,
            version: envelope.version,
            completion_percentage: Envelope::completion_percentage(&progress.recipients),
            expired: envelope.is_expired(now),
            in_expiry_warning: envelope.in_expiry_warning(now),
            next_reminder_at: envelope.next_reminder_at(now),
            current_routing_order: envelope
                .status
                .is_in_flight()
                .then(|| router.current_order())
                .flatten(),
            halted_by: router.halted_by().cloned(),
            workflow_status: progress.workflow.status,
            next_wakeup: progress.workflow.next_wakeup(),
            lock_holder,
        })
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
