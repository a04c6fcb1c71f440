// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settling an envelope after something happened to it
//!
//! Workflow triggers, recipient activation, routing-order completion and
//! envelope completion feed into each other. `settle` runs them to a fixpoint
//! over an in-memory copy so the caller commits the result as one batch.

use chrono::{DateTime, Utc};
use seal_core::{
    Clock, Envelope, EnvelopeAction, EnvelopeStatus, Event, EventKind, Recipient, RecipientId,
    RecipientStatus, Router, RoutingOutcome, Trigger, Workflow, WorkflowError,
};
use std::collections::VecDeque;

/// Working copy of one envelope's records
#[derive(Debug, Clone)]
pub(crate) struct Progress {
    pub envelope: Envelope,
    pub recipients: Vec<Recipient>,
    pub workflow: Workflow,
    pub events: Vec<Event>,
}

impl Progress {
    pub fn new(envelope: Envelope, recipients: Vec<Recipient>, workflow: Workflow) -> Self {
        Self {
            envelope,
            recipients,
            workflow,
            events: Vec::new(),
        }
    }

    pub fn recipient(&self, id: &RecipientId) -> Result<&Recipient, WorkflowError> {
        self.recipients
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| WorkflowError::not_found("recipient", id))
    }

    pub fn replace_recipient(&mut self, recipient: Recipient) {
        if let Some(slot) = self.recipients.iter_mut().find(|r| r.id == recipient.id) {
            *slot = recipient;
        }
    }

    pub fn router(&self) -> Router<'_> {
        Router::new(&self.recipients, self.envelope.settings.sequential_signing)
            .with_held_orders(self.workflow.held_orders())
    }

    /// Apply an envelope transition, keeping its events
    pub fn apply(&mut self, action: EnvelopeAction, clock: &impl Clock) -> Result<(), WorkflowError> {
        let transition = self.envelope.transition(action, &self.recipients, clock)?;
        self.envelope = transition.envelope;
        self.events.extend(transition.events);
        Ok(())
    }

    pub fn emit(&mut self, kind: EventKind, at: DateTime<Utc>) {
        let event = self.envelope.event(kind, at);
        self.events.push(event);
    }

    /// Stop every pending recipient; used once the envelope is terminal
    pub fn freeze_pending(&mut self) {
        self.recipients = self.recipients.iter().map(Recipient::freeze).collect();
    }

    fn feed(&mut self, trigger: Trigger, now: DateTime<Utc>) {
        let (workflow, kinds) = self.workflow.on_trigger(trigger, now);
        self.workflow = workflow;
        for kind in kinds {
            self.emit(kind, now);
        }
    }

    /// Advance delayed workflow steps
    pub fn tick(&mut self, now: DateTime<Utc>) {
        let (workflow, kinds) = self.workflow.tick(now);
        self.workflow = workflow;
        for kind in kinds {
            self.emit(kind, now);
        }
    }

    /// Run triggers, activation and completion until nothing changes
    pub fn settle(&mut self, triggers: Vec<Trigger>, clock: &impl Clock) -> Result<(), WorkflowError> {
        let now = clock.now();
        let mut queue: VecDeque<Trigger> = triggers.into();

        loop {
            while let Some(trigger) = queue.pop_front() {
                self.feed(trigger, now);
            }
            if !self.envelope.status.is_in_flight() {
                break;
            }

            let mut activated = false;
            let ready: Vec<RecipientId> = self
                .router()
                .to_activate()
                .into_iter()
                .map(|r| r.id.clone())
                .collect();
            for id in ready {
                let next = self.recipient(&id)?.activate(clock)?;
                self.replace_recipient(next);
                self.emit(EventKind::RecipientSent { recipient_id: id }, now);
                activated = true;
            }
            self.sign_when_due(clock)?;

            let finished: Vec<u32> = {
                let router = self.router();
                router
                    .groups()
                    .iter()
                    .filter(|g| g.actionable().next().is_some() && g.is_finished())
                    .map(|g| g.order)
                    .filter(|order| {
                        !self
                            .workflow
                            .has_seen(&Trigger::RoutingOrderCompleted(*order))
                    })
                    .collect()
            };
            queue.extend(finished.into_iter().map(Trigger::RoutingOrderCompleted));

            let outcome = self.router().outcome();
            let cursor = self.router().current_order();
            if self.workflow.current_routing_order != cursor {
                self.workflow = self.workflow.with_routing_order(cursor);
            }

            if outcome == RoutingOutcome::Finished && queue.is_empty() {
                self.finish(clock)?;
                break;
            }
            if queue.is_empty() && !activated {
                break;
            }
        }
        Ok(())
    }

    fn finish(&mut self, clock: &impl Clock) -> Result<(), WorkflowError> {
        // Activate anyone left (late carbon copies) before closing out
        let late: Vec<RecipientId> = self
            .router()
            .to_activate()
            .into_iter()
            .map(|r| r.id.clone())
            .collect();
        for id in late {
            let next = self.recipient(&id)?.activate(clock)?;
            self.replace_recipient(next);
            self.emit(EventKind::RecipientSent { recipient_id: id }, clock.now());
        }

        self.sign_when_due(clock)?;
        self.apply(EnvelopeAction::Complete, clock)?;
        tracing::info!(envelope_id = %self.envelope.id, "envelope completed");
        Ok(())
    }

    /// Mark the envelope signed once every mandatory signer has signed, even
    /// while approvers or carbon copies are still to come
    fn sign_when_due(&mut self, clock: &impl Clock) -> Result<(), WorkflowError> {
        if !matches!(
            self.envelope.status,
            EnvelopeStatus::Sent | EnvelopeStatus::Delivered
        ) {
            return Ok(());
        }
        let (signers, signed) = self
            .recipients
            .iter()
            .filter(|r| r.kind.signs() && !r.optional)
            .fold((0, 0), |(total, done), r| {
                (total + 1, done + usize::from(r.status == RecipientStatus::Signed))
            });
        if signers == 0 || signed < signers {
            return Ok(());
        }
        self.apply(EnvelopeAction::Sign, clock)?;
        tracing::info!(envelope_id = %self.envelope.id, signers, "envelope signed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
