// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine service: the internal API the surrounding application calls
//!
//! Every mutating call follows the same shape: read a snapshot, compute the
//! pure transition outside the store lock, then commit one batch whose
//! envelope version must be exactly one past the snapshot. A concurrent
//! writer that got there first turns the commit into `VersionConflict`.

mod delivery;
mod envelope;
mod locks;
mod recipients;
mod workflow;

pub use envelope::EnvelopeSummary;
pub use recipients::{NewRecipient, NewTab};

use crate::audit::{self, AuditSink, JsonlAuditSink, MemoryAuditSink};
use crate::error::EngineError;
use crate::progress::Progress;
use crate::publisher::{self, Outbox, Publisher};
use seal_adapters::WebhookAdapter;
use seal_core::coordination;
use seal_core::{
    Actor, AuditEntry, Clock, EngineConfig, Envelope, EnvelopeId, IdGen, LockToken,
    Operation, ResourceRef, Workflow, WorkflowError,
};
use seal_storage::{Batch, MaterializedState, Store};
use std::sync::{Arc, Mutex};

/// Adapter and storage dependencies
pub struct EngineDeps<W> {
    pub webhook: W,
    pub store: Store,
    pub audit: Arc<dyn AuditSink>,
}

/// Envelope workflow engine
pub struct Engine<W, C: Clock, I: IdGen> {
    store: Mutex<Store>,
    publisher: Publisher<W>,
    audit: Arc<dyn AuditSink>,
    outbox: Outbox,
    clock: C,
    id_gen: I,
    config: EngineConfig,
}

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: EngineDeps<W>, config: EngineConfig, clock: C, id_gen: I) -> Self {
        let outbox = Outbox::default();
        let carried = deps.store.state().outbox.len();
        if carried > 0 {
            tracing::info!(events = carried, "undelivered events carried over");
            outbox.notify();
        }
        Self {
            store: Mutex::new(deps.store),
            publisher: Publisher::new(deps.webhook, config.delivery.clone()),
            audit: deps.audit,
            outbox,
            clock,
            id_gen,
            config,
        }
    }

    /// Build the engine from configuration: WAL-backed when `wal_path` is
    /// set, JSONL audit when `audit_path` is set, in memory otherwise
    pub fn open(
        config: EngineConfig,
        webhook: W,
        clock: C,
        id_gen: I,
    ) -> Result<Self, EngineError> {
        let store = match &config.wal_path {
            Some(path) => Store::open(path)?,
            None => Store::in_memory(),
        };
        let audit: Arc<dyn AuditSink> = match &config.audit_path {
            Some(path) => {
                Arc::new(JsonlAuditSink::open(path.clone()).map_err(EngineError::AuditOpen)?)
            }
            None => Arc::new(MemoryAuditSink::new()),
        };
        tracing::info!(
            durable = config.wal_path.is_some(),
            audit_file = config.audit_path.is_some(),
            "engine opened"
        );
        Ok(Self::new(
            EngineDeps {
                webhook,
                store,
                audit,
            },
            config,
            clock,
            id_gen,
        ))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Events committed but not yet handed to the publisher
    pub fn pending_events(&self) -> usize {
        self.read(|state| self.outbox.unclaimed(state))
    }

    /// Run a read against the current state
    pub fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        f(store.state())
    }

    fn commit(&self, batch: Batch) -> Result<(), EngineError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.commit(batch)?;
        Ok(())
    }

    fn next_id(&self) -> String {
        self.id_gen.next()
    }

    /// Snapshot of one live envelope with its recipients and workflow
    fn load(&self, envelope_id: &EnvelopeId) -> Result<Progress, EngineError> {
        self.read(|state| {
            let envelope = state
                .envelope(envelope_id)
                .cloned()
                .ok_or_else(|| WorkflowError::not_found("envelope", envelope_id))?;
            let recipients = state.envelope_recipients(envelope_id);
            let workflow = state
                .workflow(envelope_id)
                .cloned()
                .unwrap_or_else(|| Workflow::new(envelope_id.clone()));
            Ok(Progress::new(envelope, recipients, workflow))
        })
    }

    /// Commit a settled working copy as one version bump on top of `batch`,
    /// then publish and audit
    fn save(
        &self,
        actor: &Actor,
        action: &str,
        before: &Progress,
        mut after: Progress,
        mut batch: Batch,
    ) -> Result<Envelope, EngineError> {
        after.envelope.version = before.envelope.version + 1;

        batch.push(Operation::EnvelopeSaved {
            envelope: after.envelope.clone(),
        });
        for recipient in &after.recipients {
            if before.recipients.iter().all(|r| r != recipient) {
                batch.push(Operation::RecipientSaved {
                    recipient: recipient.clone(),
                });
            }
        }
        if after.workflow != before.workflow {
            batch.push(Operation::WorkflowSaved {
                workflow: after.workflow.clone(),
            });
        }
        let queued = publisher::enqueue(&mut batch, &after.events);

        if let Err(e) = self.commit(batch) {
            if let EngineError::Workflow(WorkflowError::VersionConflict { .. }) = &e {
                tracing::warn!(envelope_id = %after.envelope.id, %action, "lost update race");
            }
            return Err(e);
        }

        tracing::info!(
            envelope_id = %after.envelope.id,
            %action,
            status = %after.envelope.status,
            version = after.envelope.version,
            events = after.events.len(),
            "envelope committed"
        );
        self.audit_progress(actor, action, before, &after);
        if queued {
            self.outbox.notify();
        }
        Ok(after.envelope)
    }

    /// Structural edits need an editable envelope and a live lock held
    /// under `token`. The returned batch carries the lock as a precondition
    /// so a release or reclaim racing the edit fails the commit.
    fn check_edit(&self, envelope: &Envelope, token: &LockToken) -> Result<Batch, EngineError> {
        if !envelope.can_be_modified() {
            return Err(not_modifiable(envelope).into());
        }
        let now = self.clock.now();
        self.read(|state| {
            coordination::verify(&envelope.id, state.lock_row(&envelope.id), token, now)
        })?;
        Ok(Batch::new().expect_lock(&envelope.id, Some(token)))
    }

    fn audit(&self, entry: AuditEntry) {
        audit::record(self.audit.as_ref(), entry);
    }

    /// One entry for the action itself, then one per recipient and step that changed
    fn audit_progress(&self, actor: &Actor, action: &str, before: &Progress, after: &Progress) {
        let envelope_id = &after.envelope.id;
        let account_id = &after.envelope.account_id;
        let now = self.clock.now();
        let entry = |action: String, resource: ResourceRef| {
            AuditEntry::new(account_id.clone(), actor.clone(), action, resource, now)
        };

        self.audit(
            entry(
                action.to_string(),
                ResourceRef::Envelope {
                    id: envelope_id.clone(),
                },
            )
            .before(Some(&before.envelope))
            .after(Some(&after.envelope)),
        );

        for recipient in &after.recipients {
            let previous = before.recipients.iter().find(|r| r.id == recipient.id);
            if previous == Some(recipient) {
                continue;
            }
            let action = match previous {
                Some(p) if p.status == recipient.status && recipient.frozen => {
                    "recipient.frozen".to_string()
                }
                Some(_) => format!("recipient.{}", recipient.status.as_str()),
                None => "recipient.add".to_string(),
            };
            self.audit(
                entry(
                    action,
                    ResourceRef::Recipient {
                        envelope_id: envelope_id.clone(),
                        id: recipient.id.clone(),
                    },
                )
                .before(previous)
                .after(Some(recipient)),
            );
        }

        for step in &after.workflow.steps {
            let previous = before.workflow.step(&step.id);
            if previous.map(|p| p.status) == Some(step.status) {
                continue;
            }
            let action = match previous {
                Some(_) => format!("workflow_step.{}", step.status.as_str()),
                None => "workflow_step.add".to_string(),
            };
            self.audit(
                entry(
                    action,
                    ResourceRef::WorkflowStep {
                        envelope_id: envelope_id.clone(),
                        id: step.id.clone(),
                    },
                )
                .before(previous)
                .after(Some(step)),
            );
        }
    }
}

/// Error for an envelope that no longer accepts structural edits
fn not_modifiable(envelope: &Envelope) -> WorkflowError {
    WorkflowError::InvalidTransition {
        resource: "envelope",
        id: envelope.id.to_string(),
        current: envelope.status.as_str().to_string(),
        attempted: "modify",
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
