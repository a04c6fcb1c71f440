// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay
//!
//! Soft-deleted envelopes stay in the maps for audit and purge. Every read
//! path that serves callers filters them out explicitly; the `_including_deleted`
//! accessors are the only way to see them.

use chrono::{DateTime, Utc};
use seal_core::coordination::lease_is_live;
use seal_core::delivery::RetryPolicy;
use seal_core::{
    AccountId, ConfigId, ConnectConfig, ConnectFailure, ConnectLog, Document, DocumentId,
    Envelope, EnvelopeId, EnvelopeLock, Event, FailureKey, ItemRef, Operation, Recipient, RecipientId,
    Tab, TabId, Workflow,
};
use std::collections::{BTreeMap, HashMap};

/// Materialized state built from WAL operations
#[derive(Debug, Default, Clone)]
pub struct MaterializedState {
    pub envelopes: HashMap<EnvelopeId, Envelope>,
    pub recipients: HashMap<RecipientId, Recipient>,
    pub documents: HashMap<DocumentId, Document>,
    pub tabs: HashMap<TabId, Tab>,
    pub workflows: HashMap<EnvelopeId, Workflow>,
    /// At most one row per envelope; may be expired
    pub locks: HashMap<EnvelopeId, EnvelopeLock>,
    pub connect_configs: BTreeMap<ConfigId, ConnectConfig>,
    pub failures: BTreeMap<FailureKey, ConnectFailure>,
    pub connect_log: Vec<ConnectLog>,
    /// Events not yet delivered, keyed by queue sequence
    pub outbox: BTreeMap<u64, Event>,
    pub outbox_seq: u64,
}

impl MaterializedState {
    pub fn envelope(&self, id: &EnvelopeId) -> Option<&Envelope> {
        self.envelopes.get(id).filter(|e| !e.is_deleted())
    }

    pub fn envelope_including_deleted(&self, id: &EnvelopeId) -> Option<&Envelope> {
        self.envelopes.get(id)
    }

    pub fn envelopes_for(&self, account_id: &AccountId) -> Vec<&Envelope> {
        let mut envelopes: Vec<&Envelope> = self
            .envelopes
            .values()
            .filter(|e| !e.is_deleted() && &e.account_id == account_id)
            .collect();
        envelopes.sort_by(|a, b| a.created_date_time.cmp(&b.created_date_time).then(a.id.cmp(&b.id)));
        envelopes
    }

    /// Recipients of an item, ordered by routing order then id
    pub fn recipients_of(&self, parent: &ItemRef) -> Vec<Recipient> {
        let mut recipients: Vec<Recipient> = self
            .recipients
            .values()
            .filter(|r| &r.parent == parent)
            .cloned()
            .collect();
        recipients.sort_by(|a, b| a.routing_order.cmp(&b.routing_order).then(a.id.cmp(&b.id)));
        recipients
    }

    pub fn envelope_recipients(&self, id: &EnvelopeId) -> Vec<Recipient> {
        self.recipients_of(&ItemRef::Envelope(id.clone()))
    }

    pub fn documents_of(&self, parent: &ItemRef) -> Vec<&Document> {
        let mut documents: Vec<&Document> =
            self.documents.values().filter(|d| &d.parent == parent).collect();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        documents
    }

    pub fn tabs_of(&self, parent: &ItemRef) -> Vec<Tab> {
        let mut tabs: Vec<Tab> = self
            .tabs
            .values()
            .filter(|t| &t.parent == parent)
            .cloned()
            .collect();
        tabs.sort_by(|a, b| a.id.cmp(&b.id));
        tabs
    }

    pub fn workflow(&self, id: &EnvelopeId) -> Option<&Workflow> {
        self.workflows.get(id)
    }

    /// The lock on an envelope, treating expired rows as absent
    pub fn live_lock(&self, id: &EnvelopeId, now: DateTime<Utc>) -> Option<&EnvelopeLock> {
        self.locks
            .get(id)
            .filter(|lock| lease_is_live(lock.expires_at, now))
    }

    /// Raw lock row, expired or not
    pub fn lock_row(&self, id: &EnvelopeId) -> Option<&EnvelopeLock> {
        self.locks.get(id)
    }

    /// Enabled endpoints for an account
    pub fn connect_configs_for(&self, account_id: &AccountId) -> Vec<&ConnectConfig> {
        self.connect_configs
            .values()
            .filter(|c| c.enabled && &c.account_id == account_id)
            .collect()
    }

    pub fn failures_for(&self, account_id: &AccountId) -> Vec<&ConnectFailure> {
        self.failures
            .values()
            .filter(|f| &f.key.account_id == account_id)
            .collect()
    }

    /// Failures whose backoff has elapsed and that still have retries left
    pub fn retry_due(&self, now: DateTime<Utc>, policy: &RetryPolicy) -> Vec<&ConnectFailure> {
        let mut due: Vec<&ConnectFailure> = self
            .failures
            .values()
            .filter(|f| f.is_due(now, policy))
            .collect();
        due.sort_by(|a, b| a.next_retry_at.cmp(&b.next_retry_at));
        due
    }

    pub fn delivery_log(&self, envelope_id: &EnvelopeId) -> Vec<&ConnectLog> {
        self.connect_log
            .iter()
            .filter(|l| &l.envelope_id == envelope_id)
            .collect()
    }

    /// Queued events past `after`, in commit order
    pub fn queued_events(&self, after: u64) -> Vec<(u64, Event)> {
        self.outbox
            .range(after.saturating_add(1)..)
            .map(|(seq, event)| (*seq, event.clone()))
            .collect()
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::EnvelopeSaved { envelope } => {
                self.envelopes.insert(envelope.id.clone(), envelope.clone());
            }
            Operation::RecipientSaved { recipient } => {
                self.recipients.insert(recipient.id.clone(), recipient.clone());
            }
            Operation::DocumentSaved { document } => {
                self.documents.insert(document.id.clone(), document.clone());
            }
            Operation::TabSaved { tab } => {
                self.tabs.insert(tab.id.clone(), tab.clone());
            }
            Operation::WorkflowSaved { workflow } => {
                self.workflows
                    .insert(workflow.envelope_id.clone(), workflow.clone());
            }
            Operation::LockSaved { lock } => {
                self.locks.insert(lock.envelope_id.clone(), lock.clone());
            }
            Operation::LockCleared { envelope_id } => {
                self.locks.remove(envelope_id);
            }
            Operation::ConnectConfigSaved { config } => {
                self.connect_configs.insert(config.id.clone(), config.clone());
            }
            Operation::FailureSaved { failure } => {
                self.failures.insert(failure.key.clone(), failure.clone());
            }
            Operation::FailureResolved { key } => {
                self.failures.remove(key);
            }
            Operation::ConnectLogAppended { entry } => {
                self.connect_log.push(entry.clone());
            }
            Operation::EventsQueued { events } => {
                for event in events {
                    self.outbox_seq += 1;
                    self.outbox.insert(self.outbox_seq, event.clone());
                }
            }
            Operation::EventsDelivered { from, through } => {
                self.outbox.retain(|seq, _| !(*from..=*through).contains(seq));
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
