// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit trail records

use crate::delivery::FailureKey;
use crate::id::{AccountId, ConfigId, DocumentId, EnvelopeId, RecipientId, StepId, TabId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(UserId),
    /// Scheduler ticks, delivery workers
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{}", id),
            Actor::System => write!(f, "system"),
        }
    }
}

/// The record an audited action touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceRef {
    Envelope { id: EnvelopeId },
    Recipient { envelope_id: EnvelopeId, id: RecipientId },
    Document { envelope_id: EnvelopeId, id: DocumentId },
    Tab { envelope_id: EnvelopeId, id: TabId },
    WorkflowStep { envelope_id: EnvelopeId, id: StepId },
    Lock { envelope_id: EnvelopeId },
    ConnectConfig { id: ConfigId },
    ConnectFailure { key: FailureKey },
}

impl ResourceRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceRef::Envelope { .. } => "envelope",
            ResourceRef::Recipient { .. } => "recipient",
            ResourceRef::Document { .. } => "document",
            ResourceRef::Tab { .. } => "tab",
            ResourceRef::WorkflowStep { .. } => "workflow_step",
            ResourceRef::Lock { .. } => "lock",
            ResourceRef::ConnectConfig { .. } => "connect_config",
            ResourceRef::ConnectFailure { .. } => "connect_failure",
        }
    }

    pub fn id(&self) -> String {
        match self {
            ResourceRef::Envelope { id } => id.to_string(),
            ResourceRef::Recipient { id, .. } => id.to_string(),
            ResourceRef::Document { id, .. } => id.to_string(),
            ResourceRef::Tab { id, .. } => id.to_string(),
            ResourceRef::WorkflowStep { id, .. } => id.to_string(),
            ResourceRef::Lock { envelope_id } => envelope_id.to_string(),
            ResourceRef::ConnectConfig { id } => id.to_string(),
            ResourceRef::ConnectFailure { key } => key.to_string(),
        }
    }

    /// Envelope the resource hangs off, if any
    pub fn envelope_id(&self) -> Option<&EnvelopeId> {
        match self {
            ResourceRef::Envelope { id } => Some(id),
            ResourceRef::Recipient { envelope_id, .. }
            | ResourceRef::Document { envelope_id, .. }
            | ResourceRef::Tab { envelope_id, .. }
            | ResourceRef::WorkflowStep { envelope_id, .. }
            | ResourceRef::Lock { envelope_id } => Some(envelope_id),
            ResourceRef::ConnectFailure { key } => Some(&key.envelope_id),
            ResourceRef::ConnectConfig { .. } => None,
        }
    }
}

/// One append-only audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Assigned by the sink on append
    #[serde(default)]
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub account_id: AccountId,
    pub actor: Actor,
    /// Dotted action name, e.g. "envelope.void"
    pub action: String,
    pub resource: ResourceRef,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(
        account_id: AccountId,
        actor: Actor,
        action: impl Into<String>,
        resource: ResourceRef,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            sequence: 0,
            at,
            account_id,
            actor,
            action: action.into(),
            resource,
            before: None,
            after: None,
        }
    }

    pub fn before<T: Serialize>(mut self, value: Option<&T>) -> Self {
        self.before = value.and_then(snapshot);
        self
    }

    pub fn after<T: Serialize>(mut self, value: Option<&T>) -> Self {
        self.after = value.and_then(snapshot);
        self
    }
}

/// JSON snapshot of a record; records that fail to serialize are left out
pub fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
