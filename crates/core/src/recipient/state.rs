// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipient state machine

use super::auth::RecipientAuth;
use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::id::{EnvelopeId, RecipientId};
use crate::item::ItemRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a recipient plays in an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Signer,
    Approver,
    CarbonCopy,
    CertifiedDelivery,
    InPerson,
    Agent,
    Editor,
    Intermediary,
}

impl RecipientKind {
    /// Carbon copies and certified deliveries never hold up routing
    pub fn is_blocking(&self) -> bool {
        !matches!(
            self,
            RecipientKind::CarbonCopy | RecipientKind::CertifiedDelivery
        )
    }

    /// Kinds whose completion is a signature rather than an acknowledgement
    pub fn signs(&self) -> bool {
        matches!(self, RecipientKind::Signer | RecipientKind::InPerson)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientKind::Signer => "signer",
            RecipientKind::Approver => "approver",
            RecipientKind::CarbonCopy => "carbon_copy",
            RecipientKind::CertifiedDelivery => "certified_delivery",
            RecipientKind::InPerson => "in_person",
            RecipientKind::Agent => "agent",
            RecipientKind::Editor => "editor",
            RecipientKind::Intermediary => "intermediary",
        }
    }
}

/// Per-recipient progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Created,
    Sent,
    Delivered,
    Signed,
    Declined,
    Completed,
}

impl RecipientStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecipientStatus::Signed | RecipientStatus::Declined | RecipientStatus::Completed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecipientStatus::Signed | RecipientStatus::Completed)
    }

    /// Sent or delivered: the recipient has a pending action
    pub fn is_pending(&self) -> bool {
        matches!(self, RecipientStatus::Sent | RecipientStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientStatus::Created => "created",
            RecipientStatus::Sent => "sent",
            RecipientStatus::Delivered => "delivered",
            RecipientStatus::Signed => "signed",
            RecipientStatus::Declined => "declined",
            RecipientStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A party acting on an envelope or template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub parent: ItemRef,
    pub kind: RecipientKind,
    pub name: String,
    pub email: String,
    /// Recipients sharing a routing order act in parallel
    pub routing_order: u32,
    pub status: RecipientStatus,
    /// An optional recipient's decline does not decline the envelope
    #[serde(default)]
    pub optional: bool,
    /// Set when the envelope is voided while this recipient still had work pending
    #[serde(default)]
    pub frozen: bool,
    pub decline_reason: Option<String>,
    #[serde(default)]
    pub auth: RecipientAuth,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
}

impl Recipient {
    pub fn new(
        id: RecipientId,
        parent: ItemRef,
        kind: RecipientKind,
        name: impl Into<String>,
        email: impl Into<String>,
        routing_order: u32,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        let email = email.into();
        if routing_order == 0 {
            return Err(WorkflowError::validation(
                "routing order must be a positive integer",
            ));
        }
        if name.trim().is_empty() {
            return Err(WorkflowError::validation("recipient name is required"));
        }
        if !email.contains('@') {
            return Err(WorkflowError::validation(format!(
                "recipient email is invalid: {:?}",
                email
            )));
        }
        Ok(Self {
            id,
            parent,
            kind,
            name,
            email,
            routing_order,
            status: RecipientStatus::Created,
            optional: false,
            frozen: false,
            decline_reason: None,
            auth: RecipientAuth::default(),
            sent_at: None,
            delivered_at: None,
            signed_at: None,
            declined_at: None,
        })
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_auth(mut self, auth: RecipientAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn envelope_id(&self) -> Option<&EnvelopeId> {
        self.parent.as_envelope()
    }

    /// Counts toward progression: done successfully, or an optional decline
    pub fn is_satisfied(&self) -> bool {
        self.status.is_success() || (self.optional && self.status == RecipientStatus::Declined)
    }

    /// Declined while mandatory: halts routing and declines the envelope
    pub fn is_blocking_decline(&self) -> bool {
        self.kind.is_blocking() && !self.optional && self.status == RecipientStatus::Declined
    }

    /// Created -> sent
    pub fn activate(&self, clock: &impl Clock) -> Result<Recipient, WorkflowError> {
        if self.status != RecipientStatus::Created || self.frozen {
            return Err(self.invalid("activate"));
        }
        let mut next = self.clone();
        next.status = RecipientStatus::Sent;
        next.sent_at = Some(self.stamp(clock));
        Ok(next)
    }

    /// Sent -> delivered; repeated deliveries keep the first timestamp
    pub fn deliver(&self, clock: &impl Clock) -> Result<Recipient, WorkflowError> {
        match self.status {
            _ if self.frozen => Err(self.invalid("deliver to")),
            RecipientStatus::Sent => {
                let mut next = self.clone();
                next.status = RecipientStatus::Delivered;
                next.delivered_at = Some(self.stamp(clock));
                Ok(next)
            }
            RecipientStatus::Delivered => Ok(self.clone()),
            _ => Err(self.invalid("deliver to")),
        }
    }

    /// Sent or delivered -> signed (signing kinds) or completed (everyone else)
    pub fn complete(&self, clock: &impl Clock) -> Result<Recipient, WorkflowError> {
        if !self.status.is_pending() || self.frozen {
            return Err(self.invalid("complete"));
        }
        let mut next = self.clone();
        next.status = if self.kind.signs() {
            RecipientStatus::Signed
        } else {
            RecipientStatus::Completed
        };
        next.signed_at = Some(self.stamp(clock));
        Ok(next)
    }

    /// Sent or delivered -> declined, with a mandatory reason
    pub fn decline(&self, reason: &str, clock: &impl Clock) -> Result<Recipient, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("decline reason is required"));
        }
        if !self.status.is_pending() || self.frozen {
            return Err(self.invalid("decline"));
        }
        let mut next = self.clone();
        next.status = RecipientStatus::Declined;
        next.decline_reason = Some(reason.trim().to_string());
        next.declined_at = Some(self.stamp(clock));
        Ok(next)
    }

    /// Fails unless the recipient still has an action to take
    pub fn check_pending(&self, attempted: &'static str) -> Result<(), WorkflowError> {
        if !self.status.is_pending() || self.frozen {
            return Err(self.invalid(attempted));
        }
        Ok(())
    }

    /// Stop any pending action; used when the envelope is voided
    pub fn freeze(&self) -> Recipient {
        let mut next = self.clone();
        if !self.status.is_terminal() {
            next.frozen = true;
        }
        next
    }

    fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        [self.sent_at, self.delivered_at, self.signed_at, self.declined_at]
            .into_iter()
            .flatten()
            .max()
    }

    fn stamp(&self, clock: &impl Clock) -> DateTime<Utc> {
        let now = clock.now();
        self.latest_timestamp().map_or(now, |latest| latest.max(now))
    }

    fn invalid(&self, attempted: &'static str) -> WorkflowError {
        let current = if self.frozen {
            format!("{} (frozen)", self.status)
        } else {
            self.status.to_string()
        };
        WorkflowError::InvalidTransition {
            resource: "recipient",
            id: self.id.to_string(),
            current,
            attempted,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
