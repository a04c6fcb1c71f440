// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account delivery endpoints and their event subscriptions

use crate::error::WorkflowError;
use crate::event::Event;
use crate::id::{AccountId, ConfigId};
use serde::{Deserialize, Serialize};

/// Pattern for matching event names
/// Supports:
///   - Exact: "envelope:completed"
///   - Single wildcard: "recipient:*" matches "recipient:sent", "recipient:declined"
///   - Trailing: "**" matches every remaining segment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.trim().to_string())
    }

    pub fn matches(&self, event_name: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0 == "*" || self.0 == "**" {
            return true;
        }

        let pattern_parts: Vec<&str> = self.0.split(':').collect();
        let event_parts: Vec<&str> = event_name.split(':').collect();
        Self::match_segments(&pattern_parts, &event_parts)
    }

    fn match_segments(pattern: &[&str], event: &[&str]) -> bool {
        match (pattern.first(), event.first()) {
            (None, None) => true,
            (Some(&"**"), _) => true,
            (Some(&"*"), Some(_)) => Self::match_segments(&pattern[1..], &event[1..]),
            (Some(p), Some(e)) if p == e => Self::match_segments(&pattern[1..], &event[1..]),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One notification endpoint for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub id: ConfigId,
    pub account_id: AccountId,
    pub url: String,
    pub enabled: bool,
    pub events: Vec<EventPattern>,
    /// HMAC key; when set, every body is signed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl ConnectConfig {
    pub fn new(
        id: ConfigId,
        account_id: AccountId,
        url: impl Into<String>,
        events: Vec<EventPattern>,
    ) -> Result<Self, WorkflowError> {
        let url = url.into();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(WorkflowError::validation(format!(
                "connect url must be http(s): {}",
                url
            )));
        }
        if events.iter().all(|p| p.as_str().is_empty()) {
            return Err(WorkflowError::validation(
                "connect configuration must subscribe to at least one event",
            ));
        }
        Ok(Self {
            id,
            account_id,
            url,
            enabled: true,
            events,
            secret: None,
        })
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret = (!secret.is_empty()).then_some(secret);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn subscribes_to(&self, event_name: &str) -> bool {
        self.events.iter().any(|p| p.matches(event_name))
    }

    /// Whether this endpoint should receive the event
    pub fn wants(&self, event: &Event) -> bool {
        self.enabled
            && event.account_id == self.account_id
            && event.is_deliverable()
            && self.subscribes_to(event.name())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
