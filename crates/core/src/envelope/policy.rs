// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow toggles carried on an envelope
//!
//! Reminder and expiry are derived on read. Nothing here flips envelope
//! status; external reminder and purge processes consume the booleans.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeSettings {
    /// Enforce routing order between recipient groups
    #[serde(default)]
    pub sequential_signing: bool,
    #[serde(default)]
    pub reminders: ReminderPolicy,
    #[serde(default)]
    pub expiration: ExpirationPolicy,
}

impl EnvelopeSettings {
    pub fn sequential() -> Self {
        Self {
            sequential_signing: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPolicy {
    pub enabled: bool,
    /// Days after sending before the first reminder
    pub delay_days: u32,
    /// Days between subsequent reminders
    pub frequency_days: u32,
}

impl ReminderPolicy {
    /// Next reminder strictly after `now`, counted from the send time
    pub fn next_reminder_at(
        &self,
        sent_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.enabled {
            return None;
        }
        let first = sent_at + Duration::days(i64::from(self.delay_days));
        if first > now {
            return Some(first);
        }
        if self.frequency_days == 0 {
            return None;
        }
        let step = Duration::days(i64::from(self.frequency_days));
        let elapsed = now - first;
        let periods = elapsed.num_seconds() / step.num_seconds() + 1;
        Some(first + step * periods as i32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    pub enabled: bool,
    /// Days after sending at which the envelope expires
    pub expire_after_days: u32,
    /// Days before expiry at which a warning is due
    pub expire_warn_days: u32,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            expire_after_days: 120,
            expire_warn_days: 0,
        }
    }
}

impl ExpirationPolicy {
    pub fn expires_at(&self, sent_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.enabled
            .then(|| sent_at + Duration::days(i64::from(self.expire_after_days)))
    }

    pub fn is_expired(&self, sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.expires_at(sent_at).is_some_and(|at| now > at)
    }

    pub fn in_warning_window(&self, sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if self.expire_warn_days == 0 {
            return false;
        }
        match self.expires_at(sent_at) {
            Some(at) => {
                now >= at - Duration::days(i64::from(self.expire_warn_days)) && now <= at
            }
            None => false,
        }
    }
}
