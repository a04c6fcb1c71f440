// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery attempt log and bounded-retry failure ledger
//!
//! A failure record exists per (account, envelope, endpoint). The first
//! failed attempt opens it at `retry_count = 0`; every automatic retry bumps
//! the count before the attempt is made. Once the count reaches
//! [`MAX_RETRY_ATTEMPTS`] the record is terminal and only a manual reset
//! makes it eligible again.

use super::payload::DeliveryPayload;
use crate::clock::add_std;
use crate::error::WorkflowError;
use crate::id::{AccountId, ConfigId, EnvelopeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on automatic retries per failure record
pub const MAX_RETRY_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FailureKey {
    pub account_id: AccountId,
    pub envelope_id: EnvelopeId,
    pub config_id: ConfigId,
}

impl std::fmt::Display for FailureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.account_id, self.envelope_id, self.config_id)
    }
}

/// Backoff schedule for automatic retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRY_ATTEMPTS,
            backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Configured attempts, never above the hard ceiling
    pub fn limit(&self) -> u32 {
        self.max_attempts.min(MAX_RETRY_ATTEMPTS)
    }

    /// Exponential delay before retry number `retry_count + 1`
    pub fn delay(&self, retry_count: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_count.min(16)).unwrap_or(u32::MAX);
        self.backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// One delivery attempt, successful or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectLog {
    pub account_id: AccountId,
    pub envelope_id: EnvelopeId,
    pub config_id: ConfigId,
    pub event_name: String,
    pub url: String,
    /// 0 for the first attempt, otherwise the retry number
    pub retry: u32,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    Retryable { next_retry_at: DateTime<Utc> },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectFailure {
    pub key: FailureKey,
    pub url: String,
    /// Undelivered payloads, oldest first
    pub pending: Vec<DeliveryPayload>,
    pub retry_count: u32,
    pub last_error: String,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
    /// None once exhausted
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl ConnectFailure {
    /// Open or extend the record after a failed attempt.
    ///
    /// Recording never increments `retry_count`; only [`begin_retry`] does.
    ///
    /// [`begin_retry`]: ConnectFailure::begin_retry
    pub fn record(
        existing: Option<&ConnectFailure>,
        key: FailureKey,
        url: &str,
        payload: DeliveryPayload,
        error: impl Into<String>,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> (ConnectFailure, FailureOutcome) {
        let mut failure = match existing {
            Some(existing) => existing.clone(),
            None => ConnectFailure {
                key,
                url: url.to_string(),
                pending: Vec::new(),
                retry_count: 0,
                last_error: String::new(),
                created_at: now,
                last_attempt_at: now,
                next_retry_at: None,
            },
        };
        if !failure.pending.contains(&payload) {
            failure.pending.push(payload);
        }
        failure.url = url.to_string();
        failure.last_error = error.into();
        failure.last_attempt_at = now;

        if failure.retry_count >= policy.limit() {
            failure.next_retry_at = None;
            (failure, FailureOutcome::Exhausted)
        } else {
            let next_retry_at = add_std(now, policy.delay(failure.retry_count));
            failure.next_retry_at = Some(next_retry_at);
            (failure, FailureOutcome::Retryable { next_retry_at })
        }
    }

    pub fn is_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.retry_count >= policy.limit()
    }

    pub fn is_due(&self, now: DateTime<Utc>, policy: &RetryPolicy) -> bool {
        !self.is_exhausted(policy) && self.next_retry_at.is_some_and(|at| at <= now)
    }

    /// Claim the next retry attempt
    pub fn begin_retry(
        &self,
        now: DateTime<Utc>,
        policy: &RetryPolicy,
    ) -> Result<ConnectFailure, WorkflowError> {
        if self.is_exhausted(policy) {
            return Err(WorkflowError::RetryExhausted {
                envelope_id: self.key.envelope_id.clone(),
                target: self.key.config_id.to_string(),
                attempts: self.retry_count,
            });
        }
        let mut next = self.clone();
        next.retry_count = (self.retry_count + 1).min(MAX_RETRY_ATTEMPTS);
        next.last_attempt_at = now;
        // Re-armed in case the attempt never reports back
        next.next_retry_at = Some(add_std(now, policy.delay(next.retry_count)));
        Ok(next)
    }

    /// Drop payloads that have now been delivered. Returns None once nothing is pending.
    pub fn delivered(&self, count: usize) -> Option<ConnectFailure> {
        let mut next = self.clone();
        next.pending.drain(..count.min(next.pending.len()));
        (!next.pending.is_empty()).then_some(next)
    }

    /// Manual reconciliation: make the record eligible again from zero
    pub fn reset(&self, now: DateTime<Utc>) -> ConnectFailure {
        let mut next = self.clone();
        next.retry_count = 0;
        next.next_retry_at = Some(now);
        next
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
