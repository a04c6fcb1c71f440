// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event publisher: fan-out to subscribed endpoints with bounded retry

use chrono::{DateTime, Utc};
use seal_adapters::{WebhookAdapter, WebhookError, WebhookRequest};
use seal_core::config::DeliveryConfig;
use seal_core::delivery::FailureOutcome;
use seal_core::{
    ConnectConfig, ConnectFailure, ConnectLog, DeliveryPayload, Event, FailureKey, Operation,
    RetryPolicy,
};
use seal_storage::{Batch, MaterializedState};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// Queue the deliverable events in `batch` so they commit with the change
/// that produced them. Returns whether anything was queued.
pub(crate) fn enqueue(batch: &mut Batch, events: &[Event]) -> bool {
    let events: Vec<Event> = events.iter().filter(|e| e.is_deliverable()).cloned().collect();
    if events.is_empty() {
        return false;
    }
    batch.push(Operation::EventsQueued { events });
    true
}

/// Wakes the publisher and remembers how far it has claimed the queue.
///
/// Queued events live in the store until delivered, so a restart between
/// commit and delivery hands them out again.
#[derive(Default)]
pub(crate) struct Outbox {
    claimed: Mutex<u64>,
    notify: Notify,
}

impl Outbox {
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Take the events past the claim watermark and move it forward
    pub fn claim(&self, state: &MaterializedState) -> Vec<(u64, Event)> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        let events = state.queued_events(*claimed);
        if let Some((last, _)) = events.last() {
            *claimed = *last;
        }
        events
    }

    /// Events queued in `state` that nobody has claimed yet
    pub fn unclaimed(&self, state: &MaterializedState) -> usize {
        let claimed = *self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        state.outbox.range(claimed.saturating_add(1)..).count()
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

/// Result of one delivery attempt
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub config: ConnectConfig,
    pub payload: DeliveryPayload,
    pub result: Result<u16, WebhookError>,
    pub elapsed_ms: u64,
}

/// Totals from a delivery or retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Failures that hit the retry ceiling during this pass
    pub exhausted: usize,
}

#[derive(Clone)]
pub(crate) struct Publisher<W> {
    webhook: W,
    config: DeliveryConfig,
}

impl<W: WebhookAdapter> Publisher<W> {
    pub fn new(webhook: W, config: DeliveryConfig) -> Self {
        Self { webhook, config }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    /// POST one payload, bounded by the per-attempt timeout
    pub async fn attempt(&self, config: ConnectConfig, payload: DeliveryPayload) -> Attempt {
        let start = Instant::now();
        let result = match WebhookRequest::for_payload(
            config.url.as_str(),
            &payload,
            config.secret.as_deref(),
            &self.config.signature_header,
        ) {
            Ok(request) => {
                match tokio::time::timeout(self.config.timeout, self.webhook.post(&request)).await
                {
                    Ok(Ok(response)) => Ok(response.status),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(WebhookError::Timeout),
                }
            }
            Err(e) => Err(WebhookError::Transport(format!("payload encoding failed: {}", e))),
        };
        Attempt {
            config,
            payload,
            result,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Deliver each run's payloads in order on its own task, so one slow
    /// or failing endpoint never holds up another. With `stop_on_failure`
    /// a run gives up at its first failed payload. Results come back in
    /// input order.
    pub async fn fan_out(
        &self,
        runs: Vec<(ConnectConfig, Vec<DeliveryPayload>)>,
        stop_on_failure: bool,
    ) -> Vec<Vec<Attempt>> {
        let mut set = JoinSet::new();
        let count = runs.len();
        for (index, (config, payloads)) in runs.into_iter().enumerate() {
            let publisher = self.clone();
            set.spawn(async move {
                let mut attempts = Vec::with_capacity(payloads.len());
                for payload in payloads {
                    let attempt = publisher.attempt(config.clone(), payload).await;
                    let failed = attempt.result.is_err();
                    attempts.push(attempt);
                    if failed && stop_on_failure {
                        break;
                    }
                }
                (index, attempts)
            });
        }

        let mut results = vec![Vec::new(); count];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, attempts)) => {
                    if let Some(slot) = results.get_mut(index) {
                        *slot = attempts;
                    }
                }
                Err(e) => tracing::error!(error = %e, "delivery task failed"),
            }
        }
        results
    }
}

/// Group the endpoint deliveries for a set of events, one run per endpoint
/// with payloads in event order
pub(crate) fn plan(
    state: &MaterializedState,
    events: &[Event],
) -> Vec<(ConnectConfig, Vec<DeliveryPayload>)> {
    let mut runs: Vec<(ConnectConfig, Vec<DeliveryPayload>)> = Vec::new();
    for event in events {
        let payload = DeliveryPayload::from_event(event);
        for config in state.connect_configs_for(&event.account_id) {
            if !config.wants(event) {
                continue;
            }
            match runs.iter_mut().find(|(c, _)| c.id == config.id) {
                Some((_, payloads)) => payloads.push(payload.clone()),
                None => runs.push((config.clone(), vec![payload.clone()])),
            }
        }
    }
    runs
}

/// Key for the ledger row an attempt belongs to
pub(crate) fn failure_key(config: &ConnectConfig, payload: &DeliveryPayload) -> FailureKey {
    FailureKey {
        account_id: config.account_id.clone(),
        envelope_id: payload.envelope_id.clone(),
        config_id: config.id.clone(),
    }
}

/// Log row for a finished attempt
pub(crate) fn log_entry(attempt: &Attempt, retry: u32, now: DateTime<Utc>) -> ConnectLog {
    ConnectLog {
        account_id: attempt.config.account_id.clone(),
        envelope_id: attempt.payload.envelope_id.clone(),
        config_id: attempt.config.id.clone(),
        event_name: attempt.payload.event_name.clone(),
        url: attempt.config.url.clone(),
        retry,
        success: attempt.result.is_ok(),
        status_code: match &attempt.result {
            Ok(status) => Some(*status),
            Err(e) => e.status(),
        },
        error: attempt.result.as_ref().err().map(|e| e.to_string()),
        elapsed_ms: attempt.elapsed_ms,
        at: now,
    }
}

/// Fold a failed attempt into the ledger, logging the outcome
pub(crate) fn record_failure(
    existing: Option<&ConnectFailure>,
    attempt: &Attempt,
    error: &WebhookError,
    now: DateTime<Utc>,
    policy: &RetryPolicy,
    report: &mut DeliveryReport,
) -> ConnectFailure {
    let key = failure_key(&attempt.config, &attempt.payload);
    let (failure, outcome) = ConnectFailure::record(
        existing,
        key,
        &attempt.config.url,
        attempt.payload.clone(),
        error.to_string(),
        now,
        policy,
    );
    report.failed += 1;
    match outcome {
        FailureOutcome::Retryable { next_retry_at } => tracing::warn!(
            config_id = %failure.key.config_id,
            envelope_id = %failure.key.envelope_id,
            event = %attempt.payload.event_name,
            retry_count = failure.retry_count,
            %next_retry_at,
            error = %error,
            "delivery failed, will retry"
        ),
        FailureOutcome::Exhausted => {
            report.exhausted += 1;
            tracing::error!(
                config_id = %failure.key.config_id,
                envelope_id = %failure.key.envelope_id,
                event = %attempt.payload.event_name,
                retry_count = failure.retry_count,
                error = %error,
                "delivery retries exhausted"
            );
        }
    }
    failure
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
