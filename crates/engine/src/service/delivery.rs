// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event delivery and the failures view
//!
//! Delivery never runs inside a transition: commits queue events in the
//! store alongside the change and the publisher claims them, either when
//! called or from the background worker.

use super::Engine;
use crate::error::EngineError;
use crate::publisher::{self, Attempt, DeliveryReport};
use seal_adapters::WebhookAdapter;
use seal_core::{
    AccountId, Actor, AuditEntry, Clock, ConnectConfig, ConnectFailure, ConnectLog, EnvelopeId,
    Event, FailureKey, IdGen, Operation, ResourceRef, WorkflowError,
};
use seal_storage::Batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    /// Add or replace an endpoint configuration
    pub fn register_connect_config(
        &self,
        actor: &Actor,
        config: ConnectConfig,
    ) -> Result<ConnectConfig, EngineError> {
        let before = self.read(|state| state.connect_configs.get(&config.id).cloned());
        self.commit(Batch::new().with(Operation::ConnectConfigSaved {
            config: config.clone(),
        }))?;
        tracing::info!(
            config_id = %config.id,
            account_id = %config.account_id,
            enabled = config.enabled,
            patterns = config.events.len(),
            "connect config registered"
        );
        self.audit(
            AuditEntry::new(
                config.account_id.clone(),
                actor.clone(),
                if before.is_some() {
                    "connect_config.update"
                } else {
                    "connect_config.register"
                },
                ResourceRef::ConnectConfig {
                    id: config.id.clone(),
                },
                self.clock.now(),
            )
            .before(before.as_ref())
            .after(Some(&config)),
        );
        Ok(config)
    }

    /// Deliver everything in the outbox once to every subscribed endpoint.
    ///
    /// The queued events are removed from the store only after every
    /// attempt has been logged or folded into the failure ledger.
    pub async fn deliver_pending(&self) -> DeliveryReport {
        let claimed = self.read(|state| self.outbox.claim(state));
        let mut report = DeliveryReport::default();
        let (Some((from, _)), Some((through, _))) = (claimed.first(), claimed.last()) else {
            return report;
        };
        let (from, through) = (*from, *through);
        let events: Vec<Event> = claimed.into_iter().map(|(_, event)| event).collect();
        let runs = self.read(|state| publisher::plan(state, &events));
        tracing::debug!(events = events.len(), endpoints = runs.len(), "delivering events");

        for attempts in self.publisher.fan_out(runs, false).await {
            for attempt in &attempts {
                self.record_attempt(attempt, 0, &mut report);
            }
        }

        if let Err(e) = self.commit(Batch::new().with(Operation::EventsDelivered { from, through })) {
            tracing::error!(from, through, error = %e, "failed to clear delivered events");
        }
        report
    }

    /// Run one retry for every failure whose backoff has elapsed.
    ///
    /// Each retry is claimed (and counted) before it is attempted, then its
    /// pending payloads go out in order until one fails.
    pub async fn retry_failures(&self) -> DeliveryReport {
        let now = self.clock.now();
        let policy = self.publisher.policy();
        let due: Vec<(ConnectFailure, Option<ConnectConfig>)> = self.read(|state| {
            state
                .retry_due(now, &policy)
                .into_iter()
                .map(|f| (f.clone(), state.connect_configs.get(&f.key.config_id).cloned()))
                .collect()
        });

        let mut claimed = Vec::new();
        for (failure, config) in due {
            let Some(config) = config.filter(|c| c.enabled) else {
                tracing::warn!(key = %failure.key, "endpoint removed or disabled, retry skipped");
                continue;
            };
            let next = match failure.begin_retry(now, &policy) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(key = %failure.key, error = %e, "retry not started");
                    continue;
                }
            };
            if let Err(e) = self.commit(Batch::new().with(Operation::FailureSaved {
                failure: next.clone(),
            })) {
                tracing::error!(key = %next.key, error = %e, "failed to claim retry");
                continue;
            }
            tracing::info!(
                key = %next.key,
                retry = next.retry_count,
                pending = next.pending.len(),
                "retrying delivery"
            );
            claimed.push((next, config));
        }

        let runs = claimed
            .iter()
            .map(|(failure, config)| (config.clone(), failure.pending.clone()))
            .collect();
        let results = self.publisher.fan_out(runs, true).await;

        let mut report = DeliveryReport::default();
        for ((failure, _), attempts) in claimed.iter().zip(results) {
            self.finish_retry(failure, &attempts, &mut report);
        }
        report
    }

    /// Background task: deliver whenever the outbox fills, retry on an interval
    pub fn spawn_delivery_worker(self: &Arc<Self>) -> JoinHandle<()>
    where
        W: 'static,
        C: 'static,
        I: 'static,
    {
        let engine = Arc::clone(self);
        let period = engine
            .config
            .delivery
            .retry_backoff
            .max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut retry = tokio::time::interval(period);
            retry.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(retry_every = ?period, "delivery worker started");
            loop {
                tokio::select! {
                    _ = engine.outbox.wait() => {
                        engine.deliver_pending().await;
                    }
                    _ = retry.tick() => {
                        engine.retry_failures().await;
                    }
                }
            }
        })
    }

    /// Failures for an account, exhausted ones included
    pub fn failures(&self, account_id: &AccountId) -> Vec<ConnectFailure> {
        self.read(|state| state.failures_for(account_id).into_iter().cloned().collect())
    }

    /// Manual reconciliation: make a failure eligible for retry from zero
    pub fn reset_failure(&self, actor: &Actor, key: &FailureKey) -> Result<ConnectFailure, EngineError> {
        let before = self
            .read(|state| state.failures.get(key).cloned())
            .ok_or_else(|| WorkflowError::not_found("connect failure", key))?;
        let after = before.reset(self.clock.now());
        self.commit(Batch::new().with(Operation::FailureSaved {
            failure: after.clone(),
        }))?;
        tracing::info!(key = %key, pending = after.pending.len(), "connect failure reset");
        self.audit(
            AuditEntry::new(
                key.account_id.clone(),
                actor.clone(),
                "connect_failure.reset",
                ResourceRef::ConnectFailure { key: key.clone() },
                self.clock.now(),
            )
            .before(Some(&before))
            .after(Some(&after)),
        );
        Ok(after)
    }

    pub fn delivery_log(&self, envelope_id: &EnvelopeId) -> Vec<ConnectLog> {
        self.read(|state| state.delivery_log(envelope_id).into_iter().cloned().collect())
    }

    /// Log a first attempt and fold a failure into the ledger, atomically
    /// against other ledger writers
    fn record_attempt(&self, attempt: &Attempt, retry: u32, report: &mut DeliveryReport) {
        let now = self.clock.now();
        report.attempted += 1;
        let mut batch = Batch::new().with(Operation::ConnectLogAppended {
            entry: publisher::log_entry(attempt, retry, now),
        });

        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let exhausted = match &attempt.result {
            Ok(status) => {
                report.delivered += 1;
                tracing::info!(
                    config_id = %attempt.config.id,
                    envelope_id = %attempt.payload.envelope_id,
                    event = %attempt.payload.event_name,
                    status,
                    elapsed_ms = attempt.elapsed_ms,
                    "event delivered"
                );
                None
            }
            Err(error) => {
                let key = publisher::failure_key(&attempt.config, &attempt.payload);
                let failure = publisher::record_failure(
                    store.state().failures.get(&key),
                    attempt,
                    error,
                    now,
                    &self.publisher.policy(),
                    report,
                );
                let exhausted = failure.next_retry_at.is_none().then(|| failure.clone());
                batch.push(Operation::FailureSaved { failure });
                exhausted
            }
        };
        if let Err(e) = store.commit(batch) {
            tracing::error!(config_id = %attempt.config.id, error = %e, "failed to record delivery attempt");
            return;
        }
        drop(store);

        if let Some(failure) = exhausted {
            self.audit_exhausted(&failure);
        }
    }

    /// Log a retry run and settle its ledger row
    fn finish_retry(&self, claimed: &ConnectFailure, attempts: &[Attempt], report: &mut DeliveryReport) {
        let now = self.clock.now();
        let policy = self.publisher.policy();
        let mut batch = Batch::new();
        for attempt in attempts {
            report.attempted += 1;
            batch.push(Operation::ConnectLogAppended {
                entry: publisher::log_entry(attempt, claimed.retry_count, now),
            });
        }
        let delivered = attempts.iter().take_while(|a| a.result.is_ok()).count();
        report.delivered += delivered;

        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        // New events may have been appended while the retry was in flight
        let current = store
            .state()
            .failures
            .get(&claimed.key)
            .cloned()
            .unwrap_or_else(|| claimed.clone());
        let remaining = current.delivered(delivered);

        let mut exhausted = None;
        match (remaining, attempts.last()) {
            (Some(remaining), Some(attempt)) if attempt.result.is_err() => {
                if let Err(error) = &attempt.result {
                    let failure = publisher::record_failure(
                        Some(&remaining),
                        attempt,
                        error,
                        now,
                        &policy,
                        report,
                    );
                    if failure.next_retry_at.is_none() {
                        exhausted = Some(failure.clone());
                    }
                    batch.push(Operation::FailureSaved { failure });
                }
            }
            (Some(remaining), _) => batch.push(Operation::FailureSaved { failure: remaining }),
            (None, _) => {
                tracing::info!(key = %claimed.key, retry = claimed.retry_count, "connect failure resolved");
                batch.push(Operation::FailureResolved {
                    key: claimed.key.clone(),
                });
            }
        }
        if let Err(e) = store.commit(batch) {
            tracing::error!(key = %claimed.key, error = %e, "failed to record retry");
            return;
        }
        drop(store);

        if let Some(failure) = exhausted {
            self.audit_exhausted(&failure);
        }
    }

    fn audit_exhausted(&self, failure: &ConnectFailure) {
        self.audit(
            AuditEntry::new(
                failure.key.account_id.clone(),
                Actor::System,
                "connect_failure.exhausted",
                ResourceRef::ConnectFailure {
                    key: failure.key.clone(),
                },
                self.clock.now(),
            )
            .after(Some(failure)),
        );
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
