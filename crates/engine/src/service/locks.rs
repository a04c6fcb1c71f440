// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope lock operations
//!
//! Lock rows are written with the previously stored token as a
//! precondition, so of two racing acquires on an expired row only one lands.

use super::Engine;
use crate::error::EngineError;
use seal_adapters::WebhookAdapter;
use seal_core::coordination::{lock, LockChange, LockInput};
use seal_core::{
    Actor, AuditEntry, Clock, Envelope, EnvelopeId, EnvelopeLock, Event, EventKind, IdGen,
    LockKind, LockToken, Operation, ResourceRef, UserId, WorkflowError,
};
use seal_storage::{Batch, StoreError};
use std::time::Duration;

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    /// Take the lock, failing fast with `AlreadyLocked` if someone else
    /// holds a live one. `ttl` defaults to the configured TTL and is
    /// clamped to the configured maximum.
    pub fn acquire_lock(
        &self,
        envelope_id: &EnvelopeId,
        holder: &UserId,
        kind: LockKind,
        ttl: Option<Duration>,
    ) -> Result<EnvelopeLock, EngineError> {
        let input = LockInput::Acquire {
            holder: holder.clone(),
            kind,
            ttl: self.config.lock.effective_ttl(ttl),
            token: LockToken::new(self.next_id()),
        };
        let result = self.change_lock(&Actor::User(holder.clone()), envelope_id, input);
        if let Err(EngineError::Workflow(WorkflowError::AlreadyLocked { holder: current, .. })) =
            &result
        {
            tracing::info!(
                envelope_id = %envelope_id,
                requested_by = %holder,
                held_by = %current,
                "lock conflict"
            );
        }
        result?.ok_or_else(|| WorkflowError::not_found("lock", envelope_id).into())
    }

    /// Release under `token`. Absent or expired locks release as a no-op.
    pub fn release_lock(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
    ) -> Result<(), EngineError> {
        self.change_lock(
            actor,
            envelope_id,
            LockInput::Release {
                token: token.clone(),
            },
        )?;
        Ok(())
    }

    pub fn renew_lock(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
        ttl: Option<Duration>,
    ) -> Result<EnvelopeLock, EngineError> {
        let input = LockInput::Renew {
            token: token.clone(),
            ttl: self.config.lock.effective_ttl(ttl),
        };
        self.change_lock(actor, envelope_id, input)?
            .ok_or_else(|| WorkflowError::LockExpired {
                envelope_id: envelope_id.clone(),
            }
            .into())
    }

    /// The live lock, if any
    pub fn lock(&self, envelope_id: &EnvelopeId) -> Option<EnvelopeLock> {
        let now = self.clock.now();
        self.read(|state| state.live_lock(envelope_id, now).cloned())
    }

    /// Apply a lock transition; returns the lock row when one was written
    fn change_lock(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        input: LockInput,
    ) -> Result<Option<EnvelopeLock>, EngineError> {
        let current = self.read(|state| state.lock_row(envelope_id).cloned());
        self.change_lock_from(actor, envelope_id, current, input)
    }

    /// Apply a lock transition decided against `current`. An acquire that
    /// loses the row to a concurrent writer decides once more against the
    /// winner, so it reports `AlreadyLocked` rather than a token mismatch.
    fn change_lock_from(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        current: Option<EnvelopeLock>,
        input: LockInput,
    ) -> Result<Option<EnvelopeLock>, EngineError> {
        let retry = matches!(input, LockInput::Acquire { .. }).then(|| input.clone());
        if let LockWrite::Written(lock) =
            self.write_lock(actor, envelope_id, current.as_ref(), input)?
        {
            return Ok(lock);
        }
        let Some(input) = retry else {
            return Err(WorkflowError::TokenMismatch {
                envelope_id: envelope_id.clone(),
            }
            .into());
        };

        tracing::info!(envelope_id = %envelope_id, "lock row changed under acquire, retrying");
        let current = self.read(|state| state.lock_row(envelope_id).cloned());
        match self.write_lock(actor, envelope_id, current.as_ref(), input)? {
            LockWrite::Written(lock) => Ok(lock),
            LockWrite::Raced => {
                let holder = self
                    .read(|state| state.lock_row(envelope_id).map(|l| l.holder.to_string()))
                    .unwrap_or_default();
                Err(WorkflowError::AlreadyLocked {
                    envelope_id: envelope_id.clone(),
                    holder,
                }
                .into())
            }
        }
    }

    fn write_lock(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        current: Option<&EnvelopeLock>,
        input: LockInput,
    ) -> Result<LockWrite, EngineError> {
        let envelope = self
            .read(|state| state.envelope(envelope_id).cloned())
            .ok_or_else(|| WorkflowError::not_found("envelope", envelope_id))?;
        let change = lock::transition(envelope_id, current, input, &self.clock)?;
        let batch = Batch::new().expect_lock(envelope_id, current.map(|l| &l.token));

        let (written, event) = match change {
            LockChange::Granted { lock, event } => {
                if !self.commit_lock(batch.with(Operation::LockSaved { lock: lock.clone() }))? {
                    return Ok(LockWrite::Raced);
                }
                (Some(lock), Some(event))
            }
            LockChange::Cleared { event } => {
                if current.is_some()
                    && !self.commit_lock(batch.with(Operation::LockCleared {
                        envelope_id: envelope_id.clone(),
                    }))?
                {
                    return Ok(LockWrite::Raced);
                }
                (None, event)
            }
        };

        if let Some(kind) = event {
            self.audit_lock(actor, &envelope, current, written.as_ref(), kind);
        }
        Ok(LockWrite::Written(written))
    }

    /// Commit a lock row; `false` when the stored token no longer matches
    fn commit_lock(&self, batch: Batch) -> Result<bool, EngineError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        match store.commit(batch) {
            Ok(()) => Ok(true),
            Err(StoreError::LockChanged { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn audit_lock(
        &self,
        actor: &Actor,
        envelope: &Envelope,
        before: Option<&EnvelopeLock>,
        after: Option<&EnvelopeLock>,
        kind: EventKind,
    ) {
        let now = self.clock.now();
        let event: Event = envelope.event(kind, now);
        let action = event.name().replace(':', ".");
        tracing::info!(
            envelope_id = %envelope.id,
            %action,
            holder = after.or(before).map(|l| l.holder.to_string()).unwrap_or_default(),
            expires_at = ?after.map(|l| l.expires_at),
            "lock changed"
        );
        self.audit(
            AuditEntry::new(
                envelope.account_id.clone(),
                actor.clone(),
                action,
                ResourceRef::Lock {
                    envelope_id: envelope.id.clone(),
                },
                now,
            )
            .before(before)
            .after(after),
        );
    }
}

enum LockWrite {
    Written(Option<EnvelopeLock>),
    Raced,
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
