// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope lock: an exclusive, time-bounded lease over structural edits
//!
//! Expired locks are inert. Nothing sweeps them; every reader compares the
//! expiry against the clock through [`lease_is_live`] and the next acquire
//! reclaims the row.

use crate::clock::{add_std, Clock};
use crate::error::WorkflowError;
use crate::event::EventKind;
use crate::id::{EnvelopeId, LockToken, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Holder identity attached to a lock
pub type HolderId = UserId;

/// The single expiry comparison used by every lock call site
pub fn lease_is_live(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now < expires_at
}

/// Why the lock is held
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    #[default]
    Edit,
    Send,
    Admin,
}

/// A persisted lock row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeLock {
    pub envelope_id: EnvelopeId,
    pub holder: HolderId,
    pub token: LockToken,
    pub kind: LockKind,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnvelopeLock {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        lease_is_live(self.expires_at, now)
    }

    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        &self.holder == holder
    }

    /// Seconds left on the lease, zero once expired
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Requests against an envelope's lock
#[derive(Clone, Debug)]
pub enum LockInput {
    Acquire {
        holder: HolderId,
        kind: LockKind,
        ttl: Duration,
        /// Fresh token minted by the caller
        token: LockToken,
    },
    Release {
        token: LockToken,
    },
    Renew {
        token: LockToken,
        ttl: Duration,
    },
}

/// Result of a lock transition, to be written to the lock row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockChange {
    /// Write this lock row
    Granted { lock: EnvelopeLock, event: EventKind },
    /// Delete the lock row, if any
    Cleared { event: Option<EventKind> },
}

/// Pure lock transition for one envelope.
///
/// `current` is the persisted row, live or not. Acquisition never waits: a
/// live lock held by someone else fails fast with `AlreadyLocked`.
pub fn transition(
    envelope_id: &EnvelopeId,
    current: Option<&EnvelopeLock>,
    input: LockInput,
    clock: &impl Clock,
) -> Result<LockChange, WorkflowError> {
    let now = clock.now();
    let live = current.filter(|l| l.is_live(now));

    match input {
        LockInput::Acquire {
            holder,
            kind,
            ttl,
            token,
        } => {
            let event = match (live, current) {
                (Some(existing), _) if !existing.is_held_by(&holder) => {
                    return Err(WorkflowError::AlreadyLocked {
                        envelope_id: envelope_id.clone(),
                        holder: existing.holder.to_string(),
                    });
                }
                // Same holder: replace with a fresh token
                (Some(_), _) => EventKind::LockAcquired {
                    holder: holder.to_string(),
                },
                (None, Some(stale)) => EventKind::LockReclaimed {
                    previous_holder: stale.holder.to_string(),
                    new_holder: holder.to_string(),
                },
                (None, None) => EventKind::LockAcquired {
                    holder: holder.to_string(),
                },
            };
            Ok(LockChange::Granted {
                lock: EnvelopeLock {
                    envelope_id: envelope_id.clone(),
                    holder,
                    token,
                    kind,
                    acquired_at: now,
                    expires_at: add_std(now, ttl),
                },
                event,
            })
        }

        LockInput::Release { token } => match live {
            Some(existing) if existing.token == token => Ok(LockChange::Cleared {
                event: Some(EventKind::LockReleased {
                    holder: existing.holder.to_string(),
                }),
            }),
            Some(_) => Err(WorkflowError::TokenMismatch {
                envelope_id: envelope_id.clone(),
            }),
            // Absent or expired: nothing to release
            None => Ok(LockChange::Cleared { event: None }),
        },

        LockInput::Renew { token, ttl } => match live {
            Some(existing) if existing.token == token => {
                let mut lock = existing.clone();
                lock.expires_at = add_std(now, ttl);
                Ok(LockChange::Granted {
                    event: EventKind::LockRenewed {
                        holder: lock.holder.to_string(),
                    },
                    lock,
                })
            }
            _ => Err(WorkflowError::LockExpired {
                envelope_id: envelope_id.clone(),
            }),
        },
    }
}

/// Check that `token` proves ownership of a live lock
pub fn verify(
    envelope_id: &EnvelopeId,
    current: Option<&EnvelopeLock>,
    token: &LockToken,
    now: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    match current.filter(|l| l.is_live(now)) {
        Some(lock) if &lock.token == token => Ok(()),
        Some(_) => Err(WorkflowError::TokenMismatch {
            envelope_id: envelope_id.clone(),
        }),
        None => Err(WorkflowError::LockExpired {
            envelope_id: envelope_id.clone(),
        }),
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
