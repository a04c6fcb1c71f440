// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn envelope() -> EnvelopeId {
    EnvelopeId::new("env-1")
}

fn acquire(holder: &str, token: &str, ttl: Duration) -> LockInput {
    LockInput::Acquire {
        holder: HolderId::new(holder),
        kind: LockKind::Edit,
        ttl,
        token: LockToken::new(token),
    }
}

fn granted(change: LockChange) -> EnvelopeLock {
    match change {
        LockChange::Granted { lock, .. } => lock,
        other => panic!("expected grant, got {:?}", other),
    }
}

#[test]
fn acquire_free_lock_succeeds() {
    let clock = FakeClock::new();
    let change = transition(
        &envelope(),
        None,
        acquire("user-1", "tok-1", Duration::from_secs(300)),
        &clock,
    )
    .unwrap();

    assert!(matches!(
        &change,
        LockChange::Granted { event: EventKind::LockAcquired { holder }, .. } if holder == "user-1"
    ));
    let lock = granted(change);
    assert!(lock.is_live(clock.now()));
    assert_eq!(lock.remaining_secs(clock.now()), 300);
}

#[test]
fn acquire_held_lock_by_other_holder_fails() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );

    let err = transition(
        &envelope(),
        Some(&lock),
        acquire("user-2", "tok-2", Duration::from_secs(60)),
        &clock,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::AlreadyLocked { ref holder, .. } if holder == "user-1"
    ));
}

#[test]
fn same_holder_reacquire_gets_fresh_token() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    let again = granted(
        transition(
            &envelope(),
            Some(&lock),
            acquire("user-1", "tok-2", Duration::from_secs(60)),
            &clock,
        )
        .unwrap(),
    );
    assert_eq!(again.token, LockToken::new("tok-2"));
}

#[test]
fn release_with_token_clears_lock() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    let change = transition(
        &envelope(),
        Some(&lock),
        LockInput::Release {
            token: LockToken::new("tok-1"),
        },
        &clock,
    )
    .unwrap();
    assert!(matches!(
        change,
        LockChange::Cleared {
            event: Some(EventKind::LockReleased { .. })
        }
    ));
}

#[test]
fn release_with_wrong_token_fails() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    let err = transition(
        &envelope(),
        Some(&lock),
        LockInput::Release {
            token: LockToken::new("tok-old"),
        },
        &clock,
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::TokenMismatch { .. }));
}

#[test]
fn release_of_absent_or_expired_lock_is_noop() {
    let clock = FakeClock::new();
    let release = || LockInput::Release {
        token: LockToken::new("tok-1"),
    };
    assert_eq!(
        transition(&envelope(), None, release(), &clock).unwrap(),
        LockChange::Cleared { event: None }
    );

    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(10)), &clock)
            .unwrap(),
    );
    clock.advance(Duration::from_secs(11));
    assert_eq!(
        transition(&envelope(), Some(&lock), release(), &clock).unwrap(),
        LockChange::Cleared { event: None }
    );
}

#[test]
fn zero_ttl_lock_is_immediately_absent() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::ZERO), &clock).unwrap(),
    );
    assert!(!lock.is_live(clock.now()));

    let change = transition(
        &envelope(),
        Some(&lock),
        acquire("user-2", "tok-2", Duration::from_secs(60)),
        &clock,
    )
    .unwrap();
    assert!(matches!(
        change,
        LockChange::Granted { event: EventKind::LockReclaimed { ref previous_holder, .. }, .. }
        if previous_holder == "user-1"
    ));
}

#[test]
fn stale_holder_cannot_release_new_holders_lock() {
    let clock = FakeClock::new();
    let old = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(10)), &clock)
            .unwrap(),
    );
    clock.advance(Duration::from_secs(20));
    let new = granted(
        transition(
            &envelope(),
            Some(&old),
            acquire("user-2", "tok-2", Duration::from_secs(60)),
            &clock,
        )
        .unwrap(),
    );

    let err = transition(
        &envelope(),
        Some(&new),
        LockInput::Release {
            token: LockToken::new("tok-1"),
        },
        &clock,
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::TokenMismatch { .. }));
}

#[test]
fn renew_extends_live_lock() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    clock.advance(Duration::from_secs(50));
    let renewed = granted(
        transition(
            &envelope(),
            Some(&lock),
            LockInput::Renew {
                token: LockToken::new("tok-1"),
                ttl: Duration::from_secs(60),
            },
            &clock,
        )
        .unwrap(),
    );
    assert_eq!(renewed.remaining_secs(clock.now()), 60);
    assert_eq!(renewed.acquired_at, lock.acquired_at);
}

#[test]
fn renew_of_expired_lock_fails() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    clock.advance(Duration::from_secs(61));
    let err = transition(
        &envelope(),
        Some(&lock),
        LockInput::Renew {
            token: LockToken::new("tok-1"),
            ttl: Duration::from_secs(60),
        },
        &clock,
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::LockExpired { .. }));
}

#[test]
fn verify_distinguishes_mismatch_from_expiry() {
    let clock = FakeClock::new();
    let lock = granted(
        transition(&envelope(), None, acquire("user-1", "tok-1", Duration::from_secs(60)), &clock)
            .unwrap(),
    );
    let now = clock.now();
    assert!(verify(&envelope(), Some(&lock), &LockToken::new("tok-1"), now).is_ok());
    assert!(matches!(
        verify(&envelope(), Some(&lock), &LockToken::new("x"), now),
        Err(WorkflowError::TokenMismatch { .. })
    ));
    let later = now + chrono::Duration::seconds(60);
    assert!(matches!(
        verify(&envelope(), Some(&lock), &LockToken::new("tok-1"), later),
        Err(WorkflowError::LockExpired { .. })
    ));
}

#[test]
fn liveness_boundary_is_exclusive() {
    let clock = FakeClock::new();
    let now = clock.now();
    assert!(!lease_is_live(now, now));
    assert!(lease_is_live(now + chrono::Duration::milliseconds(1), now));
}
