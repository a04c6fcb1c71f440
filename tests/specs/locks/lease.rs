//! Edit lock specs
//!
//! Verify the lease lifecycle: exclusive while live, reclaimable once
//! expired, and never released by a stale holder.

use crate::prelude::*;

fn draft(w: &World) -> EnvelopeId {
    w.engine
        .create_envelope(&sender(), account(), "Lease", EnvelopeSettings::default())
        .unwrap()
        .id
}

#[test]
fn acquire_then_release_frees_the_envelope() {
    let w = world();
    let id = draft(&w);
    let ana = UserId::new("ana");

    let lock = w.engine.acquire_lock(&id, &ana, LockKind::Edit, None).unwrap();
    w.engine
        .release_lock(&Actor::User(ana), &id, &lock.token)
        .unwrap();

    assert!(w.engine.lock(&id).is_none());
    w.engine
        .acquire_lock(&id, &UserId::new("ben"), LockKind::Edit, None)
        .unwrap();
}

#[test]
fn zero_ttl_lock_never_blocks_anyone() {
    let w = world();
    let id = draft(&w);

    w.engine
        .acquire_lock(&id, &UserId::new("ana"), LockKind::Edit, Some(Duration::ZERO))
        .unwrap();

    assert!(w.engine.lock(&id).is_none());
    let lock = w
        .engine
        .acquire_lock(&id, &UserId::new("ben"), LockKind::Edit, None)
        .unwrap();
    assert_eq!(lock.holder, UserId::new("ben"));
}

#[test]
fn expired_lease_is_reclaimed_and_old_token_is_dead() {
    let w = world();
    let id = draft(&w);
    let stale = w
        .engine
        .acquire_lock(&id, &UserId::new("ana"), LockKind::Edit, Some(Duration::from_secs(60)))
        .unwrap();
    let err = w
        .engine
        .acquire_lock(&id, &UserId::new("ben"), LockKind::Edit, None)
        .unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::AlreadyLocked { .. })
    ));

    w.clock.advance(Duration::from_secs(61));
    let fresh = w
        .engine
        .acquire_lock(&id, &UserId::new("ben"), LockKind::Edit, None)
        .unwrap();

    let err = w
        .engine
        .add_recipient(
            &sender(),
            &id,
            &stale.token,
            NewRecipient::new(RecipientKind::Signer, "alice", "alice@example.com", 1),
        )
        .unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::TokenMismatch { .. })
    ));
    let err = w
        .engine
        .release_lock(&Actor::User(UserId::new("ana")), &id, &stale.token)
        .unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::TokenMismatch { .. })
    ));
    assert_eq!(w.engine.lock(&id).unwrap().token, fresh.token);
}
