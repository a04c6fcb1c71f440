//! Envelope lifecycle specs
//!
//! Verify an envelope moves from draft to a terminal status and that
//! its status timestamps never run backwards.

use crate::prelude::*;

fn assert_monotonic(envelope: &seal_core::Envelope) {
    let stamps: Vec<_> = envelope.status_timestamps().into_iter().flatten().collect();
    assert!(
        stamps.windows(2).all(|w| w[0] <= w[1]),
        "timestamps out of order: {:?}",
        stamps
    );
}

#[test]
fn sequential_signers_with_cooling_off_period_complete_in_order() {
    let w = world();
    let (id, token, ids) = w.draft(
        EnvelopeSettings::sequential(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    let (alice, bob) = (&ids[0], &ids[1]);
    w.engine
        .add_workflow_step(
            &sender(),
            &id,
            &token,
            WorkflowStep::new(
                StepId::new("cooling-off"),
                "wait a day before the counter-signature",
                Trigger::RecipientCompleted(alice.clone()),
            )
            .with_delay_hours(24)
            .holding_routing_order(2),
        )
        .unwrap();

    w.engine.send_envelope(&sender(), &id).unwrap();
    assert_eq!(w.recipient(&id, alice).status, RecipientStatus::Sent);
    assert_eq!(w.recipient(&id, bob).status, RecipientStatus::Created);

    w.clock.advance(Duration::from_secs(60));
    w.engine.recipient_delivered(&sender(), &id, alice).unwrap();
    assert_eq!(w.status(&id), EnvelopeStatus::Delivered);
    w.clock.advance(Duration::from_secs(60));
    w.engine.recipient_complete(&sender(), &id, alice, None).unwrap();
    assert_eq!(w.recipient(&id, bob).status, RecipientStatus::Created);

    w.clock.advance(hours(24));
    assert_eq!(w.engine.tick(), vec![id.clone()]);
    let bob_now = w.recipient(&id, bob);
    assert_eq!(bob_now.status, RecipientStatus::Sent);
    let alice_done = w.recipient(&id, alice);
    assert_eq!(
        bob_now.sent_at.unwrap() - alice_done.signed_at.unwrap(),
        chrono::Duration::hours(24)
    );

    w.clock.advance(Duration::from_secs(60));
    let envelope = w.engine.recipient_complete(&sender(), &id, bob, None).unwrap();
    assert_eq!(envelope.status, EnvelopeStatus::Completed);
    assert!(envelope.completed_date_time.is_some());
    assert_monotonic(&envelope);

    let summary = w.engine.status_summary(&id).unwrap();
    assert_eq!(summary.completion_percentage, 100);
}

#[test]
fn void_checks_reason_then_status() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::default(),
        &[(RecipientKind::Signer, "alice", 1)],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();
    assert_eq!(w.status(&id), EnvelopeStatus::Completed);

    let err = w.engine.void_envelope(&sender(), &id, "   ").unwrap_err();
    assert!(matches!(err.workflow(), Some(WorkflowError::Validation(_))));
    let err = w.engine.void_envelope(&sender(), &id, "too late").unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::InvalidTransition { .. })
    ));
    assert_eq!(w.status(&id), EnvelopeStatus::Completed);
}

#[test]
fn voided_envelope_keeps_signed_recipients_and_freezes_the_rest() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::sequential(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();

    let envelope = w.engine.void_envelope(&sender(), &id, "terms changed").unwrap();

    assert_eq!(envelope.status, EnvelopeStatus::Voided);
    assert_monotonic(&envelope);
    let alice = w.recipient(&id, &ids[0]);
    assert_eq!(alice.status, RecipientStatus::Signed);
    assert!(!alice.frozen);
    assert!(w.recipient(&id, &ids[1]).frozen);
}
