//! Routing specs
//!
//! Verify routing groups open strictly in order under sequential signing.

use crate::prelude::*;

#[test]
fn later_group_waits_for_every_parallel_signer() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::sequential(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "carol", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    let (alice, carol, bob) = (&ids[0], &ids[1], &ids[2]);
    w.engine.send_envelope(&sender(), &id).unwrap();

    w.engine.recipient_complete(&sender(), &id, alice, None).unwrap();
    let err = w
        .engine
        .recipient_complete(&sender(), &id, bob, None)
        .unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::RoutingBlocked { .. })
    ));
    assert_eq!(w.recipient(&id, bob).status, RecipientStatus::Created);

    w.engine.recipient_complete(&sender(), &id, carol, None).unwrap();
    assert_eq!(w.recipient(&id, bob).status, RecipientStatus::Sent);
    assert_eq!(
        w.engine.status_summary(&id).unwrap().current_routing_order,
        Some(2)
    );
}

#[test]
fn parallel_routing_ignores_order() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::default(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();

    w.engine.recipient_complete(&sender(), &id, &ids[1], None).unwrap();
    let envelope = w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();
    assert_eq!(envelope.status, EnvelopeStatus::Completed);
}

#[test]
fn workflow_trigger_fires_once() {
    let w = world();
    let (id, token, ids) = w.draft(
        EnvelopeSettings::sequential(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    w.engine
        .add_workflow_step(
            &sender(),
            &id,
            &token,
            WorkflowStep::new(StepId::new("notify"), "notify legal", Trigger::EnvelopeSent),
        )
        .unwrap();

    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.recipient_delivered(&sender(), &id, &ids[0]).unwrap();
    w.engine.recipient_delivered(&sender(), &id, &ids[0]).unwrap();
    w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();
    w.engine.tick();
    w.engine.recipient_complete(&sender(), &id, &ids[1], None).unwrap();

    assert_eq!(w.count_action("workflow_step.completed"), 1);
    let step = &w.engine.workflow(&id).unwrap().steps[0];
    assert_eq!(step.trigger_seq, Some(1));
}

#[test]
fn mandatory_decline_ends_the_envelope() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::sequential(),
        &[
            (RecipientKind::Signer, "alice", 1),
            (RecipientKind::Signer, "bob", 2),
        ],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();

    let envelope = w
        .engine
        .recipient_decline(&sender(), &id, &ids[0], "price is wrong")
        .unwrap();

    assert_eq!(envelope.status, EnvelopeStatus::Declined);
    assert_eq!(envelope.declined_by.as_ref(), Some(&ids[0]));
    assert_eq!(envelope.declined_reason.as_deref(), Some("price is wrong"));
    assert!(w.recipient(&id, &ids[1]).frozen);
}
