// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::super::tests::{harness, sender};
use super::*;
use seal_core::{
    EnvelopeSettings, EnvelopeStatus, RecipientId, RecipientKind, RecipientStatus,
    StepCompletion, WorkflowStatus,
};

#[test]
fn steps_cannot_be_added_after_send() {
    let h = harness();
    let id = h.envelope(EnvelopeSettings::default());
    let token = h.lock(&id);
    h.add(&id, &token, RecipientKind::Signer, "alice", 1);
    h.engine.send_envelope(&sender(), &id).unwrap();

    let err = h
        .engine
        .add_workflow_step(
            &sender(),
            &id,
            &token,
            WorkflowStep::new(StepId::new("late"), "late step", Trigger::EnvelopeSent),
        )
        .unwrap_err();
    assert!(matches!(err.workflow(), Some(WorkflowError::StepState { .. })));
}

#[test]
fn step_must_reference_known_recipient() {
    let h = harness();
    let id = h.envelope(EnvelopeSettings::default());
    let token = h.lock(&id);

    let err = h
        .engine
        .add_workflow_step(
            &sender(),
            &id,
            &token,
            WorkflowStep::new(
                StepId::new("after-ghost"),
                "wait for ghost",
                Trigger::RecipientCompleted(RecipientId::new("ghost")),
            ),
        )
        .unwrap_err();
    assert!(matches!(err.workflow(), Some(WorkflowError::NotFound { .. })));
}

#[test]
fn approval_releases_held_group() {
    let h = harness();
    let id = h.envelope(EnvelopeSettings::sequential());
    let token = h.lock(&id);
    let alice = h.add(&id, &token, RecipientKind::Signer, "alice", 1);
    let bob = h.add(&id, &token, RecipientKind::Signer, "bob", 2);
    for step in [
        WorkflowStep::new(StepId::new("approval"), "manager approval", Trigger::EnvelopeSent)
            .completed_by(StepCompletion::Approval),
        WorkflowStep::new(
            StepId::new("release"),
            "release second signer",
            Trigger::StepCompleted(StepId::new("approval")),
        )
        .holding_routing_order(2),
    ] {
        h.engine
            .add_workflow_step(&sender(), &id, &token, step)
            .unwrap();
    }
    h.engine.send_envelope(&sender(), &id).unwrap();
    let bob_status = || {
        h.engine
            .recipients(&id)
            .into_iter()
            .find(|r| r.id == bob)
            .unwrap()
            .status
    };

    h.engine.recipient_complete(&sender(), &id, &alice, None).unwrap();
    assert_eq!(bob_status(), RecipientStatus::Created);
    let err = h
        .engine
        .recipient_complete(&sender(), &id, &bob, None)
        .unwrap_err();
    assert!(matches!(err.workflow(), Some(WorkflowError::RoutingBlocked { .. })));

    h.engine
        .approve_step(&sender(), &id, &StepId::new("approval"))
        .unwrap();
    assert_eq!(bob_status(), RecipientStatus::Sent);
    assert_eq!(
        h.engine.workflow(&id).unwrap().status,
        WorkflowStatus::Completed
    );
    let err = h
        .engine
        .approve_step(&sender(), &id, &StepId::new("approval"))
        .unwrap_err();
    assert!(matches!(err.workflow(), Some(WorkflowError::StepState { .. })));

    let envelope = h.engine.recipient_complete(&sender(), &id, &bob, None).unwrap();
    assert_eq!(envelope.status, EnvelopeStatus::Completed);
    assert!(h
        .audit
        .actions()
        .contains(&"workflow_step.completed".to_string()));
}

#[test]
fn approve_on_finished_envelope_is_rejected() {
    let h = harness();
    let id = h.envelope(EnvelopeSettings::default());
    let token = h.lock(&id);
    h.add(&id, &token, RecipientKind::Signer, "alice", 1);
    h.engine.send_envelope(&sender(), &id).unwrap();
    h.engine.void_envelope(&sender(), &id, "cancelled").unwrap();

    let err = h
        .engine
        .approve_step(&sender(), &id, &StepId::new("any"))
        .unwrap_err();
    assert!(matches!(
        err.workflow(),
        Some(WorkflowError::InvalidTransition { .. })
    ));
}
