// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use seal_core::{
    AccountId, EnvelopeId, EnvelopeSettings, FakeClock, ItemRef, RecipientKind, RecipientStatus,
    StepId, WorkflowStep,
};
use std::time::Duration;

fn recipient(id: &str, kind: RecipientKind, order: u32) -> Recipient {
    Recipient::new(
        RecipientId::new(id),
        ItemRef::Envelope(EnvelopeId::new("env-1")),
        kind,
        id,
        format!("{}@example.com", id),
        order,
    )
    .unwrap()
}

fn sent(recipients: Vec<Recipient>, steps: Vec<WorkflowStep>, clock: &FakeClock) -> Progress {
    let envelope = Envelope::new(
        EnvelopeId::new("env-1"),
        AccountId::new("acct-1"),
        "Contract",
        EnvelopeSettings::sequential(),
        clock,
    );
    let mut workflow = Workflow::new(EnvelopeId::new("env-1"));
    for step in steps {
        workflow = workflow.add_step(step).unwrap();
    }
    let mut progress = Progress::new(envelope, recipients, workflow);
    progress.apply(EnvelopeAction::Send, clock).unwrap();
    progress.settle(vec![Trigger::EnvelopeSent], clock).unwrap();
    progress
}

fn complete(progress: &mut Progress, id: &str, clock: &FakeClock) {
    let id = RecipientId::new(id);
    let next = progress.recipient(&id).unwrap().complete(clock).unwrap();
    progress.replace_recipient(next);
    progress
        .settle(vec![Trigger::RecipientCompleted(id)], clock)
        .unwrap();
}

fn status(progress: &Progress, id: &str) -> RecipientStatus {
    progress.recipient(&RecipientId::new(id)).unwrap().status
}

#[test]
fn send_activates_first_group_only() {
    let clock = FakeClock::new();
    let progress = sent(
        vec![
            recipient("a", RecipientKind::Signer, 1),
            recipient("b", RecipientKind::Signer, 1),
            recipient("c", RecipientKind::Signer, 2),
        ],
        vec![],
        &clock,
    );

    assert_eq!(status(&progress, "a"), RecipientStatus::Sent);
    assert_eq!(status(&progress, "b"), RecipientStatus::Sent);
    assert_eq!(status(&progress, "c"), RecipientStatus::Created);
    assert_eq!(progress.workflow.current_routing_order, Some(1));
}

#[test]
fn finishing_group_activates_next_and_completion_closes_envelope() {
    let clock = FakeClock::new();
    let mut progress = sent(
        vec![
            recipient("a", RecipientKind::Signer, 1),
            recipient("b", RecipientKind::Signer, 1),
            recipient("c", RecipientKind::Signer, 2),
        ],
        vec![],
        &clock,
    );

    complete(&mut progress, "a", &clock);
    assert_eq!(status(&progress, "c"), RecipientStatus::Created);
    complete(&mut progress, "b", &clock);
    assert_eq!(status(&progress, "c"), RecipientStatus::Sent);

    complete(&mut progress, "c", &clock);
    assert_eq!(progress.envelope.status, EnvelopeStatus::Completed);
    let names: Vec<&str> = progress.events.iter().map(|e| e.name()).collect();
    assert!(names.ends_with(&["envelope:signed", "envelope:completed"]));
}

#[test]
fn empty_cc_group_is_skipped() {
    let clock = FakeClock::new();
    let progress = sent(
        vec![
            recipient("cc", RecipientKind::CarbonCopy, 1),
            recipient("s", RecipientKind::Signer, 2),
        ],
        vec![],
        &clock,
    );
    assert_eq!(status(&progress, "s"), RecipientStatus::Sent);
}

#[test]
fn workflow_hold_releases_on_tick() {
    let clock = FakeClock::new();
    let step = WorkflowStep::new(
        StepId::new("wait"),
        "pause before second signer",
        Trigger::RecipientCompleted(RecipientId::new("a")),
    )
    .with_delay_hours(24)
    .holding_routing_order(2);
    let mut progress = sent(
        vec![
            recipient("a", RecipientKind::Signer, 1),
            recipient("b", RecipientKind::Signer, 2),
        ],
        vec![step],
        &clock,
    );

    complete(&mut progress, "a", &clock);
    assert_eq!(status(&progress, "b"), RecipientStatus::Created);
    assert!(progress
        .router()
        .check_can_act(progress.recipient(&RecipientId::new("b")).unwrap())
        .is_err());

    clock.advance(Duration::from_secs(24 * 3600));
    progress.tick(clock.now());
    progress.settle(vec![], &clock).unwrap();
    assert_eq!(status(&progress, "b"), RecipientStatus::Sent);
}

#[test]
fn routing_order_completion_triggers_step() {
    let clock = FakeClock::new();
    let step = WorkflowStep::new(
        StepId::new("after-first"),
        "notify legal",
        Trigger::RoutingOrderCompleted(1),
    );
    let mut progress = sent(
        vec![
            recipient("a", RecipientKind::Signer, 1),
            recipient("b", RecipientKind::Signer, 2),
        ],
        vec![step],
        &clock,
    );
    complete(&mut progress, "a", &clock);

    let step = progress.workflow.step(&StepId::new("after-first")).unwrap();
    assert_eq!(step.status, seal_core::StepStatus::Completed);
}

#[test]
fn envelope_is_signed_before_the_approver_acts() {
    let clock = FakeClock::new();
    let mut progress = sent(
        vec![
            recipient("a", RecipientKind::Signer, 1),
            recipient("ap", RecipientKind::Approver, 2),
        ],
        vec![],
        &clock,
    );

    complete(&mut progress, "a", &clock);
    assert_eq!(progress.envelope.status, EnvelopeStatus::Signed);
    assert!(progress.envelope.signed_date_time.is_some());
    assert_eq!(status(&progress, "ap"), RecipientStatus::Sent);

    complete(&mut progress, "ap", &clock);
    assert_eq!(progress.envelope.status, EnvelopeStatus::Completed);
    let signed = progress
        .events
        .iter()
        .filter(|e| e.name() == "envelope:signed")
        .count();
    assert_eq!(signed, 1);
}

#[test]
fn approver_only_envelope_completes_without_sign_step() {
    let clock = FakeClock::new();
    let mut progress = sent(vec![recipient("ap", RecipientKind::Approver, 1)], vec![], &clock);
    complete(&mut progress, "ap", &clock);

    assert_eq!(progress.envelope.status, EnvelopeStatus::Completed);
    assert!(progress.envelope.signed_date_time.is_some());
    assert!(!progress.events.iter().any(|e| e.name() == "envelope:signed"));
}
