//! Event delivery specs
//!
//! Verify subscribed endpoints receive events, failed deliveries are
//! retried with a bounded count, and an exhausted record can be reset.

use crate::prelude::*;
use seal_core::{ConfigId, ConnectConfig, EventPattern};

const ENDPOINT: &str = "https://hooks.example.com/signing";

fn subscribe(w: &World, patterns: &[&str]) {
    let config = ConnectConfig::new(
        ConfigId::new("crm"),
        account(),
        ENDPOINT,
        patterns.iter().map(|p| EventPattern::new(p)).collect(),
    )
    .unwrap()
    .with_secret("whsec");
    w.engine.register_connect_config(&sender(), config).unwrap();
}

#[tokio::test]
async fn completed_envelope_notifies_subscriber_in_order() {
    let w = world();
    subscribe(&w, &["envelope:*"]);
    let (id, _, ids) = w.draft(
        EnvelopeSettings::default(),
        &[(RecipientKind::Signer, "alice", 1)],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.recipient_delivered(&sender(), &id, &ids[0]).unwrap();
    w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();

    let report = w.engine.deliver_pending().await;

    assert_eq!(report.failed, 0);
    let names: Vec<String> = w
        .webhook
        .calls_to(ENDPOINT)
        .iter()
        .map(|c| c.json()["event_name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("envelope:sent"));
    assert_eq!(names.last().map(String::as_str), Some("envelope:completed"));
    assert!(w
        .webhook
        .calls_to(ENDPOINT)
        .iter()
        .all(|c| c.request.header("X-Seal-Signature").is_some()));
}

#[tokio::test]
async fn outage_retries_five_times_then_waits_for_reset() {
    let w = world();
    subscribe(&w, &["envelope:sent"]);
    w.webhook.set_down(ENDPOINT);
    let (id, _, _) = w.draft(
        EnvelopeSettings::default(),
        &[(RecipientKind::Signer, "alice", 1)],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.deliver_pending().await;

    let mut retries = 0;
    for _ in 0..10 {
        w.clock.advance(hours(1));
        retries += w.engine.retry_failures().await.attempted;
    }

    assert_eq!(retries, 5);
    let failure = w.engine.failures(&account()).remove(0);
    assert_eq!(failure.retry_count, 5);
    assert!(failure.next_retry_at.is_none());
    assert_eq!(w.engine.delivery_log(&id).len(), 6);
    assert_eq!(w.count_action("connect_failure.exhausted"), 1);

    w.webhook.set_up(ENDPOINT);
    w.engine.reset_failure(&sender(), &failure.key).unwrap();
    let report = w.engine.retry_failures().await;
    assert_eq!(report.delivered, 1);
    assert!(w.engine.failures(&account()).is_empty());
}
