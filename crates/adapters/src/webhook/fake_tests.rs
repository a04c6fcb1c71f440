// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use seal_core::delivery::{sign_body, DeliveryPayload};

const URL: &str = "https://hooks.example.com/a";

#[tokio::test]
async fn fake_webhook_records_calls() {
    let adapter = FakeWebhookAdapter::new();
    let request = WebhookRequest::new(URL, br#"{"event_name":"envelope:sent"}"#.to_vec())
        .with_header("X-Seal-Signature", "sha256=abc");

    let response = adapter.post(&request).await.unwrap();
    assert_eq!(response.status, 200);

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].json()["event_name"], "envelope:sent");
    assert_eq!(calls[0].request.header("x-seal-signature"), Some("sha256=abc"));
}

#[tokio::test]
async fn down_url_fails_until_restored() {
    let adapter = FakeWebhookAdapter::new();
    adapter.set_down(URL);
    let request = WebhookRequest::new(URL, Vec::new());

    assert!(matches!(
        adapter.post(&request).await,
        Err(WebhookError::Transport(_))
    ));
    adapter.set_up(URL);
    assert!(adapter.post(&request).await.is_ok());
}

#[tokio::test]
async fn scripted_responses_are_consumed_in_order() {
    let adapter = FakeWebhookAdapter::new();
    adapter.push_response(URL, Err(WebhookError::Rejected { status: 503 }));
    let request = WebhookRequest::new(URL, Vec::new());

    let err = adapter.post(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(adapter.post(&request).await.is_ok());
    assert!(adapter.calls_to("https://other.example.com").is_empty());
}

#[test]
fn payload_request_is_signed_only_with_secret() {
    use chrono::TimeZone;
    use seal_core::{AccountId, EnvelopeId, EnvelopeStatus, Event, EventKind};

    let payload = DeliveryPayload::from_event(&Event {
        envelope_id: EnvelopeId::new("env-1"),
        account_id: AccountId::new("acct-1"),
        status: EnvelopeStatus::Sent,
        at: chrono::Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        kind: EventKind::EnvelopeSent,
    });

    let unsigned = WebhookRequest::for_payload(URL, &payload, None, "X-Seal-Signature").unwrap();
    assert_eq!(unsigned.header("X-Seal-Signature"), None);
    assert_eq!(unsigned.header("content-type"), Some("application/json"));

    let signed =
        WebhookRequest::for_payload(URL, &payload, Some("k"), "X-Seal-Signature").unwrap();
    let expected = sign_body("k", &signed.body).unwrap();
    assert_eq!(signed.header("X-Seal-Signature"), Some(expected.as_str()));
}
