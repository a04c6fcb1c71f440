// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status-change notification body

use crate::envelope::EnvelopeStatus;
use crate::event::Event;
use crate::id::{AccountId, EnvelopeId, RecipientId};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix on the signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub event_name: String,
    pub envelope_id: EnvelopeId,
    pub account_id: AccountId,
    pub timestamp: DateTime<Utc>,
    pub status: EnvelopeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<RecipientId>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl DeliveryPayload {
    pub fn from_event(event: &Event) -> Self {
        Self {
            event_name: event.name().to_string(),
            envelope_id: event.envelope_id.clone(),
            account_id: event.account_id.clone(),
            timestamp: event.at,
            status: event.status,
            recipient_id: event.recipient_id().cloned(),
            metadata: serde_json::to_value(&event.kind).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// HMAC-SHA256 over the body, hex encoded with a `sha256=` prefix
pub fn sign_body(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
