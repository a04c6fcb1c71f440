// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound webhook adapters

mod http;
mod noop;

pub use http::HttpWebhookAdapter;
pub use noop::NoOpWebhookAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWebhookAdapter, WebhookCall};

use async_trait::async_trait;
use seal_core::delivery::{sign_body, DeliveryPayload};
use thiserror::Error;

/// Errors from webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("endpoint returned HTTP {status}")]
    Rejected { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("delivery timed out")]
    Timeout,
}

impl WebhookError {
    /// HTTP status, when the endpoint answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            WebhookError::Rejected { status } => Some(*status),
            _ => None,
        }
    }
}

/// A signed POST ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub url: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl WebhookRequest {
    pub fn new(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            body,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        }
    }

    /// JSON body for the payload, signed when the endpoint has a secret
    pub fn for_payload(
        url: impl Into<String>,
        payload: &DeliveryPayload,
        secret: Option<&str>,
        signature_header: &str,
    ) -> Result<Self, serde_json::Error> {
        let body = payload.body()?;
        let signature = secret.and_then(|secret| sign_body(secret, &body));
        let request = Self::new(url, body);
        Ok(match signature {
            Some(signature) => request.with_header(signature_header, signature),
            None => request,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Successful (2xx) response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
}

/// Adapter for delivering notification payloads to external endpoints
#[async_trait]
pub trait WebhookAdapter: Clone + Send + Sync + 'static {
    /// POST the request; non-2xx answers are errors
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError>;
}
