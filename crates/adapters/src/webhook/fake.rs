// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake webhook adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{WebhookAdapter, WebhookError, WebhookRequest, WebhookResponse};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded webhook call
#[derive(Debug, Clone)]
pub struct WebhookCall {
    pub request: WebhookRequest,
    pub result: Result<WebhookResponse, WebhookError>,
}

impl WebhookCall {
    /// Decoded JSON body
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.request.body).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct FakeState {
    calls: Vec<WebhookCall>,
    scripted: HashMap<String, VecDeque<Result<WebhookResponse, WebhookError>>>,
    down: HashSet<String>,
    delay: Option<Duration>,
}

/// Fake webhook adapter for testing
///
/// Answers 200 unless a URL is marked down or has scripted responses queued.
#[derive(Clone, Default)]
pub struct FakeWebhookAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeWebhookAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<WebhookCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<WebhookCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.request.url == url)
            .collect()
    }

    /// Every call to this URL fails with a connection error until restored
    pub fn set_down(&self, url: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.down.insert(url.to_string());
    }

    pub fn set_up(&self, url: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.down.remove(url);
    }

    /// Queue a one-shot response for the next call to this URL
    pub fn push_response(&self, url: &str, result: Result<WebhookResponse, WebhookError>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .scripted
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    /// Sleep before answering, for exercising timeouts
    pub fn set_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.delay = Some(delay);
    }
}

#[async_trait]
impl WebhookAdapter for FakeWebhookAdapter {
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        let delay = self.inner.lock().unwrap_or_else(|e| e.into_inner()).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let result = if let Some(result) = inner
            .scripted
            .get_mut(&request.url)
            .and_then(|queue| queue.pop_front())
        {
            result
        } else if inner.down.contains(&request.url) {
            Err(WebhookError::Transport("connection refused".to_string()))
        } else {
            Ok(WebhookResponse { status: 200 })
        };

        inner.calls.push(WebhookCall {
            request: request.clone(),
            result: result.clone(),
        });
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
