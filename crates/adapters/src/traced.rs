// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::webhook::{WebhookAdapter, WebhookError, WebhookRequest, WebhookResponse};
use async_trait::async_trait;

/// Wrapper that adds tracing to any WebhookAdapter
#[derive(Clone)]
pub struct TracedWebhookAdapter<W> {
    inner: W,
}

impl<W> TracedWebhookAdapter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W: WebhookAdapter> WebhookAdapter for TracedWebhookAdapter<W> {
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        let span = tracing::info_span!("webhook.deliver", url = %request.url);
        let _guard = span.enter();

        tracing::debug!(body_len = request.body.len(), "posting");

        // Precondition: only http(s) endpoints
        if !(request.url.starts_with("https://") || request.url.starts_with("http://")) {
            tracing::error!("refusing non-http endpoint");
            return Err(WebhookError::Transport(format!(
                "unsupported endpoint scheme: {}",
                request.url
            )));
        }

        let start = std::time::Instant::now();
        let result = self.inner.post(request).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => tracing::info!(
                status = response.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "delivered"
            ),
            Err(e) => tracing::warn!(
                status = ?e.status(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "delivery failed"
            ),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
