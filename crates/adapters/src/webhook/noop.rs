// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op webhook adapter for when outbound delivery is disabled.

use super::{WebhookAdapter, WebhookError, WebhookRequest, WebhookResponse};
use async_trait::async_trait;

/// Webhook adapter that accepts everything and sends nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpWebhookAdapter;

impl NoOpWebhookAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WebhookAdapter for NoOpWebhookAdapter {
    async fn post(&self, _request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        Ok(WebhookResponse { status: 204 })
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
