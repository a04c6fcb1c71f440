// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking HTTP delivery via ureq, run off the async executor

use super::{WebhookAdapter, WebhookError, WebhookRequest, WebhookResponse};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpWebhookAdapter {
    agent: ureq::Agent,
}

impl HttpWebhookAdapter {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

fn post_blocking(
    agent: &ureq::Agent,
    request: &WebhookRequest,
) -> Result<WebhookResponse, WebhookError> {
    let mut builder = agent.post(request.url.as_str());
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder
        .send(request.body.as_slice())
        .map_err(|e| match e {
            ureq::Error::Timeout(_) => WebhookError::Timeout,
            ureq::Error::StatusCode(status) => WebhookError::Rejected { status },
            other => WebhookError::Transport(other.to_string()),
        })?;

    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        Ok(WebhookResponse { status })
    } else {
        Err(WebhookError::Rejected { status })
    }
}

#[async_trait]
impl WebhookAdapter for HttpWebhookAdapter {
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookResponse, WebhookError> {
        let agent = self.agent.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || post_blocking(&agent, &request))
            .await
            .map_err(|e| WebhookError::Transport(format!("delivery task failed: {}", e)))?
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
