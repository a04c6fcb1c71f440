// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event delivery: endpoint configuration, payloads and the retry ledger

mod config;
mod ledger;
mod payload;

pub use config::{ConnectConfig, EventPattern};
pub use ledger::{
    ConnectFailure, ConnectLog, FailureKey, FailureOutcome, RetryPolicy, MAX_RETRY_ATTEMPTS,
};
pub use payload::{sign_body, DeliveryPayload, SIGNATURE_PREFIX};
