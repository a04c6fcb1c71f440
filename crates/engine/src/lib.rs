// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Seal envelope workflow engine

mod audit;
mod error;
mod progress;
mod publisher;
mod service;

pub use audit::{AuditSink, JsonlAuditSink, MemoryAuditSink};
pub use error::EngineError;
pub use publisher::DeliveryReport;
pub use service::{Engine, EngineDeps, EnvelopeSummary, NewRecipient, NewTab};
