// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! seal-core: envelope workflow domain
//!
//! This crate provides:
//! - Pure state machines for envelopes, recipients, workflow steps and locks
//! - The recipient router that gates signing order
//! - Delivery configuration, payload signing and the retry ledger
//! - Write-ahead log operations and audit records

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod item;

// State machines (order matters for dependencies)
pub mod envelope;
pub mod recipient;
pub mod document;
pub mod routing;
pub mod coordination;
pub mod workflow;

pub mod audit;
pub mod delivery;
pub mod event;
pub mod operation;

pub use audit::{Actor, AuditEntry, ResourceRef};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use coordination::{EnvelopeLock, LockKind};
pub use delivery::{
    ConnectConfig, ConnectFailure, ConnectLog, DeliveryPayload, EventPattern, FailureKey,
    RetryPolicy, MAX_RETRY_ATTEMPTS,
};
pub use document::{Document, Tab, TabKind, TabPosition, TabValidation};
pub use envelope::{Envelope, EnvelopeAction, EnvelopeSettings, EnvelopeStatus};
pub use error::WorkflowError;
pub use event::{Event, EventKind};
pub use id::{
    AccountId, ConfigId, DocumentId, EnvelopeId, IdGen, LockToken, RecipientId, SequentialIdGen,
    StepId, TabId, TemplateId, UserId, UuidIdGen,
};
pub use item::{ItemKind, ItemRef};
pub use operation::Operation;
pub use recipient::{Recipient, RecipientKind, RecipientStatus};
pub use routing::{Router, RoutingOutcome};
pub use workflow::{StepCompletion, StepStatus, Trigger, Workflow, WorkflowStatus, WorkflowStep};
