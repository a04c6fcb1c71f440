// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage: write-ahead log, materialized state and audit file

mod audit_log;
mod state;
mod store;
mod wal;

pub use audit_log::AuditLog;
pub use state::MaterializedState;
pub use store::{Batch, Precondition, Store, StoreError};
pub use wal::{Wal, WalError};
