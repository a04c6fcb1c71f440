// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives guarding envelope edits
//!
//! - **EnvelopeLock** - Exclusive lease with lazy expiry and token-checked release

pub mod lock;

pub use lock::{
    lease_is_live, verify, EnvelopeLock, HolderId, LockChange, LockInput, LockKind,
};
