// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipients: the parties that act on an envelope

mod auth;
mod state;

pub use auth::RecipientAuth;
pub use state::{Recipient, RecipientKind, RecipientStatus};
