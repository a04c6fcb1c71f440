// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope status state machine

mod policy;
mod state;
mod status;

pub use policy::{EnvelopeSettings, ExpirationPolicy, ReminderPolicy};
pub use state::{Envelope, EnvelopeAction, Transition};
pub use status::EnvelopeStatus;
