// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Envelope status
///
/// `created -> sent -> delivered -> signed -> completed`, with `declined` and
/// `voided` reachable from the in-flight states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Created,
    Sent,
    Delivered,
    Signed,
    Completed,
    Declined,
    Voided,
}

impl EnvelopeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EnvelopeStatus::Completed | EnvelopeStatus::Declined | EnvelopeStatus::Voided
        )
    }

    /// Sent, delivered or signed: recipients are working on it
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            EnvelopeStatus::Sent | EnvelopeStatus::Delivered | EnvelopeStatus::Signed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeStatus::Created => "created",
            EnvelopeStatus::Sent => "sent",
            EnvelopeStatus::Delivered => "delivered",
            EnvelopeStatus::Signed => "signed",
            EnvelopeStatus::Completed => "completed",
            EnvelopeStatus::Declined => "declined",
            EnvelopeStatus::Voided => "voided",
        }
    }
}

impl std::fmt::Display for EnvelopeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
