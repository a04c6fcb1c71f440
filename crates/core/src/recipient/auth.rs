// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipient authentication requirements

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// Authentication a recipient must pass before acting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientAuth {
    pub access_code: Option<String>,
    /// Knowledge-based ID check performed by an external identity provider
    #[serde(default)]
    pub id_check: bool,
    /// Phone number for SMS or phone authentication
    pub phone: Option<String>,
}

impl RecipientAuth {
    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.access_code.is_some() || self.id_check || self.phone.is_some()
    }

    /// Check a presented access code. Only the access code is verified here;
    /// ID check and phone authentication are attested by their providers.
    pub fn verify(&self, presented: Option<&str>) -> Result<(), WorkflowError> {
        match (&self.access_code, presented) {
            (None, _) => Ok(()),
            (Some(expected), Some(given)) if expected == given => Ok(()),
            (Some(_), Some(_)) => Err(WorkflowError::validation("access code does not match")),
            (Some(_), None) => Err(WorkflowError::validation("access code required")),
        }
    }
}
