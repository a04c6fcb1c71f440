// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Documents and the tabs (fields) positioned on them

use crate::error::WorkflowError;
use crate::id::{DocumentId, RecipientId, TabId};
use crate::item::ItemRef;
use crate::recipient::Recipient;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A document inside an envelope or template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub parent: ItemRef,
    pub name: String,
    pub page_count: u32,
}

impl Document {
    pub fn new(
        id: DocumentId,
        parent: ItemRef,
        name: impl Into<String>,
        page_count: u32,
    ) -> Result<Self, WorkflowError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WorkflowError::validation("document name is required"));
        }
        if page_count == 0 {
            return Err(WorkflowError::validation(format!(
                "document {} has no pages",
                id
            )));
        }
        Ok(Self {
            id,
            parent,
            name,
            page_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabCategory {
    Signature,
    Input,
    AutoFilled,
    Action,
    Navigational,
}

/// The 27 supported tab kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    SignHere,
    InitialHere,
    SignerAttachment,
    Stamp,

    Text,
    Number,
    Email,
    Date,
    Checkbox,
    RadioGroup,
    List,
    Ssn,
    Zip,
    Note,
    Formula,

    DateSigned,
    FullName,
    FirstName,
    LastName,
    EmailAddress,
    Company,
    Title,
    EnvelopeId,

    Approve,
    Decline,

    View,
    Comment,
}

impl TabKind {
    pub const ALL: [TabKind; 27] = [
        TabKind::SignHere,
        TabKind::InitialHere,
        TabKind::SignerAttachment,
        TabKind::Stamp,
        TabKind::Text,
        TabKind::Number,
        TabKind::Email,
        TabKind::Date,
        TabKind::Checkbox,
        TabKind::RadioGroup,
        TabKind::List,
        TabKind::Ssn,
        TabKind::Zip,
        TabKind::Note,
        TabKind::Formula,
        TabKind::DateSigned,
        TabKind::FullName,
        TabKind::FirstName,
        TabKind::LastName,
        TabKind::EmailAddress,
        TabKind::Company,
        TabKind::Title,
        TabKind::EnvelopeId,
        TabKind::Approve,
        TabKind::Decline,
        TabKind::View,
        TabKind::Comment,
    ];

    pub fn category(&self) -> TabCategory {
        use TabKind::*;
        match self {
            SignHere | InitialHere | SignerAttachment | Stamp => TabCategory::Signature,
            Text | Number | Email | Date | Checkbox | RadioGroup | List | Ssn | Zip | Note
            | Formula => TabCategory::Input,
            DateSigned | FullName | FirstName | LastName | EmailAddress | Company | Title
            | EnvelopeId => TabCategory::AutoFilled,
            Approve | Decline => TabCategory::Action,
            View | Comment => TabCategory::Navigational,
        }
    }

    /// Whether a recipient supplies the value (as opposed to the system)
    pub fn is_recipient_filled(&self) -> bool {
        matches!(
            self.category(),
            TabCategory::Signature | TabCategory::Input | TabCategory::Action
        )
    }
}

/// Position on a page, in points from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabPosition {
    pub page: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabValidation {
    #[serde(default)]
    pub required: bool,
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match
    pub pattern: Option<String>,
}

/// A positioned field tied to a document and a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub document_id: DocumentId,
    pub recipient_id: RecipientId,
    pub parent: ItemRef,
    pub kind: TabKind,
    pub label: String,
    pub position: TabPosition,
    #[serde(default)]
    pub validation: TabValidation,
    pub value: Option<String>,
}

impl Tab {
    /// Create a tab; the document and recipient must share the same parent
    pub fn new(
        id: TabId,
        document: &Document,
        recipient: &Recipient,
        kind: TabKind,
        label: impl Into<String>,
        position: TabPosition,
        validation: TabValidation,
    ) -> Result<Self, WorkflowError> {
        if document.parent != recipient.parent {
            return Err(WorkflowError::validation(format!(
                "tab {} links document in {} to recipient in {}",
                id, document.parent, recipient.parent
            )));
        }
        if position.page == 0 || position.page > document.page_count {
            return Err(WorkflowError::validation(format!(
                "tab {} is on page {} but document {} has {} page(s)",
                id, position.page, document.id, document.page_count
            )));
        }
        if let Some(pattern) = &validation.pattern {
            Regex::new(pattern).map_err(|e| {
                WorkflowError::validation(format!("tab {} has invalid pattern: {}", id, e))
            })?;
        }
        Ok(Self {
            id,
            document_id: document.id.clone(),
            recipient_id: recipient.id.clone(),
            parent: document.parent.clone(),
            kind,
            label: label.into(),
            position,
            validation,
            value: None,
        })
    }

    pub fn is_complete(&self) -> bool {
        !self.validation.required || self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Set a recipient-supplied value after validating it
    pub fn set_value(&self, value: &str) -> Result<Tab, WorkflowError> {
        if !self.kind.is_recipient_filled() {
            return Err(WorkflowError::validation(format!(
                "tab {} is filled automatically",
                self.id
            )));
        }
        if self.validation.required && value.is_empty() {
            return Err(self.reject("a value is required"));
        }
        if let Some(max) = self.validation.max_length {
            if value.chars().count() > max {
                return Err(self.reject(&format!("value exceeds {} characters", max)));
            }
        }
        match self.kind {
            TabKind::Number if value.parse::<f64>().is_err() => {
                return Err(self.reject("value is not a number"));
            }
            TabKind::Email if !looks_like_email(value) => {
                return Err(self.reject("value is not an email address"));
            }
            _ => {}
        }
        if let Some(pattern) = &self.validation.pattern {
            let re = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| self.reject(&format!("invalid pattern: {}", e)))?;
            if !re.is_match(value) {
                return Err(self.reject("value does not match the required format"));
            }
        }

        let mut next = self.clone();
        next.value = Some(value.to_string());
        Ok(next)
    }

    fn reject(&self, message: &str) -> WorkflowError {
        WorkflowError::validation(format!("tab {} ({}): {}", self.id, self.label, message))
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

/// Required tabs of a recipient that still lack a value
pub fn incomplete_tabs<'a>(tabs: &'a [Tab], recipient_id: &RecipientId) -> Vec<&'a Tab> {
    tabs.iter()
        .filter(|t| &t.recipient_id == recipient_id && !t.is_complete())
        .collect()
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
