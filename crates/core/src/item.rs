// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed references to the item that owns a recipient or document
//!
//! A recipient or document belongs to exactly one envelope or exactly one
//! template. The enum makes "both" and "neither" unrepresentable.

use crate::id::{EnvelopeId, TemplateId};
use serde::{Deserialize, Serialize};

/// Discriminant of an [`ItemRef`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Envelope,
    Template,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Envelope => "envelope",
            ItemKind::Template => "template",
        }
    }
}

/// Reference to the owning envelope or template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ItemRef {
    Envelope(EnvelopeId),
    Template(TemplateId),
}

impl ItemRef {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemRef::Envelope(_) => ItemKind::Envelope,
            ItemRef::Template(_) => ItemKind::Template,
        }
    }

    pub fn as_envelope(&self) -> Option<&EnvelopeId> {
        match self {
            ItemRef::Envelope(id) => Some(id),
            ItemRef::Template(_) => None,
        }
    }

    pub fn as_template(&self) -> Option<&TemplateId> {
        match self {
            ItemRef::Template(id) => Some(id),
            ItemRef::Envelope(_) => None,
        }
    }

    pub fn belongs_to(&self, envelope_id: &EnvelopeId) -> bool {
        self.as_envelope() == Some(envelope_id)
    }
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemRef::Envelope(id) => write!(f, "envelope/{}", id),
            ItemRef::Template(id) => write!(f, "template/{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_ref_resolves_only_as_envelope() {
        let item = ItemRef::Envelope(EnvelopeId::new("env-1"));
        assert_eq!(item.kind(), ItemKind::Envelope);
        assert_eq!(item.as_envelope(), Some(&EnvelopeId::new("env-1")));
        assert!(item.as_template().is_none());
        assert!(item.belongs_to(&EnvelopeId::new("env-1")));
        assert!(!item.belongs_to(&EnvelopeId::new("env-2")));
    }

    #[test]
    fn template_ref_never_belongs_to_an_envelope() {
        let item = ItemRef::Template(TemplateId::new("tpl-1"));
        assert!(!item.belongs_to(&EnvelopeId::new("tpl-1")));
        assert_eq!(item.to_string(), "template/tpl-1");
    }

    #[test]
    fn serializes_as_tagged_reference() {
        let item = ItemRef::Envelope(EnvelopeId::new("env-1"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "envelope");
        assert_eq!(json["id"], "env-1");
    }
}
