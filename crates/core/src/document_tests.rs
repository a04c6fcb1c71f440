// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::{EnvelopeId, TemplateId};
use crate::recipient::RecipientKind;
use yare::parameterized;

fn envelope_ref() -> ItemRef {
    ItemRef::Envelope(EnvelopeId::new("env-1"))
}

fn document(parent: ItemRef) -> Document {
    Document::new(DocumentId::new("doc-1"), parent, "Contract.pdf", 3).unwrap()
}

fn recipient(parent: ItemRef) -> Recipient {
    Recipient::new(
        RecipientId::new("r-1"),
        parent,
        RecipientKind::Signer,
        "Grace",
        "grace@example.com",
        1,
    )
    .unwrap()
}

fn tab(kind: TabKind, validation: TabValidation) -> Tab {
    Tab::new(
        TabId::new("tab-1"),
        &document(envelope_ref()),
        &recipient(envelope_ref()),
        kind,
        "Field",
        TabPosition { page: 1, x: 10, y: 20 },
        validation,
    )
    .unwrap()
}

#[test]
fn there_are_27_tab_kinds() {
    assert_eq!(TabKind::ALL.len(), 27);
    let signature = TabKind::ALL
        .iter()
        .filter(|k| k.category() == TabCategory::Signature)
        .count();
    assert_eq!(signature, 4);
}

#[test]
fn document_requires_pages() {
    assert!(Document::new(DocumentId::new("d"), envelope_ref(), "Empty", 0).is_err());
}

#[test]
fn tab_recipient_must_share_the_document_envelope() {
    let other = ItemRef::Envelope(EnvelopeId::new("env-2"));
    let err = Tab::new(
        TabId::new("tab-1"),
        &document(envelope_ref()),
        &recipient(other),
        TabKind::SignHere,
        "Sign",
        TabPosition { page: 1, x: 0, y: 0 },
        TabValidation::default(),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
}

#[test]
fn template_tabs_are_allowed_within_one_template() {
    let tpl = ItemRef::Template(TemplateId::new("tpl-1"));
    let t = Tab::new(
        TabId::new("tab-1"),
        &document(tpl.clone()),
        &recipient(tpl.clone()),
        TabKind::Text,
        "Name",
        TabPosition { page: 2, x: 0, y: 0 },
        TabValidation::default(),
    )
    .unwrap();
    assert_eq!(t.parent, tpl);
}

#[test]
fn tab_page_must_exist() {
    let err = Tab::new(
        TabId::new("tab-1"),
        &document(envelope_ref()),
        &recipient(envelope_ref()),
        TabKind::SignHere,
        "Sign",
        TabPosition { page: 4, x: 0, y: 0 },
        TabValidation::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("page 4"));
}

#[test]
fn invalid_pattern_is_rejected_at_creation() {
    let err = Tab::new(
        TabId::new("tab-1"),
        &document(envelope_ref()),
        &recipient(envelope_ref()),
        TabKind::Text,
        "Code",
        TabPosition { page: 1, x: 0, y: 0 },
        TabValidation {
            pattern: Some("([".to_string()),
            ..TabValidation::default()
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("invalid pattern"));
}

#[test]
fn required_tab_is_incomplete_until_set() {
    let t = tab(
        TabKind::SignHere,
        TabValidation {
            required: true,
            ..TabValidation::default()
        },
    );
    assert!(!t.is_complete());
    let tabs = vec![t.clone()];
    assert_eq!(incomplete_tabs(&tabs, &RecipientId::new("r-1")).len(), 1);
    let signed = t.set_value("signature-ref").unwrap();
    assert!(signed.is_complete());
}

#[parameterized(
    number_ok = { TabKind::Number, "42.5", true },
    number_bad = { TabKind::Number, "forty", false },
    email_ok = { TabKind::Email, "a@b.io", true },
    email_bad = { TabKind::Email, "a@b", false },
    text_any = { TabKind::Text, "anything", true },
)]
fn value_validation_by_kind(kind: TabKind, value: &str, ok: bool) {
    assert_eq!(tab(kind, TabValidation::default()).set_value(value).is_ok(), ok);
}

#[test]
fn pattern_must_match_whole_value() {
    let t = tab(
        TabKind::Zip,
        TabValidation {
            pattern: Some(r"\d{5}".to_string()),
            ..TabValidation::default()
        },
    );
    assert!(t.set_value("12345").is_ok());
    assert!(t.set_value("123456").is_err());
}

#[test]
fn max_length_is_enforced() {
    let t = tab(
        TabKind::Text,
        TabValidation {
            max_length: Some(3),
            ..TabValidation::default()
        },
    );
    assert!(t.set_value("abc").is_ok());
    assert!(t.set_value("abcd").is_err());
}

#[test]
fn auto_filled_tabs_reject_recipient_values() {
    let t = tab(TabKind::DateSigned, TabValidation::default());
    assert!(t.set_value("2026-01-01").is_err());
}
