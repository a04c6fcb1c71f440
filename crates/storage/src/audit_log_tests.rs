// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use seal_core::{AccountId, Actor, EnvelopeId, ResourceRef};

fn entry(action: &str) -> AuditEntry {
    AuditEntry::new(
        AccountId::new("acct-1"),
        Actor::System,
        action,
        ResourceRef::Envelope { id: EnvelopeId::new("env-1") },
        Utc::now(),
    )
}

#[test]
fn append_assigns_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();

    assert_eq!(log.append(entry("envelope.create")).unwrap().sequence, 1);
    assert_eq!(log.append(entry("envelope.send")).unwrap().sequence, 2);

    let all = log.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].action, "envelope.send");
}

#[test]
fn sequence_restored_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    {
        let mut log = AuditLog::open(path.clone()).unwrap();
        log.append(entry("envelope.create")).unwrap();
        log.append(entry("envelope.send")).unwrap();
    }

    let mut log = AuditLog::open(path).unwrap();
    assert_eq!(log.current_sequence(), 2);
    assert_eq!(log.append(entry("envelope.void")).unwrap().sequence, 3);
    assert_eq!(log.after(2).unwrap().len(), 1);
}

#[test]
fn missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::open(dir.path().join("none.jsonl")).unwrap();
    assert!(log.read_all().unwrap().is_empty());
}
