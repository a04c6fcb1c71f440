//! Audit trail specs
//!
//! Verify every committed change is audited, that audit failures never
//! undo a transition, and that the trail survives a restart.

use crate::prelude::*;
use seal_core::AuditEntry;
use seal_engine::AuditSink;
use std::io;

struct UnavailableAudit;

impl AuditSink for UnavailableAudit {
    fn append(&self, _entry: AuditEntry) -> io::Result<AuditEntry> {
        Err(io::Error::other("disk full"))
    }
}

#[test]
fn transitions_commit_even_when_audit_is_down() {
    let engine: SpecEngine = Engine::new(
        EngineDeps {
            webhook: FakeWebhookAdapter::new(),
            store: seal_storage::Store::in_memory(),
            audit: Arc::new(UnavailableAudit),
        },
        EngineConfig::default(),
        FakeClock::new(),
        SequentialIdGen::new("spec"),
    );
    let id = engine
        .create_envelope(&sender(), account(), "Unaudited", EnvelopeSettings::default())
        .unwrap()
        .id;

    engine.delete_envelope(&sender(), &id).unwrap();

    assert!(engine.envelope(&id).is_none());
}

#[test]
fn signing_flow_leaves_a_complete_trail() {
    let w = world();
    let (id, _, ids) = w.draft(
        EnvelopeSettings::default(),
        &[(RecipientKind::Signer, "alice", 1)],
    );
    w.engine.send_envelope(&sender(), &id).unwrap();
    w.engine.recipient_complete(&sender(), &id, &ids[0], None).unwrap();

    let actions = w.audit.actions();
    for expected in [
        "envelope.create",
        "lock.acquired",
        "recipient.add",
        "envelope.send",
        "recipient.sent",
        "recipient.signed",
    ] {
        assert!(
            actions.iter().any(|a| a == expected),
            "missing {} in {:?}",
            expected,
            actions
        );
    }
    let sequences: Vec<u64> = w.audit.entries().iter().map(|e| e.sequence).collect();
    assert!(sequences.windows(2).all(|s| s[0] < s[1]));
}

#[test]
fn engine_state_and_trail_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        wal_path: Some(dir.path().join("engine.wal")),
        audit_path: Some(dir.path().join("audit.jsonl")),
        ..EngineConfig::default()
    };
    let open = |prefix: &str| -> SpecEngine {
        Engine::open(
            config.clone(),
            FakeWebhookAdapter::new(),
            FakeClock::new(),
            SequentialIdGen::new(prefix),
        )
        .unwrap()
    };

    let id = {
        let engine = open("boot-1");
        engine
            .create_envelope(&sender(), account(), "Durable", EnvelopeSettings::default())
            .unwrap()
            .id
    };
    let engine = open("boot-2");
    engine.delete_envelope(&sender(), &id).unwrap();

    let entries = seal_storage::AuditLog::open(dir.path().join("audit.jsonl"))
        .unwrap()
        .read_all()
        .unwrap();
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    similar_asserts::assert_eq!(actions, vec!["envelope.create", "envelope.delete"]);
}
