//! Shared setup for engine specs

#![allow(dead_code)]

pub use seal_adapters::FakeWebhookAdapter;
pub use seal_core::{
    AccountId, Actor, EngineConfig, EnvelopeId, EnvelopeSettings, EnvelopeStatus, FakeClock,
    LockKind, LockToken, Recipient, RecipientId, RecipientKind, RecipientStatus,
    SequentialIdGen, StepId, Trigger, UserId, WorkflowError, WorkflowStep,
};
pub use seal_engine::{Engine, EngineDeps, MemoryAuditSink, NewRecipient};
pub use std::sync::Arc;
pub use std::time::Duration;

pub type SpecEngine = Engine<FakeWebhookAdapter, FakeClock, SequentialIdGen>;

/// An engine wired to fakes, with handles to inspect them
pub struct World {
    pub engine: SpecEngine,
    pub webhook: FakeWebhookAdapter,
    pub clock: FakeClock,
    pub audit: MemoryAuditSink,
}

pub fn world() -> World {
    world_with(EngineConfig::default())
}

pub fn world_with(config: EngineConfig) -> World {
    let webhook = FakeWebhookAdapter::new();
    let clock = FakeClock::new();
    let audit = MemoryAuditSink::new();
    let engine = Engine::new(
        EngineDeps {
            webhook: webhook.clone(),
            store: seal_storage::Store::in_memory(),
            audit: Arc::new(audit.clone()),
        },
        config,
        clock.clone(),
        SequentialIdGen::new("spec"),
    );
    World {
        engine,
        webhook,
        clock,
        audit,
    }
}

pub fn sender() -> Actor {
    Actor::User(UserId::new("sender"))
}

pub fn account() -> AccountId {
    AccountId::new("acct-1")
}

pub fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 3600)
}

impl World {
    /// Create an envelope, take the edit lock and add the given recipients
    pub fn draft(
        &self,
        settings: EnvelopeSettings,
        recipients: &[(RecipientKind, &str, u32)],
    ) -> (EnvelopeId, LockToken, Vec<RecipientId>) {
        let id = self
            .engine
            .create_envelope(&sender(), account(), "Services agreement", settings)
            .unwrap()
            .id;
        let token = self
            .engine
            .acquire_lock(&id, &UserId::new("sender"), LockKind::Edit, None)
            .unwrap()
            .token;
        let ids = recipients
            .iter()
            .map(|(kind, name, order)| {
                let email = format!("{}@example.com", name);
                self.engine
                    .add_recipient(
                        &sender(),
                        &id,
                        &token,
                        NewRecipient::new(*kind, name, &email, *order),
                    )
                    .unwrap()
                    .id
            })
            .collect();
        (id, token, ids)
    }

    pub fn recipient(&self, envelope_id: &EnvelopeId, recipient_id: &RecipientId) -> Recipient {
        self.engine
            .recipients(envelope_id)
            .into_iter()
            .find(|r| &r.id == recipient_id)
            .unwrap()
    }

    pub fn status(&self, envelope_id: &EnvelopeId) -> EnvelopeStatus {
        self.engine.envelope(envelope_id).unwrap().status
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.audit.actions().iter().filter(|a| *a == action).count()
    }
}
