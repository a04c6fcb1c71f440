// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipients, documents and tabs

use super::Engine;
use crate::error::EngineError;
use crate::progress::Progress;
use seal_adapters::WebhookAdapter;
use seal_core::document::incomplete_tabs;
use seal_core::recipient::RecipientAuth;
use seal_core::{
    Actor, AuditEntry, Clock, Document, DocumentId, Envelope, EnvelopeAction, EnvelopeId,
    EnvelopeStatus, EventKind, IdGen, ItemRef, LockToken, Operation, Recipient, RecipientId,
    RecipientKind, ResourceRef, Tab, TabId, TabKind, TabPosition, TabValidation, Trigger,
    WorkflowError,
};
use seal_storage::Batch;

/// Input for [`Engine::add_recipient`]
#[derive(Debug, Clone)]
pub struct NewRecipient {
    pub kind: RecipientKind,
    pub name: String,
    pub email: String,
    pub routing_order: u32,
    pub optional: bool,
    pub auth: RecipientAuth,
}

impl NewRecipient {
    pub fn new(kind: RecipientKind, name: &str, email: &str, routing_order: u32) -> Self {
        Self {
            kind,
            name: name.to_string(),
            email: email.to_string(),
            routing_order,
            optional: false,
            auth: RecipientAuth::default(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_auth(mut self, auth: RecipientAuth) -> Self {
        self.auth = auth;
        self
    }
}

/// Input for [`Engine::add_tab`]
#[derive(Debug, Clone)]
pub struct NewTab {
    pub document_id: DocumentId,
    pub recipient_id: RecipientId,
    pub kind: TabKind,
    pub label: String,
    pub position: TabPosition,
    pub validation: TabValidation,
}

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    /// Add a recipient under the envelope lock. On a sent envelope the
    /// recipient is activated right away if its routing group is open.
    pub fn add_recipient(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
        new: NewRecipient,
    ) -> Result<Recipient, EngineError> {
        let before = self.load(envelope_id)?;
        let batch = self.check_edit(&before.envelope, token)?;

        let mut recipient = Recipient::new(
            RecipientId::new(self.next_id()),
            ItemRef::Envelope(envelope_id.clone()),
            new.kind,
            new.name,
            new.email,
            new.routing_order,
        )?
        .with_auth(new.auth);
        if new.optional {
            recipient = recipient.optional();
        }
        if before.recipients.iter().any(|r| {
            r.email.eq_ignore_ascii_case(&recipient.email)
                && r.routing_order == recipient.routing_order
        }) {
            return Err(WorkflowError::validation(format!(
                "{} is already a recipient at routing order {}",
                recipient.email, recipient.routing_order
            ))
            .into());
        }

        let id = recipient.id.clone();
        let mut after = before.clone();
        after.recipients.push(recipient);
        after
            .recipients
            .sort_by(|a, b| a.routing_order.cmp(&b.routing_order).then(a.id.cmp(&b.id)));
        if after.envelope.status.is_in_flight() {
            after.settle(Vec::new(), &self.clock)?;
        }

        let recipient = after.recipient(&id)?.clone();
        self.save(actor, "recipient.add", &before, after, batch)?;
        Ok(recipient)
    }

    pub fn add_document(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
        name: &str,
        page_count: u32,
    ) -> Result<Document, EngineError> {
        let envelope = self.live_envelope(envelope_id)?;
        let batch = self.check_edit(&envelope, token)?;
        let document = Document::new(
            DocumentId::new(self.next_id()),
            ItemRef::Envelope(envelope_id.clone()),
            name,
            page_count,
        )?;

        self.commit_edit(
            batch.with(Operation::DocumentSaved {
                document: document.clone(),
            }),
            &envelope,
        )?;
        tracing::info!(envelope_id = %envelope_id, document_id = %document.id, "document added");
        self.audit(
            AuditEntry::new(
                envelope.account_id.clone(),
                actor.clone(),
                "document.add",
                ResourceRef::Document {
                    envelope_id: envelope_id.clone(),
                    id: document.id.clone(),
                },
                self.clock.now(),
            )
            .after(Some(&document)),
        );
        Ok(document)
    }

    pub fn add_tab(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
        new: NewTab,
    ) -> Result<Tab, EngineError> {
        let envelope = self.live_envelope(envelope_id)?;
        let batch = self.check_edit(&envelope, token)?;
        let (document, recipient) = self.read(|state| {
            let document = state
                .documents
                .get(&new.document_id)
                .cloned()
                .ok_or_else(|| WorkflowError::not_found("document", &new.document_id))?;
            let recipient = state
                .recipients
                .get(&new.recipient_id)
                .cloned()
                .ok_or_else(|| WorkflowError::not_found("recipient", &new.recipient_id))?;
            Ok::<_, WorkflowError>((document, recipient))
        })?;
        if !document.parent.belongs_to(envelope_id) {
            return Err(WorkflowError::validation(format!(
                "document {} belongs to {}",
                document.id, document.parent
            ))
            .into());
        }

        let tab = Tab::new(
            TabId::new(self.next_id()),
            &document,
            &recipient,
            new.kind,
            new.label,
            new.position,
            new.validation,
        )?;
        self.commit_edit(batch.with(Operation::TabSaved { tab: tab.clone() }), &envelope)?;
        tracing::info!(envelope_id = %envelope_id, tab_id = %tab.id, kind = ?tab.kind, "tab added");
        self.audit(
            AuditEntry::new(
                envelope.account_id.clone(),
                actor.clone(),
                "tab.add",
                ResourceRef::Tab {
                    envelope_id: envelope_id.clone(),
                    id: tab.id.clone(),
                },
                self.clock.now(),
            )
            .after(Some(&tab)),
        );
        Ok(tab)
    }

    /// A recipient fills in one of its own tabs while it is their turn and
    /// they have not yet signed or declined
    pub fn set_tab_value(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        tab_id: &TabId,
        value: &str,
    ) -> Result<Tab, EngineError> {
        let progress = self.load(envelope_id)?;
        let before = self
            .read(|state| state.tabs.get(tab_id).cloned())
            .filter(|t| t.parent.belongs_to(envelope_id))
            .ok_or_else(|| WorkflowError::not_found("tab", tab_id))?;
        self.check_can_act(&progress, &before.recipient_id)?;
        progress
            .recipient(&before.recipient_id)?
            .check_pending("fill in a tab for")?;

        let after = before.set_value(value)?;
        self.commit_edit(
            Batch::new().with(Operation::TabSaved { tab: after.clone() }),
            &progress.envelope,
        )?;
        self.audit(
            AuditEntry::new(
                progress.envelope.account_id.clone(),
                actor.clone(),
                "tab.set_value",
                ResourceRef::Tab {
                    envelope_id: envelope_id.clone(),
                    id: tab_id.clone(),
                },
                self.clock.now(),
            )
            .before(Some(&before))
            .after(Some(&after)),
        );
        Ok(after)
    }

    /// First view by a recipient; marks the envelope delivered on the first one
    pub fn recipient_delivered(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        recipient_id: &RecipientId,
    ) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        let current = before.recipient(recipient_id)?;
        let delivered = current.deliver(&self.clock)?;
        if &delivered == current {
            return Ok(before.envelope);
        }

        let mut after = before.clone();
        after.replace_recipient(delivered);
        after.emit(
            EventKind::RecipientDelivered {
                recipient_id: recipient_id.clone(),
            },
            self.clock.now(),
        );
        // Milestone only; a carbon copy may view a finished envelope
        if after.envelope.status == EnvelopeStatus::Sent {
            after.apply(EnvelopeAction::Deliver, &self.clock)?;
        }
        self.save(actor, "recipient.deliver", &before, after, Batch::new())
    }

    /// Sign or complete on behalf of a recipient, then let routing, the
    /// workflow and envelope completion follow
    pub fn recipient_complete(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        recipient_id: &RecipientId,
        access_code: Option<&str>,
    ) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        self.check_can_act(&before, recipient_id)?;
        let current = before.recipient(recipient_id)?;
        current.auth.verify(access_code)?;

        let tabs = self.read(|state| state.tabs_of(&ItemRef::Envelope(envelope_id.clone())));
        let missing = incomplete_tabs(&tabs, recipient_id).len();
        if missing > 0 {
            return Err(WorkflowError::validation(format!(
                "recipient {} has {} required tab(s) without a value",
                recipient_id, missing
            ))
            .into());
        }

        let completed = current.complete(&self.clock)?;
        let mut after = before.clone();
        after.replace_recipient(completed);
        after.emit(
            EventKind::RecipientCompleted {
                recipient_id: recipient_id.clone(),
            },
            self.clock.now(),
        );
        after.settle(
            vec![Trigger::RecipientCompleted(recipient_id.clone())],
            &self.clock,
        )?;
        self.save(actor, "recipient.complete", &before, after, Batch::new())
    }

    /// Decline on behalf of a recipient. A mandatory decline declines the
    /// envelope and freezes everyone else; an optional one lets routing go on.
    pub fn recipient_decline(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        recipient_id: &RecipientId,
        reason: &str,
    ) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        self.check_can_act(&before, recipient_id)?;
        let declined = before.recipient(recipient_id)?.decline(reason, &self.clock)?;
        let blocking = declined.is_blocking_decline();

        let mut after = before.clone();
        after.replace_recipient(declined);
        after.emit(
            EventKind::RecipientDeclined {
                recipient_id: recipient_id.clone(),
                reason: reason.trim().to_string(),
            },
            self.clock.now(),
        );
        if blocking {
            after.apply(
                EnvelopeAction::Decline {
                    recipient_id: recipient_id.clone(),
                    reason: reason.to_string(),
                },
                &self.clock,
            )?;
            after.freeze_pending();
        } else {
            after.settle(Vec::new(), &self.clock)?;
        }
        self.save(actor, "recipient.decline", &before, after, Batch::new())
    }

    pub fn recipients(&self, envelope_id: &EnvelopeId) -> Vec<Recipient> {
        self.read(|state| state.envelope_recipients(envelope_id))
    }

    pub fn tabs(&self, envelope_id: &EnvelopeId) -> Vec<Tab> {
        self.read(|state| state.tabs_of(&ItemRef::Envelope(envelope_id.clone())))
    }

    fn live_envelope(&self, envelope_id: &EnvelopeId) -> Result<Envelope, EngineError> {
        self.read(|state| state.envelope(envelope_id).cloned())
            .ok_or_else(|| WorkflowError::not_found("envelope", envelope_id).into())
    }

    /// Envelope in flight and the recipient's routing order is open
    fn check_can_act(&self, progress: &Progress, recipient_id: &RecipientId) -> Result<(), EngineError> {
        let envelope = &progress.envelope;
        if !envelope.status.is_in_flight() {
            return Err(WorkflowError::InvalidTransition {
                resource: "envelope",
                id: envelope.id.to_string(),
                current: envelope.status.as_str().to_string(),
                attempted: "act on",
            }
            .into());
        }
        let recipient = progress.recipient(recipient_id)?;
        progress.router().check_can_act(recipient)?;
        Ok(())
    }

    /// Commit an edit that does not go through [`Progress`], bumping the
    /// envelope version so concurrent edits to the same envelope serialize
    fn commit_edit(&self, batch: Batch, envelope: &Envelope) -> Result<(), EngineError> {
        self.commit(batch.with(Operation::EnvelopeSaved {
            envelope: envelope.touched(),
        }))
    }
}

#[cfg(test)]
#[path = "recipients_tests.rs"]
mod tests;
