// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::Engine;
use crate::error::EngineError;
use seal_adapters::WebhookAdapter;
use seal_core::{
    Actor, Clock, Envelope, EnvelopeId, IdGen, LockToken, StepId, Trigger, Workflow,
    WorkflowError, WorkflowStep,
};
use seal_storage::Batch;

impl<W, C, I> Engine<W, C, I>
where
    W: WebhookAdapter,
    C: Clock,
    I: IdGen,
{
    /// Add a step before the envelope is sent
    pub fn add_workflow_step(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        token: &LockToken,
        step: WorkflowStep,
    ) -> Result<Workflow, EngineError> {
        let before = self.load(envelope_id)?;
        let batch = self.check_edit(&before.envelope, token)?;

        let referenced = match &step.trigger {
            Trigger::RecipientCompleted(id) => Some(id),
            _ => None,
        };
        if let Some(id) = referenced {
            before.recipient(id)?;
        }

        let mut after = before.clone();
        after.workflow = before.workflow.add_step(step)?;
        let workflow = after.workflow.clone();
        self.save(actor, "workflow_step.add", &before, after, batch)?;
        Ok(workflow)
    }

    /// Complete an active approval step; held routing groups may open
    pub fn approve_step(
        &self,
        actor: &Actor,
        envelope_id: &EnvelopeId,
        step_id: &StepId,
    ) -> Result<Envelope, EngineError> {
        let before = self.load(envelope_id)?;
        if !before.envelope.status.is_in_flight() {
            return Err(WorkflowError::InvalidTransition {
                resource: "envelope",
                id: envelope_id.to_string(),
                current: before.envelope.status.as_str().to_string(),
                attempted: "approve a step on",
            }
            .into());
        }

        let now = self.clock.now();
        let (workflow, kinds) = before.workflow.approve_step(step_id, now)?;
        let mut after = before.clone();
        after.workflow = workflow;
        for kind in kinds {
            after.emit(kind, now);
        }
        after.settle(Vec::new(), &self.clock)?;
        self.save(actor, "workflow_step.approve", &before, after, Batch::new())
    }

    pub fn workflow(&self, envelope_id: &EnvelopeId) -> Option<Workflow> {
        self.read(|state| state.workflow(envelope_id).cloned())
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
