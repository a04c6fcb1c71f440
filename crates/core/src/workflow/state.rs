// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state machine
//!
//! Triggers are folded into the workflow one at a time. Each distinct trigger
//! is remembered, so a redelivered event is ignored rather than re-evaluated.
//! Triggered steps activate strictly in the order their triggers fired.

use super::step::{StepCompletion, StepStatus, Trigger, WorkflowStep};
use crate::clock::add_std;
use crate::error::WorkflowError;
use crate::event::EventKind;
use crate::id::{EnvelopeId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    NotStarted,
    InProgress,
    /// At least one triggered step is waiting out its delay
    Paused,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::NotStarted => "not_started",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub envelope_id: EnvelopeId,
    pub status: WorkflowStatus,
    /// Routing order the envelope is currently working through
    pub current_routing_order: Option<u32>,
    pub steps: Vec<WorkflowStep>,
    /// Every trigger observed so far
    #[serde(default)]
    pub seen: Vec<Trigger>,
    #[serde(default)]
    pub trigger_seq: u64,
}

impl Workflow {
    pub fn new(envelope_id: EnvelopeId) -> Self {
        Self {
            envelope_id,
            status: WorkflowStatus::NotStarted,
            current_routing_order: None,
            steps: Vec::new(),
            seen: Vec::new(),
            trigger_seq: 0,
        }
    }

    pub fn step(&self, id: &StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Append a step. Only allowed before the workflow has started.
    pub fn add_step(&self, step: WorkflowStep) -> Result<Workflow, WorkflowError> {
        if self.status != WorkflowStatus::NotStarted {
            return Err(WorkflowError::StepState {
                step_id: step.id,
                current: format!("workflow {}", self.status.as_str()),
                expected: "workflow not_started",
            });
        }
        if self.step(&step.id).is_some() {
            return Err(WorkflowError::validation(format!(
                "duplicate workflow step {}",
                step.id
            )));
        }
        if step.holds_routing_order == Some(0) {
            return Err(WorkflowError::validation("held routing order must be > 0"));
        }
        let mut next = self.clone();
        let mut step = step;
        step.status = StepStatus::Inactive;
        next.steps.push(step);
        Ok(next)
    }

    pub fn has_seen(&self, trigger: &Trigger) -> bool {
        self.seen.contains(trigger)
    }

    /// Routing orders still blocked by steps that have not activated
    pub fn held_orders(&self) -> BTreeSet<u32> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Inactive)
            .filter_map(|s| s.holds_routing_order)
            .collect()
    }

    /// Earliest time a waiting step becomes due
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.steps
            .iter()
            .filter(|s| s.is_waiting())
            .filter_map(|s| s.activate_at)
            .min()
    }

    pub fn is_complete(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }

    /// Record the envelope's current routing order
    pub fn with_routing_order(&self, order: Option<u32>) -> Workflow {
        let mut next = self.clone();
        next.current_routing_order = order;
        next
    }

    /// Fold a trigger into the workflow.
    ///
    /// Returns the new workflow and the step events produced. A trigger that
    /// was already observed yields an unchanged workflow and no events.
    pub fn on_trigger(&self, trigger: Trigger, now: DateTime<Utc>) -> (Workflow, Vec<EventKind>) {
        let mut next = self.clone();
        let mut events = Vec::new();
        let mut queue = VecDeque::from([trigger]);

        while let Some(trigger) = queue.pop_front() {
            if next.has_seen(&trigger) {
                continue;
            }
            next.observe(trigger, now, &mut events, &mut queue);
        }

        next.refresh_status();
        (next, events)
    }

    /// Activate every step whose delay has elapsed, in trigger order.
    ///
    /// Activation stops at the first triggered step that is not yet due,
    /// so a later trigger never overtakes an earlier one.
    pub fn tick(&self, now: DateTime<Utc>) -> (Workflow, Vec<EventKind>) {
        let mut next = self.clone();
        let mut events = Vec::new();
        let mut queue = VecDeque::new();

        next.activate_due(now, &mut events, &mut queue);
        while let Some(trigger) = queue.pop_front() {
            if next.has_seen(&trigger) {
                continue;
            }
            next.observe(trigger, now, &mut events, &mut queue);
        }

        next.refresh_status();
        (next, events)
    }

    /// Complete an active step that waits for approval
    pub fn approve_step(
        &self,
        step_id: &StepId,
        now: DateTime<Utc>,
    ) -> Result<(Workflow, Vec<EventKind>), WorkflowError> {
        let step = self
            .step(step_id)
            .ok_or_else(|| WorkflowError::not_found("workflow step", step_id))?;
        if step.status != StepStatus::Active {
            return Err(WorkflowError::StepState {
                step_id: step_id.clone(),
                current: step.status.as_str().to_string(),
                expected: "active",
            });
        }
        if step.completion != StepCompletion::Approval {
            return Err(WorkflowError::validation(format!(
                "workflow step {} does not complete by approval",
                step_id
            )));
        }

        let mut next = self.clone();
        let mut events = Vec::new();
        let mut queue = VecDeque::new();
        next.complete(step_id, now, &mut events, &mut queue);
        while let Some(trigger) = queue.pop_front() {
            if next.has_seen(&trigger) {
                continue;
            }
            next.observe(trigger, now, &mut events, &mut queue);
        }
        next.refresh_status();
        Ok((next, events))
    }

    fn observe(
        &mut self,
        trigger: Trigger,
        now: DateTime<Utc>,
        events: &mut Vec<EventKind>,
        queue: &mut VecDeque<Trigger>,
    ) {
        tracing::debug!(envelope_id = %self.envelope_id, %trigger, "workflow trigger");
        self.seen.push(trigger.clone());
        if self.status == WorkflowStatus::NotStarted && trigger == Trigger::EnvelopeSent {
            self.status = WorkflowStatus::InProgress;
        }

        // Arm steps waiting on this trigger
        for step in self.steps.iter_mut() {
            if step.status != StepStatus::Inactive
                || step.triggered_at.is_some()
                || step.trigger != trigger
            {
                continue;
            }
            self.trigger_seq += 1;
            step.trigger_seq = Some(self.trigger_seq);
            step.triggered_at = Some(now);
            step.activate_at = Some(add_std(
                now,
                Duration::from_secs(u64::from(step.delay_hours) * 3600),
            ));
        }

        // Complete active steps that were waiting on this occurrence
        if let Trigger::RecipientCompleted(recipient_id) = &trigger {
            let done: Vec<StepId> = self
                .steps
                .iter()
                .filter(|s| s.status == StepStatus::Active)
                .filter(|s| {
                    matches!(&s.completion, StepCompletion::RecipientCompleted(r) if r == recipient_id)
                })
                .map(|s| s.id.clone())
                .collect();
            for id in done {
                self.complete(&id, now, events, queue);
            }
        }

        self.activate_due(now, events, queue);
    }

    fn activate_due(
        &mut self,
        now: DateTime<Utc>,
        events: &mut Vec<EventKind>,
        queue: &mut VecDeque<Trigger>,
    ) {
        let mut waiting: Vec<(u64, StepId, Option<DateTime<Utc>>)> = self
            .steps
            .iter()
            .filter(|s| s.is_waiting())
            .map(|s| (s.trigger_seq.unwrap_or(u64::MAX), s.id.clone(), s.activate_at))
            .collect();
        waiting.sort_by_key(|(seq, _, _)| *seq);

        for (_, id, activate_at) in waiting {
            if activate_at.is_some_and(|at| at > now) {
                break;
            }
            self.activate(&id, now, events, queue);
        }
    }

    fn activate(
        &mut self,
        step_id: &StepId,
        now: DateTime<Utc>,
        events: &mut Vec<EventKind>,
        queue: &mut VecDeque<Trigger>,
    ) {
        let completion = {
            let Some(step) = self.steps.iter_mut().find(|s| &s.id == step_id) else {
                return;
            };
            step.status = StepStatus::Active;
            step.activated_at = Some(now);
            step.completion.clone()
        };
        tracing::info!(envelope_id = %self.envelope_id, step_id = %step_id, "workflow step activated");
        events.push(EventKind::StepActivated {
            step_id: step_id.clone(),
        });

        let satisfied = match &completion {
            StepCompletion::OnActivation => true,
            StepCompletion::RecipientCompleted(r) => {
                self.has_seen(&Trigger::RecipientCompleted(r.clone()))
            }
            StepCompletion::Approval => false,
        };
        if satisfied {
            self.complete(step_id, now, events, queue);
        }
    }

    fn complete(
        &mut self,
        step_id: &StepId,
        now: DateTime<Utc>,
        events: &mut Vec<EventKind>,
        queue: &mut VecDeque<Trigger>,
    ) {
        let Some(step) = self.steps.iter_mut().find(|s| &s.id == step_id) else {
            return;
        };
        if step.status != StepStatus::Active {
            return;
        }
        step.status = StepStatus::Completed;
        step.completed_at = Some(now);
        tracing::info!(envelope_id = %self.envelope_id, step_id = %step_id, "workflow step completed");
        events.push(EventKind::StepCompleted {
            step_id: step_id.clone(),
        });
        queue.push_back(Trigger::StepCompleted(step_id.clone()));
    }

    fn refresh_status(&mut self) {
        if self.status == WorkflowStatus::NotStarted {
            return;
        }
        self.status = if !self.steps.is_empty()
            && self.steps.iter().all(|s| s.status == StepStatus::Completed)
        {
            WorkflowStatus::Completed
        } else if self.steps.iter().any(|s| s.is_waiting()) {
            WorkflowStatus::Paused
        } else {
            WorkflowStatus::InProgress
        };
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
