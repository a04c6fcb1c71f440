// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::id::{RecipientId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An occurrence a step can wait for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "on", content = "item", rename_all = "snake_case")]
pub enum Trigger {
    EnvelopeSent,
    RecipientCompleted(RecipientId),
    RoutingOrderCompleted(u32),
    StepCompleted(StepId),
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::EnvelopeSent => write!(f, "envelope sent"),
            Trigger::RecipientCompleted(id) => write!(f, "recipient {} completed", id),
            Trigger::RoutingOrderCompleted(order) => {
                write!(f, "routing order {} completed", order)
            }
            Trigger::StepCompleted(id) => write!(f, "step {} completed", id),
        }
    }
}

/// What completes an active step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "item", rename_all = "snake_case")]
pub enum StepCompletion {
    /// Done as soon as it activates (a pure delay or release step)
    OnActivation,
    RecipientCompleted(RecipientId),
    /// Done only through an explicit approval
    Approval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Inactive,
    Active,
    Completed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Inactive => "inactive",
            StepStatus::Active => "active",
            StepStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub action: String,
    pub trigger: Trigger,
    /// Hours to wait after the trigger fires
    #[serde(default)]
    pub delay_hours: u32,
    /// Routing order that stays blocked until this step activates
    pub holds_routing_order: Option<u32>,
    pub completion: StepCompletion,
    pub status: StepStatus,
    /// Order in which this step's trigger fired within its workflow
    pub trigger_seq: Option<u64>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub activate_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn new(id: StepId, action: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            id,
            action: action.into(),
            trigger,
            delay_hours: 0,
            holds_routing_order: None,
            completion: StepCompletion::OnActivation,
            status: StepStatus::Inactive,
            trigger_seq: None,
            triggered_at: None,
            activate_at: None,
            activated_at: None,
            completed_at: None,
        }
    }

    pub fn with_delay_hours(mut self, hours: u32) -> Self {
        self.delay_hours = hours;
        self
    }

    pub fn holding_routing_order(mut self, order: u32) -> Self {
        self.holds_routing_order = Some(order);
        self
    }

    pub fn completed_by(mut self, completion: StepCompletion) -> Self {
        self.completion = completion;
        self
    }

    /// Triggered but still waiting out its delay
    pub fn is_waiting(&self) -> bool {
        self.status == StepStatus::Inactive && self.triggered_at.is_some()
    }
}
