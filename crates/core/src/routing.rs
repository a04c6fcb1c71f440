// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recipient routing
//!
//! Decides which recipients may act given per-recipient progress, the
//! envelope's sequential-signing flag and any routing orders a workflow step
//! is holding back.

use crate::error::WorkflowError;
use crate::id::RecipientId;
use crate::recipient::{Recipient, RecipientStatus};
use std::collections::{BTreeMap, BTreeSet};

/// Recipients sharing one routing order
#[derive(Debug, Clone)]
pub struct RoutingGroup<'a> {
    pub order: u32,
    pub members: Vec<&'a Recipient>,
}

impl<'a> RoutingGroup<'a> {
    /// Members that gate progression (everyone except cc/certified delivery)
    pub fn actionable(&self) -> impl Iterator<Item = &'a Recipient> + '_ {
        self.members.iter().copied().filter(|r| r.kind.is_blocking())
    }

    pub fn is_finished(&self) -> bool {
        self.actionable().all(|r| r.status.is_terminal())
    }
}

/// How far sequential routing has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontier {
    /// Recipients up to and including this order may act
    Open(u32),
    /// This order is next but a workflow step holds it back
    Held(u32),
    /// Every actionable group is done
    Finished,
}

/// Overall routing outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    InProgress { current_order: Option<u32> },
    /// A mandatory recipient declined; routing stops
    Halted { declined_by: RecipientId },
    /// Every mandatory recipient is satisfied
    Finished,
}

/// Routing view over one envelope's recipients
#[derive(Debug, Clone)]
pub struct Router<'a> {
    recipients: &'a [Recipient],
    sequential: bool,
    held: BTreeSet<u32>,
}

impl<'a> Router<'a> {
    pub fn new(recipients: &'a [Recipient], sequential: bool) -> Self {
        Self {
            recipients,
            sequential,
            held: BTreeSet::new(),
        }
    }

    /// Routing orders a workflow step has not yet released
    pub fn with_held_orders(mut self, held: impl IntoIterator<Item = u32>) -> Self {
        self.held = held.into_iter().collect();
        self
    }

    /// Groups in ascending routing order
    pub fn groups(&self) -> Vec<RoutingGroup<'a>> {
        let mut by_order: BTreeMap<u32, Vec<&'a Recipient>> = BTreeMap::new();
        for r in self.recipients {
            by_order.entry(r.routing_order).or_default().push(r);
        }
        by_order
            .into_iter()
            .map(|(order, members)| RoutingGroup { order, members })
            .collect()
    }

    pub fn frontier(&self) -> Frontier {
        if !self.sequential {
            return Frontier::Finished;
        }
        for group in self.groups() {
            // Groups with nothing actionable never hold up routing
            if group.actionable().next().is_none() {
                continue;
            }
            if group.is_finished() {
                continue;
            }
            if self.held.contains(&group.order) {
                return Frontier::Held(group.order);
            }
            return Frontier::Open(group.order);
        }
        Frontier::Finished
    }

    /// Routing order currently being worked, if any
    pub fn current_order(&self) -> Option<u32> {
        match self.frontier() {
            Frontier::Open(order) | Frontier::Held(order) => Some(order),
            Frontier::Finished => None,
        }
    }

    pub fn is_open(&self, recipient: &Recipient) -> bool {
        match self.frontier() {
            Frontier::Open(order) => recipient.routing_order <= order,
            Frontier::Held(order) => recipient.routing_order < order,
            Frontier::Finished => true,
        }
    }

    /// Recipients that should be activated now
    pub fn to_activate(&self) -> Vec<&'a Recipient> {
        if self.halted_by().is_some() {
            return Vec::new();
        }
        self.recipients
            .iter()
            .filter(|r| {
                r.status == RecipientStatus::Created
                    && !r.frozen
                    && self.is_open(r)
            })
            .collect()
    }

    /// Gate a recipient action on routing order
    pub fn check_can_act(&self, recipient: &Recipient) -> Result<(), WorkflowError> {
        if let Some(declined_by) = self.halted_by() {
            return Err(WorkflowError::RoutingBlocked {
                recipient_id: recipient.id.clone(),
                routing_order: recipient.routing_order,
                reason: format!("routing halted by decline from {}", declined_by),
            });
        }
        if self.is_open(recipient) {
            return Ok(());
        }
        let reason = match self.frontier() {
            Frontier::Held(order) => format!("routing order {} is held by a workflow step", order),
            Frontier::Open(order) => format!("waiting on routing order {}", order),
            Frontier::Finished => "routing finished".to_string(),
        };
        Err(WorkflowError::RoutingBlocked {
            recipient_id: recipient.id.clone(),
            routing_order: recipient.routing_order,
            reason,
        })
    }

    pub fn halted_by(&self) -> Option<&'a RecipientId> {
        self.recipients
            .iter()
            .find(|r| r.is_blocking_decline())
            .map(|r| &r.id)
    }

    pub fn outcome(&self) -> RoutingOutcome {
        if let Some(declined_by) = self.halted_by() {
            return RoutingOutcome::Halted {
                declined_by: declined_by.clone(),
            };
        }
        let satisfied = self
            .recipients
            .iter()
            .filter(|r| r.kind.is_blocking())
            .all(|r| r.is_satisfied());
        if satisfied {
            RoutingOutcome::Finished
        } else {
            RoutingOutcome::InProgress {
                current_order: self.current_order(),
            }
        }
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
