// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow scheduler: ordered post-send steps with delayed activation

mod state;
mod step;

pub use state::{Workflow, WorkflowStatus};
pub use step::{StepCompletion, StepStatus, Trigger, WorkflowStep};
