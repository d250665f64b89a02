//! Pipeline state and status events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of an export run.
///
/// Linear: Idle → Validating → Exporting → Decomposing → Complete, with
/// `Aborted` reachable from Validating and `Failed` from Exporting or
/// Decomposing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Validating,
    Exporting,
    Decomposing,
    Complete,
    Aborted,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Complete | PipelineState::Aborted | PipelineState::Failed
        )
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Exporting)
                | (Validating, Decomposing)
                | (Validating, Aborted)
                | (Exporting, Decomposing)
                | (Exporting, Failed)
                | (Decomposing, Complete)
                | (Decomposing, Failed)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "Idle",
            PipelineState::Validating => "Validating",
            PipelineState::Exporting => "Exporting",
            PipelineState::Decomposing => "Decomposing",
            PipelineState::Complete => "Complete",
            PipelineState::Aborted => "Aborted",
            PipelineState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// A stage transition, as reported to status sinks
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub stage: PipelineState,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl StatusEvent {
    pub fn new(stage: PipelineState, message: impl Into<String>) -> Self {
        Self {
            stage,
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}
