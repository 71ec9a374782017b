//! FlowStatus - The Flow Lifecycle
//!
//! A flow moves `NotStarted -> Running -> {Complete, Cancelled, Errored}`.
//! The three terminal states are final: a finished engine never evaluates
//! another step.

use navstack_core::{ModalKind, NodeId};

/// Where a flow is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowStatus {
    #[default]
    NotStarted,
    Running,
    Complete,
    Cancelled,
    Errored,
}

impl FlowStatus {
    /// Check if the flow is still accepting steps
    pub fn is_running(&self) -> bool {
        matches!(self, FlowStatus::Running)
    }

    /// Check if the flow has finished, whatever the outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowStatus::Complete | FlowStatus::Cancelled | FlowStatus::Errored
        )
    }
}

/// Captured when a flow starts: the node it runs in, the path length to
/// unwind back to and which of the owner's modal slots were already showing.
///
/// Acts as an anonymous checkpoint that is never registered on the node.
/// Slots that were showing at start survive the unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowState {
    pub start_index: usize,
    pub owner: NodeId,
    pub sheet_was_open: bool,
    pub cover_was_open: bool,
}

impl FlowState {
    /// Whether the slot was already showing when the flow started.
    pub fn was_open(&self, kind: ModalKind) -> bool {
        match kind {
            ModalKind::Sheet => self.sheet_was_open,
            ModalKind::Cover => self.cover_was_open,
        }
    }
}

/// A single step's verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep<D, E> {
    /// Show this destination and wait for the next value.
    Destination(D),
    Complete,
    Cancel,
    Error(E),
}

impl<D, E> FlowStep<D, E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FlowStep::Destination(_))
    }

    /// Map the error type
    pub fn map_err<F, E2>(self, f: F) -> FlowStep<D, E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            FlowStep::Destination(d) => FlowStep::Destination(d),
            FlowStep::Complete => FlowStep::Complete,
            FlowStep::Cancel => FlowStep::Cancel,
            FlowStep::Error(e) => FlowStep::Error(f(e)),
        }
    }
}
