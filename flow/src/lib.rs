//! navstack flow - multi-step sequences over a node's path.
//!
//! - `Flow`: the step function a feature implements
//! - `FlowEngine`: runs a flow, navigates its steps and unwinds on finish
//! - `FlowStatus` / `FlowState` / `FlowStep`: lifecycle and verdict types
//!
//! No async and no I/O: the engine acts on a `Navigator` passed in by the
//! caller.

pub mod engine;
pub mod state;

pub use engine::{Flow, FlowEngine, FlowError};
pub use state::{FlowState, FlowStatus, FlowStep};
