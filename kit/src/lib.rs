//! navstack facade crate.
//!
//! Re-exports the core tree, the runtime navigator and (with the default
//! `flow` feature) the flow engine behind a single entry point.

pub use navstack_core as core;
#[cfg(feature = "flow")]
pub use navstack_flow as flow;
pub use navstack_runtime as runtime;

pub mod telemetry;

pub use navstack_core::{
    Destination, NavigationError, NavigationResult, NavigatorConfig, NodeId, NodeTree,
    PresentationMethod,
};
#[cfg(feature = "flow")]
pub use navstack_flow::{Flow, FlowEngine, FlowStatus, FlowStep};
pub use navstack_runtime::{Navigator, Payload, ResumeDirective};

pub mod prelude {
    pub use navstack_core::prelude::*;
    #[cfg(feature = "flow")]
    pub use navstack_flow::{Flow, FlowEngine, FlowStatus, FlowStep};
    pub use navstack_runtime::prelude::*;
}
