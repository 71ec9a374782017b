//! navstack core - the navigation state tree.
//!
//! This crate is synchronous and knows nothing about rendering, timers or
//! persistence backends. It defines:
//! - `Destination`: what a screen is and how it is presented
//! - `NodeTree`: the arena of navigation nodes with paths, modal slots,
//!   checkpoints and locks
//! - `NavigationLogger`: the logging collaborator
//! - `NavigatorConfig`: policy knobs shared with the runtime

pub mod checkpoint;
pub mod config;
pub mod destination;
pub mod error;
pub mod event;
pub mod log;
pub mod node;
pub mod path;
pub mod tree;

pub use checkpoint::{Checkpoint, CheckpointRegistry};
pub use config::NavigatorConfig;
pub use destination::{Destination, DestinationIdentity, ModalKind, PresentationMethod};
pub use error::{NavigationError, NavigationResult};
pub use event::TreeEvent;
pub use log::{LogCategory, LogEvent, LogLevel, NavigationLogger, NullLogger, TracingLogger};
pub use node::{ChannelId, NavigationNode, NodeId, NodeKey};
pub use path::NavigationPath;
pub use tree::NodeTree;

pub mod prelude {
    pub use crate::checkpoint::Checkpoint;
    pub use crate::config::NavigatorConfig;
    pub use crate::destination::{Destination, ModalKind, PresentationMethod};
    pub use crate::error::{NavigationError, NavigationResult};
    pub use crate::event::TreeEvent;
    pub use crate::log::{LogLevel, NavigationLogger};
    pub use crate::node::NodeId;
    pub use crate::tree::NodeTree;
}
