//! navstack runtime - the per-tree coordination context.
//!
//! Builds on `navstack-core` with everything that needs erased values,
//! timers or I/O:
//! - `Navigator`: the tree plus one broadcast channel per root
//! - `BroadcastChannel`: send, pause and resume of multi-value sequences
//! - checkpoint-value correlation
//! - snapshots and the `SnapshotStore` persistence collaborator
//! - the `DeepLinkHandler` collaborator

pub mod channel;
pub mod checkpoint;
pub mod deeplink;
pub mod message;
pub mod navigator;
pub mod persistence;
pub mod snapshot;

pub mod prelude {
    pub use crate::channel::{ReceiveContext, ResumeDirective, SubscriptionId};
    pub use crate::deeplink::DeepLinkHandler;
    pub use crate::message::{Message, Payload};
    pub use crate::navigator::Navigator;
    pub use crate::persistence::{MemorySnapshotStore, SnapshotStore};
}

pub use channel::{BroadcastChannel, ReceiveContext, ResumeDirective, SubscriptionId};
pub use deeplink::DeepLinkHandler;
pub use message::{Envelope, Message, Payload};
pub use navigator::{Navigator, TreeMut};
pub use persistence::{MemorySnapshotStore, SnapshotStore};
pub use snapshot::{RestoredState, SNAPSHOT_FORMAT_VERSION};
