use crate::node::NodeId;

/// A change the rendering layer should react to.
///
/// The tree queues these as it mutates; the renderer drains them once per
/// update cycle and re-renders the affected nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEvent {
    Spawned(NodeId),
    Despawned(NodeId),
    PathChanged(NodeId),
    SlotsChanged(NodeId),
    CheckpointsChanged(NodeId),
    /// The node was dismissed; its presenting context should tear it down.
    Dismissed(NodeId),
}

impl TreeEvent {
    pub fn node(&self) -> NodeId {
        match self {
            TreeEvent::Spawned(id)
            | TreeEvent::Despawned(id)
            | TreeEvent::PathChanged(id)
            | TreeEvent::SlotsChanged(id)
            | TreeEvent::CheckpointsChanged(id)
            | TreeEvent::Dismissed(id) => *id,
        }
    }
}
