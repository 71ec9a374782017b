use crate::checkpoint::CheckpointRegistry;
use crate::destination::ModalKind;
use crate::path::NavigationPath;
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Generational handle into a [`NodeTree`](crate::tree::NodeTree).
///
/// A handle goes stale once its node is despawned; a later node reusing the
/// same slot gets a new generation, so the stale handle never aliases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// Persistable identity of a node.
pub type NodeKey = Uuid;

/// Broadcast channel shared by every node of one rooted tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// Navigation state of one stack or modal scope.
#[derive(Debug, Clone)]
pub struct NavigationNode<D> {
    pub key: NodeKey,
    pub name: Option<String>,
    pub path: NavigationPath<D>,
    pub sheet: Option<D>,
    pub cover: Option<D>,
    pub checkpoints: CheckpointRegistry,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) channel: ChannelId,
    pub is_presented: bool,
    /// Slot of the parent this node was presented through, if any.
    pub presentation: Option<ModalKind>,
    pub navigation_locks: BTreeSet<String>,
}

impl<D> NavigationNode<D> {
    pub(crate) fn new(name: Option<String>, parent: Option<NodeId>, channel: ChannelId) -> Self {
        NavigationNode {
            key: Uuid::new_v4(),
            name,
            path: NavigationPath::new(),
            sheet: None,
            cover: None,
            checkpoints: CheckpointRegistry::new(),
            parent,
            children: Vec::new(),
            channel,
            is_presented: false,
            presentation: None,
            navigation_locks: BTreeSet::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn slot(&self, kind: ModalKind) -> Option<&D> {
        match kind {
            ModalKind::Sheet => self.sheet.as_ref(),
            ModalKind::Cover => self.cover.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, kind: ModalKind) -> &mut Option<D> {
        match kind {
            ModalKind::Sheet => &mut self.sheet,
            ModalKind::Cover => &mut self.cover,
        }
    }

    pub fn has_modal(&self) -> bool {
        self.sheet.is_some() || self.cover.is_some()
    }

    pub fn is_locally_locked(&self) -> bool {
        !self.navigation_locks.is_empty()
    }
}
