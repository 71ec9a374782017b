//! # NodeTree: The Navigation Forest
//!
//! The `NodeTree` is an arena of [`NavigationNode`]s addressed by generational
//! [`NodeId`] handles. Parent/child edges are stored as handles, so the tree
//! never owns the rendering layer's scopes: a scope that goes away calls
//! [`NodeTree::despawn`] from its teardown hook and the edges disappear with it.
//!
//! ## Invariants
//!
//! * Every path mutation garbage-collects checkpoints whose index exceeds the
//!   new path length.
//! * Shrinking operations are all-or-nothing and report success as `bool`.
//! * Edge mutations (`add_child`, `remove_child`, `despawn`) are idempotent.
//! * Operations on a stale handle are logged no-ops.

use crate::checkpoint::{Checkpoint, CheckpointRegistry};
use crate::destination::{Destination, ModalKind, PresentationMethod};
use crate::error::{NavigationError, NavigationResult};
use crate::event::TreeEvent;
use crate::log::{LogCategory, LogEvent, LogLevel, NavigationLogger, TracingLogger};
use crate::node::{ChannelId, NavigationNode, NodeId, NodeKey};
use std::sync::Arc;

struct Slot<D> {
    generation: u32,
    node: Option<NavigationNode<D>>,
}

/// Arena holding every navigation node of an application.
pub struct NodeTree<D> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    next_channel: u64,
    events: Vec<TreeEvent>,
    logger: Arc<dyn NavigationLogger>,
}

impl<D> Default for NodeTree<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for NodeTree<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTree")
            .field("live_nodes", &self.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

// ============================================================================
// Arena & topology
// ============================================================================

impl<D> NodeTree<D> {
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger::default()))
    }

    pub fn with_logger(logger: Arc<dyn NavigationLogger>) -> Self {
        NodeTree {
            slots: Vec::new(),
            free: Vec::new(),
            next_channel: 0,
            events: Vec::new(),
            logger,
        }
    }

    pub fn set_logger(&mut self, logger: Arc<dyn NavigationLogger>) {
        self.logger = logger;
    }

    pub fn logger(&self) -> &Arc<dyn NavigationLogger> {
        &self.logger
    }

    pub fn log(
        &self,
        category: LogCategory,
        level: LogLevel,
        node: Option<NodeId>,
        message: impl Into<String>,
    ) {
        let mut event = LogEvent::new(category, level, message);
        event.node = node;
        self.logger.log(&event);
    }

    pub fn get(&self, id: NodeId) -> Option<&NavigationNode<D>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NavigationNode<D>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Check liveness, logging a warning for stale handles.
    fn live(&self, id: NodeId, operation: &str) -> bool {
        if self.contains(id) {
            return true;
        }
        self.log(
            LogCategory::Lifecycle,
            LogLevel::Warning,
            Some(id),
            format!("{operation} ignored: stale node handle"),
        );
        false
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of every live node, in slot order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| NodeId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.ids()
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|n| n.parent.is_none()))
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.ids()
            .into_iter()
            .find(|id| self.get(*id).and_then(|n| n.name.as_deref()) == Some(name))
    }

    pub fn find_by_key(&self, key: NodeKey) -> Option<NodeId> {
        self.ids()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|n| n.key == key))
    }

    fn alloc(&mut self, node: NavigationNode<D>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    /// Create a root node with its own broadcast channel.
    pub fn spawn_root(&mut self, name: Option<&str>) -> NodeId {
        let channel = self.allocate_channel();
        let id = self.alloc(NavigationNode::new(name.map(str::to_string), None, channel));
        self.events.push(TreeEvent::Spawned(id));
        self.log(
            LogCategory::Lifecycle,
            LogLevel::Info,
            Some(id),
            format!("root spawned (name: {})", name.unwrap_or("-")),
        );
        id
    }

    /// Create a child of `parent`, sharing its channel.
    ///
    /// A child spawned with a `presentation` starts presented: it is the
    /// scope rendered for the parent's sheet or cover slot.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        presentation: Option<ModalKind>,
    ) -> Option<NodeId> {
        if !self.live(parent, "spawn_child") {
            return None;
        }
        let channel = self.get(parent)?.channel;
        let mut node = NavigationNode::new(name.map(str::to_string), Some(parent), channel);
        node.is_presented = presentation.is_some();
        node.presentation = presentation;
        let id = self.alloc(node);
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        self.events.push(TreeEvent::Spawned(id));
        self.log(
            LogCategory::Lifecycle,
            LogLevel::Info,
            Some(id),
            format!(
                "child spawned under {parent} (name: {}, presented: {})",
                name.unwrap_or("-"),
                presentation.is_some()
            ),
        );
        Some(id)
    }

    /// Remove a node and its whole subtree.
    ///
    /// Returns the handles that were released, deepest first. Calling it
    /// again on the same handle returns an empty list.
    pub fn despawn(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        if let Some(parent) = self.get(id).and_then(|n| n.parent) {
            self.detach(parent, id);
        }
        let released = self.subtree_postorder(id);
        for node_id in &released {
            let slot = &mut self.slots[node_id.index as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node_id.index);
            self.events.push(TreeEvent::Despawned(*node_id));
        }
        self.log(
            LogCategory::Lifecycle,
            LogLevel::Info,
            Some(id),
            format!("despawned ({} node(s))", released.len()),
        );
        released
    }

    /// Attach `child` under `parent`, moving it from any previous parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        if self.ancestors(parent).contains(&child) {
            self.log(
                LogCategory::Lifecycle,
                LogLevel::Error,
                Some(child),
                format!("refusing to attach under own descendant {parent}"),
            );
            return false;
        }
        let previous = self.get(child).and_then(|n| n.parent);
        if previous == Some(parent) {
            return true;
        }
        if let Some(previous) = previous {
            self.detach(previous, child);
        }
        let channel = self.get(parent).map(|n| n.channel).unwrap_or(ChannelId(0));
        if let Some(parent_node) = self.get_mut(parent) {
            if !parent_node.children.contains(&child) {
                parent_node.children.push(child);
            }
        }
        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = Some(parent);
        }
        self.set_subtree_channel(child, channel);
        true
    }

    /// Detach `child` from `parent`. Safe to call repeatedly.
    ///
    /// The detached subtree becomes its own tree and gets a fresh channel.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let (removed, orphaned) = self.detach(parent, child);
        if orphaned {
            let channel = self.allocate_channel();
            self.set_subtree_channel(child, channel);
        }
        removed
    }

    /// Cut the edge both ways. Returns whether `parent` listed `child` and
    /// whether `child` lost its parent.
    fn detach(&mut self, parent: NodeId, child: NodeId) -> (bool, bool) {
        let mut removed = false;
        if let Some(parent_node) = self.get_mut(parent) {
            let before = parent_node.children.len();
            parent_node.children.retain(|c| *c != child);
            removed = parent_node.children.len() != before;
        }
        let orphaned = self.get_mut(child).is_some_and(|child_node| {
            let attached = child_node.parent == Some(parent);
            if attached {
                child_node.parent = None;
            }
            attached
        });
        (removed, orphaned)
    }

    fn allocate_channel(&mut self) -> ChannelId {
        let channel = ChannelId(self.next_channel);
        self.next_channel += 1;
        channel
    }

    fn set_subtree_channel(&mut self, id: NodeId, channel: ChannelId) {
        for node_id in self.subtree_postorder(id) {
            if let Some(node) = self.get_mut(node_id) {
                node.channel = channel;
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id).map(|_| id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        chain
    }

    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).last().copied()
    }

    pub fn channel_of(&self, id: NodeId) -> Option<ChannelId> {
        self.get(id).map(|n| n.channel)
    }

    /// Nodes of `id`'s subtree (itself included), children before parents.
    pub fn subtree_postorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_postorder(id, &mut out);
        out
    }

    fn collect_postorder(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.get(id) {
            for child in &node.children {
                self.collect_postorder(*child, out);
            }
            out.push(id);
        }
    }

    /// Nodes of `id`'s subtree (itself included), parents before children.
    pub fn subtree_preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Drain the changes accumulated since the last call.
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[TreeEvent] {
        &self.events
    }
}

// ============================================================================
// Path operations
// ============================================================================

impl<D: Destination> NodeTree<D> {
    pub fn path(&self, id: NodeId) -> Option<&[D]> {
        self.get(id).map(|n| n.path.as_slice())
    }

    pub fn path_len(&self, id: NodeId) -> usize {
        self.get(id).map(|n| n.path.len()).unwrap_or(0)
    }

    /// Append to the node's path. Always succeeds on a live node.
    pub fn push(&mut self, id: NodeId, destination: D) {
        if !self.live(id, "push") {
            return;
        }
        self.log(
            LogCategory::Navigation,
            LogLevel::Info,
            Some(id),
            format!("push {destination:?}"),
        );
        if let Some(node) = self.get_mut(id) {
            node.path.push(destination);
        }
        self.after_path_mutation(id);
    }

    /// Remove `count` trailing entries, or nothing.
    pub fn pop(&mut self, id: NodeId, count: usize) -> bool {
        if !self.live(id, "pop") {
            return false;
        }
        let popped = self.get_mut(id).is_some_and(|n| n.path.pop(count));
        if popped {
            self.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(id),
                format!("pop {count}"),
            );
            self.after_path_mutation(id);
        }
        popped
    }

    /// Truncate the path to `index` entries.
    pub fn pop_to(&mut self, id: NodeId, index: usize) -> bool {
        if !self.live(id, "pop_to") {
            return false;
        }
        let before = self.path_len(id);
        let truncated = self.get_mut(id).is_some_and(|n| n.path.truncate_to(index));
        if truncated && before != index {
            self.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(id),
                format!("pop to {index} (from {before})"),
            );
            self.after_path_mutation(id);
        }
        truncated
    }

    pub fn pop_all(&mut self, id: NodeId) -> bool {
        if self.path_len(id) == 0 {
            return false;
        }
        self.pop_to(id, 0)
    }

    /// Present `destination` using `method`.
    ///
    /// Modal methods are idempotent: re-presenting a destination with the
    /// identity already in the slot returns `false`. `BroadcastOnly` never
    /// touches the tree and returns `false`; the runtime forwards it to the
    /// node's channel.
    pub fn navigate(&mut self, id: NodeId, destination: D, method: PresentationMethod) -> bool {
        if !self.live(id, "navigate") {
            return false;
        }
        match method {
            PresentationMethod::Push => {
                self.push(id, destination);
                true
            }
            PresentationMethod::Sheet => self.present(id, ModalKind::Sheet, destination),
            PresentationMethod::Cover => self.present(id, ModalKind::Cover, destination),
            PresentationMethod::BroadcastOnly => false,
        }
    }

    fn present(&mut self, id: NodeId, kind: ModalKind, destination: D) -> bool {
        let identity = destination.identity();
        let occupied = self
            .get(id)
            .and_then(|n| n.slot(kind))
            .map(|current| current.identity());
        if occupied == Some(identity) {
            self.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(id),
                format!("{kind:?} already presenting {destination:?}"),
            );
            return false;
        }
        if occupied.is_some() {
            // The scope rendered for the old value goes away with it.
            let stale: Vec<NodeId> = self
                .children(id)
                .into_iter()
                .filter(|c| {
                    self.get(*c)
                        .is_some_and(|n| n.is_presented && n.presentation == Some(kind))
                })
                .collect();
            for child in stale {
                self.dismiss_subtree(child);
            }
        }
        self.log(
            LogCategory::Navigation,
            LogLevel::Info,
            Some(id),
            format!("present {kind:?} {destination:?}"),
        );
        if let Some(node) = self.get_mut(id) {
            *node.slot_mut(kind) = Some(destination);
        }
        self.events.push(TreeEvent::SlotsChanged(id));
        true
    }

    fn after_path_mutation(&mut self, id: NodeId) {
        let removed = match self.get_mut(id) {
            Some(node) => {
                let len = node.path.len();
                node.checkpoints.collect_garbage(len)
            }
            None => return,
        };
        self.events.push(TreeEvent::PathChanged(id));
        if !removed.is_empty() {
            self.events.push(TreeEvent::CheckpointsChanged(id));
            self.log(
                LogCategory::Checkpoint,
                LogLevel::Info,
                Some(id),
                format!("collected stale checkpoints {removed:?}"),
            );
        }
    }
}

// ============================================================================
// Presentation lifecycle
// ============================================================================

impl<D: Destination> NodeTree<D> {
    pub fn is_presented(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_presented)
    }

    /// True when the node shows a modal or has a live presented child.
    pub fn is_presenting(&self, id: NodeId) -> bool {
        match self.get(id) {
            Some(node) => {
                node.has_modal()
                    || node
                        .children
                        .iter()
                        .any(|c| self.get(*c).is_some_and(|n| n.is_presented))
            }
            None => false,
        }
    }

    /// Dismiss a presented node together with everything it presents.
    pub fn dismiss(&mut self, id: NodeId) -> bool {
        if !self.live(id, "dismiss") {
            return false;
        }
        if !self.is_presented(id) {
            self.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(id),
                "dismiss ignored: node is not presented",
            );
            return false;
        }
        self.dismiss_subtree(id);
        true
    }

    /// Clear the node's own modal slots without walking deeper than its
    /// direct children.
    pub fn dismiss_presented_views(&mut self, id: NodeId) -> bool {
        if !self.live(id, "dismiss_presented_views") {
            return false;
        }
        let mut changed = self.clear_slots(id);
        for child in self.children(id) {
            let presented = self.get_mut(child).is_some_and(|n| {
                let was = n.is_presented;
                n.is_presented = false;
                was
            });
            if presented {
                self.events.push(TreeEvent::Dismissed(child));
                changed = true;
            }
        }
        changed
    }

    /// Dismiss one modal slot of `id` along with the presented child
    /// rendered for it. The other slot is left alone.
    pub fn dismiss_modal(&mut self, id: NodeId, kind: ModalKind) -> bool {
        if !self.live(id, "dismiss_modal") {
            return false;
        }
        let mut changed = false;
        for child in self.children(id) {
            let shown = self
                .get(child)
                .is_some_and(|n| n.is_presented && n.presentation == Some(kind));
            if shown {
                self.dismiss_subtree(child);
                changed = true;
            }
        }
        let cleared = self.get_mut(id).is_some_and(|n| n.slot_mut(kind).take().is_some());
        if cleared {
            self.events.push(TreeEvent::SlotsChanged(id));
        }
        changed || cleared
    }

    /// Dismiss everything presented at or below `id`, deepest first, and
    /// clear `id`'s own slots. `id` itself stays presented.
    pub fn dismiss_presented_descendants(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut changed = false;
        for child in self.children(id) {
            if self.is_presented(child) {
                self.dismiss_subtree(child);
                changed = true;
            } else {
                changed |= self.dismiss_presented_descendants(child);
            }
        }
        changed |= self.clear_slots(id);
        changed
    }

    /// Dismiss the first dismissible scope found walking down from the root.
    pub fn dismiss_all(&mut self, id: NodeId) -> NavigationResult<bool> {
        if !self.live(id, "dismiss_all") {
            return Err(NavigationError::StaleNode);
        }
        if self.is_navigation_locked(id) {
            self.log(
                LogCategory::Navigation,
                LogLevel::Warning,
                Some(id),
                "dismiss_all refused: navigation locked",
            );
            return Err(NavigationError::NavigationLocked);
        }
        let Some(root) = self.root_of(id) else {
            return Ok(false);
        };
        let target = self
            .subtree_preorder(root)
            .into_iter()
            .find(|n| self.is_presenting(*n));
        match target {
            Some(node) => {
                self.log(
                    LogCategory::Navigation,
                    LogLevel::Info,
                    Some(node),
                    "dismiss_all",
                );
                Ok(self.dismiss_presented_descendants(node))
            }
            None => Ok(false),
        }
    }

    /// Pop one entry from the nearest node (self first) with a non-empty path.
    pub fn pop_any(&mut self, id: NodeId) -> NavigationResult<bool> {
        if !self.live(id, "pop_any") {
            return Err(NavigationError::StaleNode);
        }
        if self.is_navigation_locked(id) {
            self.log(
                LogCategory::Navigation,
                LogLevel::Warning,
                Some(id),
                "pop_any refused: navigation locked",
            );
            return Err(NavigationError::NavigationLocked);
        }
        let target = self
            .ancestors(id)
            .into_iter()
            .find(|n| self.path_len(*n) > 0);
        Ok(match target {
            Some(node) => self.pop(node, 1),
            None => false,
        })
    }

    /// Dismiss presented descendants and empty the path.
    pub fn reset(&mut self, id: NodeId) -> bool {
        if !self.live(id, "reset") {
            return false;
        }
        let dismissed = self.dismiss_presented_descendants(id);
        let popped = self.pop_all(id);
        dismissed || popped
    }

    fn clear_slots(&mut self, id: NodeId) -> bool {
        let cleared = self.get_mut(id).is_some_and(|n| {
            let had = n.has_modal();
            n.sheet = None;
            n.cover = None;
            had
        });
        if cleared {
            self.events.push(TreeEvent::SlotsChanged(id));
        }
        cleared
    }

    fn dismiss_subtree(&mut self, id: NodeId) {
        for node_id in self.subtree_postorder(id) {
            self.clear_slots(node_id);
            let was_presented = self.get_mut(node_id).is_some_and(|n| {
                let was = n.is_presented;
                n.is_presented = false;
                was
            });
            if was_presented {
                self.events.push(TreeEvent::Dismissed(node_id));
                self.log(LogCategory::Navigation, LogLevel::Info, Some(node_id), "dismissed");
            }
        }
        let presentation = self.get(id).and_then(|n| n.presentation);
        if let (Some(parent), Some(kind)) = (self.parent(id), presentation) {
            let cleared = self.get_mut(parent).is_some_and(|n| n.slot_mut(kind).take().is_some());
            if cleared {
                self.events.push(TreeEvent::SlotsChanged(parent));
            }
        }
    }
}

// ============================================================================
// Navigation locks
// ============================================================================

impl<D> NodeTree<D> {
    /// Register a lock. Locks are tree-wide: they are held by the root.
    pub fn add_lock(&mut self, id: NodeId, lock: impl Into<String>) -> bool {
        let Some(root) = self.root_of(id) else {
            return false;
        };
        let lock = lock.into();
        self.log(
            LogCategory::Navigation,
            LogLevel::Info,
            Some(id),
            format!("lock `{lock}` added"),
        );
        self.get_mut(root)
            .is_some_and(|n| n.navigation_locks.insert(lock))
    }

    pub fn remove_lock(&mut self, id: NodeId, lock: &str) -> bool {
        let Some(root) = self.root_of(id) else {
            return false;
        };
        let removed = self
            .get_mut(root)
            .is_some_and(|n| n.navigation_locks.remove(lock));
        if removed {
            self.log(
                LogCategory::Navigation,
                LogLevel::Info,
                Some(id),
                format!("lock `{lock}` removed"),
            );
        }
        removed
    }

    /// True if any node from `id` up to the root holds a lock.
    pub fn is_navigation_locked(&self, id: NodeId) -> bool {
        self.ancestors(id)
            .into_iter()
            .any(|n| self.get(n).is_some_and(|node| node.is_locally_locked()))
    }
}

// ============================================================================
// Checkpoints
// ============================================================================

impl<D: Destination> NodeTree<D> {
    pub fn checkpoints(&self, id: NodeId) -> Option<&CheckpointRegistry> {
        self.get(id).map(|n| &n.checkpoints)
    }

    /// Register `name` at the current path length. First registration wins.
    pub fn add_checkpoint(&mut self, id: NodeId, name: &str) -> bool {
        if !self.live(id, "add_checkpoint") {
            return false;
        }
        let added = self.get_mut(id).is_some_and(|n| {
            let len = n.path.len();
            n.checkpoints.add(name, len)
        });
        if added {
            self.events.push(TreeEvent::CheckpointsChanged(id));
            self.log(
                LogCategory::Checkpoint,
                LogLevel::Info,
                Some(id),
                format!("checkpoint `{name}` added at {}", self.path_len(id)),
            );
        }
        added
    }

    /// Register `name` if needed and bind it to a value type.
    pub fn bind_checkpoint_value(
        &mut self,
        id: NodeId,
        name: &str,
        value_type: &str,
        correlation_id: &str,
    ) -> bool {
        if !self.live(id, "bind_checkpoint_value") {
            return false;
        }
        self.add_checkpoint(id, name);
        let bound = self
            .get_mut(id)
            .is_some_and(|n| n.checkpoints.bind_value(name, value_type, correlation_id));
        if bound {
            self.events.push(TreeEvent::CheckpointsChanged(id));
        }
        bound
    }

    pub fn remove_checkpoint(&mut self, id: NodeId, name: &str) -> bool {
        let removed = self
            .get_mut(id)
            .is_some_and(|n| n.checkpoints.remove(name).is_some());
        if removed {
            self.events.push(TreeEvent::CheckpointsChanged(id));
        }
        removed
    }

    /// Find `name` at `id` or the nearest ancestor holding it.
    pub fn resolve_checkpoint(&self, id: NodeId, name: &str) -> Option<(NodeId, Checkpoint)> {
        self.ancestors(id).into_iter().find_map(|n| {
            self.get(n)
                .and_then(|node| node.checkpoints.get(name))
                .map(|c| (n, c.clone()))
        })
    }

    /// Dismiss whatever is presented and pop back to the named checkpoint.
    ///
    /// A missing checkpoint is logged at `warning` and returns `false`.
    pub fn return_to_checkpoint(&mut self, id: NodeId, name: &str) -> bool {
        match self.resolve_checkpoint(id, name) {
            Some((owner, checkpoint)) => {
                self.log(
                    LogCategory::Checkpoint,
                    LogLevel::Info,
                    Some(owner),
                    format!("returning to `{name}` at {}", checkpoint.index),
                );
                self.unwind_to(owner, checkpoint.index)
            }
            None => {
                self.log(
                    LogCategory::Checkpoint,
                    LogLevel::Warning,
                    Some(id),
                    NavigationError::CheckpointNotFound(name.to_string()).to_string(),
                );
                false
            }
        }
    }

    pub fn can_return_to_checkpoint(&self, id: NodeId, name: &str) -> bool {
        match self.resolve_checkpoint(id, name) {
            Some((owner, checkpoint)) => {
                self.is_presenting(owner) || checkpoint.index < self.path_len(owner)
            }
            None => false,
        }
    }

    /// Dismiss presented descendants of `owner`, then truncate its path.
    pub fn unwind_to(&mut self, owner: NodeId, index: usize) -> bool {
        if !self.live(owner, "unwind_to") {
            return false;
        }
        self.dismiss_presented_descendants(owner);
        self.pop_to(owner, index)
    }

    /// Overwrite a node's persisted state.
    pub fn restore_state(
        &mut self,
        id: NodeId,
        key: Option<NodeKey>,
        path: Vec<D>,
        checkpoints: Vec<Checkpoint>,
        sheet: Option<D>,
        cover: Option<D>,
    ) -> bool {
        if !self.live(id, "restore_state") {
            return false;
        }
        if let Some(node) = self.get_mut(id) {
            if let Some(key) = key {
                node.key = key;
            }
            node.path.replace(path);
            node.checkpoints = checkpoints.into_iter().collect();
            node.sheet = sheet;
            node.cover = cover;
        }
        self.events.push(TreeEvent::SlotsChanged(id));
        self.events.push(TreeEvent::CheckpointsChanged(id));
        self.after_path_mutation(id);
        self.log(LogCategory::Lifecycle, LogLevel::Info, Some(id), "state restored");
        true
    }

    /// Mark a node presented or not, as recorded in a snapshot.
    pub fn set_presented(&mut self, id: NodeId, presented: bool) -> bool {
        if !self.live(id, "set_presented") {
            return false;
        }
        let was = self.get_mut(id).is_some_and(|n| {
            let was = n.is_presented;
            n.is_presented = presented;
            was
        });
        if was && !presented {
            self.events.push(TreeEvent::Dismissed(id));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLogger;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Screen {
        Home,
        Page(u32),
        Login,
    }

    impl Destination for Screen {}

    fn tree() -> NodeTree<Screen> {
        NodeTree::with_logger(Arc::new(NullLogger))
    }

    #[test]
    fn stale_handles_do_not_alias_reused_slots() {
        let mut tree = tree();
        let root = tree.spawn_root(Some("root"));
        let child = tree.spawn_child(root, None, None).unwrap();
        assert_eq!(tree.despawn(child), vec![child]);
        let reused = tree.spawn_child(root, None, None).unwrap();
        assert_eq!(reused.index(), child.index());
        assert_ne!(reused, child);
        assert!(!tree.contains(child));
        tree.push(child, Screen::Home);
        assert_eq!(tree.path_len(reused), 0);
    }

    #[test]
    fn despawn_is_idempotent_and_prunes_parent() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        let child = tree.spawn_child(root, None, None).unwrap();
        let grandchild = tree.spawn_child(child, None, None).unwrap();
        let released = tree.despawn(child);
        assert_eq!(released, vec![grandchild, child]);
        assert!(tree.children(root).is_empty());
        assert!(tree.despawn(child).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn children_share_the_root_channel() {
        let mut tree = tree();
        let a = tree.spawn_root(None);
        let b = tree.spawn_root(None);
        let a1 = tree.spawn_child(a, None, None).unwrap();
        assert_eq!(tree.channel_of(a1), tree.channel_of(a));
        assert_ne!(tree.channel_of(a), tree.channel_of(b));
        assert!(tree.add_child(b, a1));
        assert_eq!(tree.channel_of(a1), tree.channel_of(b));
        assert!(tree.add_child(b, a1));
        assert_eq!(tree.children(b), vec![a1]);
        assert!(tree.children(a).is_empty());
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        let child = tree.spawn_child(root, None, None).unwrap();
        assert!(!tree.add_child(child, root));
        assert!(!tree.add_child(root, root));
    }

    #[test]
    fn remove_child_is_idempotent() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        let child = tree.spawn_child(root, None, None).unwrap();
        assert!(tree.remove_child(root, child));
        assert!(!tree.remove_child(root, child));
        assert_eq!(tree.parent(child), None);
    }

    #[test]
    fn detached_subtree_gets_its_own_channel() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        let child = tree.spawn_child(root, None, None).unwrap();
        let grandchild = tree.spawn_child(child, None, None).unwrap();
        assert!(tree.remove_child(root, child));
        assert_ne!(tree.channel_of(child), tree.channel_of(root));
        assert_eq!(tree.channel_of(grandchild), tree.channel_of(child));

        let before = tree.channel_of(child);
        assert!(!tree.remove_child(root, child));
        assert_eq!(tree.channel_of(child), before);
    }

    #[test]
    fn dismiss_modal_leaves_the_other_slot() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.navigate(root, Screen::Home, PresentationMethod::Sheet);
        let sheet = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();
        tree.navigate(root, Screen::Page(1), PresentationMethod::Cover);
        let cover = tree.spawn_child(root, None, Some(ModalKind::Cover)).unwrap();

        assert!(tree.dismiss_modal(root, ModalKind::Cover));
        assert!(!tree.is_presented(cover));
        assert!(tree.is_presented(sheet));
        assert_eq!(tree.get(root).unwrap().sheet, Some(Screen::Home));
        assert_eq!(tree.get(root).unwrap().cover, None);
        assert!(!tree.dismiss_modal(root, ModalKind::Cover));
    }

    #[test]
    fn pop_all_reports_empty_path() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        assert!(!tree.pop_all(root));
        tree.push(root, Screen::Page(1));
        tree.push(root, Screen::Page(2));
        assert!(tree.pop_all(root));
        assert_eq!(tree.path_len(root), 0);
    }

    #[test]
    fn pop_to_beyond_length_fails() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.push(root, Screen::Page(1));
        assert!(!tree.pop_to(root, 2));
        assert_eq!(tree.path_len(root), 1);
    }

    #[test]
    fn modal_navigation_is_idempotent() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        assert!(tree.navigate(root, Screen::Login, PresentationMethod::Sheet));
        assert!(!tree.navigate(root, Screen::Login, PresentationMethod::Sheet));
        assert!(tree.navigate(root, Screen::Login, PresentationMethod::Cover));
        assert!(!tree.navigate(root, Screen::Home, PresentationMethod::BroadcastOnly));
        assert_eq!(tree.path_len(root), 0);
        assert!(tree.is_presenting(root));
    }

    #[test]
    fn replacing_a_sheet_dismisses_its_old_scope() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        let scope = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();
        assert!(tree.navigate(root, Screen::Page(9), PresentationMethod::Sheet));
        assert!(!tree.is_presented(scope));
        assert_eq!(tree.get(root).unwrap().sheet, Some(Screen::Page(9)));
    }

    #[test]
    fn checkpoint_garbage_collected_after_truncation() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.add_checkpoint(root, "start");
        tree.push(root, Screen::Page(1));
        tree.push(root, Screen::Page(2));
        tree.add_checkpoint(root, "deep");
        assert!(tree.pop(root, 1));
        let registry = tree.checkpoints(root).unwrap();
        assert!(registry.contains("start"));
        assert!(!registry.contains("deep"));
    }

    #[test]
    fn return_to_checkpoint_pops_home() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.add_checkpoint(root, "home");
        tree.push(root, Screen::Page(2));
        assert!(tree.can_return_to_checkpoint(root, "home"));
        assert!(tree.return_to_checkpoint(root, "home"));
        assert_eq!(tree.path_len(root), 0);
        assert!(!tree.can_return_to_checkpoint(root, "home"));
    }

    #[test]
    fn return_to_missing_checkpoint_is_soft_failure() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.push(root, Screen::Page(1));
        assert!(!tree.return_to_checkpoint(root, "nowhere"));
        assert_eq!(tree.path_len(root), 1);
    }

    #[test]
    fn nearest_checkpoint_wins() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.push(root, Screen::Page(1));
        tree.add_checkpoint(root, "x");
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        let modal = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();
        tree.push(modal, Screen::Page(10));
        tree.add_checkpoint(modal, "x");
        tree.push(modal, Screen::Page(11));
        tree.push(modal, Screen::Page(12));

        let (owner, checkpoint) = tree.resolve_checkpoint(modal, "x").unwrap();
        assert_eq!(owner, modal);
        assert_eq!(checkpoint.index, 1);

        assert!(tree.return_to_checkpoint(modal, "x"));
        assert_eq!(tree.path_len(modal), 1);
        assert!(tree.is_presented(modal));
        assert_eq!(tree.path_len(root), 1);
    }

    #[test]
    fn parent_checkpoint_dismisses_presented_children() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.add_checkpoint(root, "home");
        tree.push(root, Screen::Page(1));
        tree.navigate(root, Screen::Login, PresentationMethod::Cover);
        let modal = tree.spawn_child(root, None, Some(ModalKind::Cover)).unwrap();
        tree.navigate(modal, Screen::Page(5), PresentationMethod::Sheet);
        let nested = tree.spawn_child(modal, None, Some(ModalKind::Sheet)).unwrap();
        tree.drain_events();

        assert!(tree.return_to_checkpoint(nested, "home"));
        assert!(!tree.is_presented(nested));
        assert!(!tree.is_presented(modal));
        assert!(tree.get(root).unwrap().cover.is_none());
        assert_eq!(tree.path_len(root), 0);

        let dismissed: Vec<NodeId> = tree
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                TreeEvent::Dismissed(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(dismissed, vec![nested, modal]);
    }

    #[test]
    fn can_return_when_presenting_at_checkpoint_index() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.add_checkpoint(root, "here");
        assert!(!tree.can_return_to_checkpoint(root, "here"));
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        assert!(tree.can_return_to_checkpoint(root, "here"));
    }

    #[test]
    fn dismiss_requires_presented_state() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        assert!(!tree.dismiss(root));
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        let modal = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();
        assert!(tree.dismiss(modal));
        assert!(tree.get(root).unwrap().sheet.is_none());
        assert!(!tree.dismiss(modal));
    }

    #[test]
    fn dismiss_all_respects_locks() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        let modal = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();

        assert!(tree.add_lock(modal, "auth"));
        assert!(tree.is_navigation_locked(root));
        assert_eq!(tree.dismiss_all(modal), Err(NavigationError::NavigationLocked));
        assert!(tree.is_presented(modal));

        assert!(tree.remove_lock(modal, "auth"));
        assert_eq!(tree.dismiss_all(modal), Ok(true));
        assert!(!tree.is_presented(modal));
        assert_eq!(tree.dismiss_all(modal), Ok(false));
    }

    #[test]
    fn dismiss_presented_views_stays_local() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        let modal = tree.spawn_child(root, None, Some(ModalKind::Sheet)).unwrap();
        tree.navigate(modal, Screen::Page(3), PresentationMethod::Cover);
        let nested = tree.spawn_child(modal, None, Some(ModalKind::Cover)).unwrap();

        assert!(tree.dismiss_presented_views(root));
        assert!(!tree.is_presented(modal));
        assert!(tree.is_presented(nested));
        assert!(tree.get(modal).unwrap().cover.is_some());
        assert!(!tree.dismiss_presented_views(root));
    }

    #[test]
    fn pop_any_walks_toward_root() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.push(root, Screen::Page(1));
        let tab = tree.spawn_child(root, None, None).unwrap();
        assert_eq!(tree.pop_any(tab), Ok(true));
        assert_eq!(tree.path_len(root), 0);
        assert_eq!(tree.pop_any(tab), Ok(false));
        tree.add_lock(root, "busy");
        assert_eq!(tree.pop_any(tab), Err(NavigationError::NavigationLocked));
    }

    #[test]
    fn reset_clears_everything() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        tree.push(root, Screen::Page(1));
        tree.navigate(root, Screen::Login, PresentationMethod::Sheet);
        assert!(tree.reset(root));
        assert_eq!(tree.path_len(root), 0);
        assert!(!tree.is_presenting(root));
        assert!(!tree.reset(root));
    }

    #[test]
    fn restore_state_collects_stale_checkpoints() {
        let mut tree = tree();
        let root = tree.spawn_root(None);
        let checkpoints = vec![Checkpoint::new("a", 1), Checkpoint::new("b", 4)];
        assert!(tree.restore_state(
            root,
            None,
            vec![Screen::Home, Screen::Page(1)],
            checkpoints,
            Some(Screen::Login),
            None,
        ));
        let registry = tree.checkpoints(root).unwrap();
        assert!(registry.contains("a"));
        assert!(!registry.contains("b"));
        assert_eq!(tree.get(root).unwrap().sheet, Some(Screen::Login));
    }
}
