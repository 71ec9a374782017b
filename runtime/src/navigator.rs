//! # Navigator: The Per-Tree Coordination Context
//!
//! The `Navigator` owns the [`NodeTree`] and one [`BroadcastChannel`] per
//! rooted tree. It is the handle UI code talks to: every operation takes the
//! [`NodeId`] of the scope issuing it, and is resolved against that scope's
//! tree and channel.
//!
//! ## Scheduling model
//!
//! All mutation happens on the caller's coordination sequence (the UI
//! thread or main loop). Nothing here blocks: timed resumes are recorded and
//! fired by [`Navigator::tick`], or by awaiting [`Navigator::run_pending`]
//! on a tokio runtime.

use crate::channel::{
    BroadcastChannel, Filter, Handler, ReceiveContext, ResumeDirective, Subscriber, SubscriptionId,
};
use crate::message::{Envelope, Message, Payload};
use ahash::AHashMap;
use navstack_core::{
    ChannelId, Destination, LogCategory, LogLevel, ModalKind, NavigationLogger, NavigatorConfig,
    NodeId, NodeTree, PresentationMethod, TracingLogger,
};
use std::any::TypeId;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

pub struct Navigator<D> {
    pub(crate) tree: NodeTree<D>,
    pub(crate) channels: AHashMap<ChannelId, BroadcastChannel<D>>,
    config: NavigatorConfig,
    next_subscription: u64,
}

impl<D> std::fmt::Debug for Navigator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("tree", &self.tree)
            .field("channels", &self.channels.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<D: Destination> Default for Navigator<D> {
    fn default() -> Self {
        Self::new(NavigatorConfig::default())
    }
}

// ============================================================================
// Construction & tree lifecycle
// ============================================================================

impl<D: Destination> Navigator<D> {
    pub fn new(config: NavigatorConfig) -> Self {
        let logger = Arc::new(TracingLogger::new(config.log_level));
        Self::with_logger(config, logger)
    }

    pub fn with_logger(config: NavigatorConfig, logger: Arc<dyn NavigationLogger>) -> Self {
        Navigator {
            tree: NodeTree::with_logger(logger),
            channels: AHashMap::new(),
            config,
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn tree(&self) -> &NodeTree<D> {
        &self.tree
    }

    /// Direct tree access for path, checkpoint, dismiss and lock operations.
    ///
    /// Subscriptions are brought in line with the tree when the returned
    /// guard drops.
    pub fn tree_mut(&mut self) -> TreeMut<'_, D> {
        TreeMut { nav: self }
    }

    pub fn spawn_root(&mut self, name: Option<&str>) -> NodeId {
        let id = self.tree.spawn_root(name);
        if let Some(channel) = self.tree.channel_of(id) {
            self.channels.entry(channel).or_default();
        }
        id
    }

    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        name: Option<&str>,
        presentation: Option<ModalKind>,
    ) -> Option<NodeId> {
        self.tree.spawn_child(parent, name, presentation)
    }

    /// Teardown hook for the rendering layer.
    ///
    /// Releases the subtree and its subscriptions. A channel goes away once
    /// no live root uses it. Safe to call more than once.
    pub fn despawn(&mut self, id: NodeId) -> Vec<NodeId> {
        let released = self.tree.despawn(id);
        if !released.is_empty() {
            self.reconcile_subscribers();
        }
        released
    }

    /// Attach `child` under `parent`. The subtree's subscriptions move to
    /// `parent`'s channel.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.tree_mut().add_child(parent, child)
    }

    /// Detach `child` into a tree of its own, taking its subscriptions
    /// along to its fresh channel.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.tree_mut().remove_child(parent, child)
    }

    /// Navigate using the destination's own presentation method.
    pub fn navigate(&mut self, node: NodeId, destination: D) -> bool {
        let method = destination.method();
        self.navigate_with(node, destination, method)
    }

    /// `BroadcastOnly` goes to the node's channel instead of the tree.
    pub fn navigate_with(
        &mut self,
        node: NodeId,
        destination: D,
        method: PresentationMethod,
    ) -> bool {
        match method {
            PresentationMethod::BroadcastOnly => self.send(node, destination),
            _ => self.tree.navigate(node, destination, method),
        }
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

impl<D: Destination> Navigator<D> {
    /// Receive every uncorrelated value of type `T` sent on `node`'s channel.
    pub fn on_receive<T, F>(&mut self, node: NodeId, mut handler: F) -> Option<SubscriptionId>
    where
        T: Message,
        F: FnMut(&T, &mut ReceiveContext<'_, D>) -> ResumeDirective + Send + 'static,
    {
        let erased: Handler<D> = Box::new(
            move |envelope: &Envelope, cx: &mut ReceiveContext<'_, D>| {
                match envelope.payload.downcast_ref::<T>() {
                    Some(value) => handler(value, cx),
                    None => ResumeDirective::Pause,
                }
            },
        );
        self.subscribe(node, Filter::Type(TypeId::of::<T>()), None, erased)
    }

    /// Navigate `node` to every destination value received on its channel,
    /// then resume the sequence after the configured delay.
    pub fn auto_receive(&mut self, node: NodeId) -> Option<SubscriptionId> {
        self.on_receive::<D, _>(node, |destination, cx| {
            let method = destination.method();
            let node = cx.node();
            cx.tree_mut().navigate(node, destination.clone(), method);
            ResumeDirective::Auto
        })
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channels.values_mut().any(|c| c.unsubscribe(id))
    }

    pub(crate) fn subscribe(
        &mut self,
        node: NodeId,
        filter: Filter,
        checkpoint: Option<String>,
        handler: Handler<D>,
    ) -> Option<SubscriptionId> {
        let Some(channel) = self.tree.channel_of(node) else {
            self.tree.log(
                LogCategory::Lifecycle,
                LogLevel::Warning,
                Some(node),
                "subscribe ignored: stale node handle",
            );
            return None;
        };
        self.reconcile_subscribers();
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.channels.entry(channel).or_default().subscribers.push(Subscriber {
            id,
            node,
            filter,
            checkpoint,
            handler,
        });
        Some(id)
    }
}

// ============================================================================
// Send / resume
// ============================================================================

impl<D: Destination> Navigator<D> {
    pub fn channel(&self, node: NodeId) -> Option<&BroadcastChannel<D>> {
        self.tree
            .channel_of(node)
            .and_then(|channel| self.channels.get(&channel))
    }

    /// Values still waiting to be delivered on `node`'s channel.
    pub fn pending(&self, node: NodeId) -> Vec<Payload> {
        self.channel(node)
            .map(|c| c.pending().cloned().collect())
            .unwrap_or_default()
    }

    /// Publish one value now. Any pending sequence is discarded.
    ///
    /// Returns whether at least one receiver took the value.
    pub fn send<T: Message>(&mut self, node: NodeId, value: T) -> bool {
        self.send_all(node, [Payload::new(value)])
    }

    /// Publish the first value now and park the rest until a receiver
    /// resumes the sequence.
    pub fn send_all<I>(&mut self, node: NodeId, values: I) -> bool
    where
        I: IntoIterator<Item = Payload>,
    {
        let Some(channel) = self.channel_id(node, "send") else {
            return false;
        };
        let values: Vec<Payload> = values.into_iter().collect();
        self.tree.log(
            LogCategory::Send,
            LogLevel::Info,
            Some(node),
            format!("send {values:?}"),
        );
        let chan = self.channels.entry(channel).or_default();
        chan.replace_pending(values);
        let before = chan.delivered();
        self.advance(channel);
        self.channels
            .get(&channel)
            .is_some_and(|c| c.delivered() > before)
    }

    /// Continue the pending sequence on `node`'s channel.
    ///
    /// Returns `false` when nothing is pending or the directive is `Pause`.
    pub fn resume(&mut self, node: NodeId, directive: ResumeDirective) -> bool {
        let Some(channel) = self.channel_id(node, "resume") else {
            return false;
        };
        if !self.channels.get(&channel).is_some_and(|c| c.has_pending()) {
            self.tree.log(
                LogCategory::Send,
                LogLevel::Info,
                Some(node),
                "resume ignored: nothing pending",
            );
            return false;
        }
        self.apply(channel, directive)
    }

    /// Replace the pending sequence, then resume it.
    ///
    /// Used by gates that must inject their own steps before letting the
    /// original sequence continue.
    pub fn resume_with<I>(&mut self, node: NodeId, values: I, directive: ResumeDirective) -> bool
    where
        I: IntoIterator<Item = Payload>,
    {
        let Some(channel) = self.channel_id(node, "resume_with") else {
            return false;
        };
        let values: Vec<Payload> = values.into_iter().collect();
        self.tree.log(
            LogCategory::Send,
            LogLevel::Info,
            Some(node),
            format!("resume with {values:?}"),
        );
        self.channels.entry(channel).or_default().replace_pending(values);
        self.resume(node, directive)
    }

    /// Drop the pending sequence. Idempotent.
    pub fn cancel(&mut self, node: NodeId) -> bool {
        let Some(channel) = self.channel_id(node, "cancel") else {
            return false;
        };
        let had = self.channels.entry(channel).or_default().cancel();
        if had {
            self.tree
                .log(LogCategory::Send, LogLevel::Info, Some(node), "pending values cancelled");
        }
        had
    }

    /// Earliest scheduled resume across all channels.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.channels.values().filter_map(|c| c.next_deadline()).min()
    }

    /// Fire every scheduled resume due at `now`.
    ///
    /// Resumes scheduled under a queue that has since been replaced are
    /// dropped. Returns how many resumes actually advanced a queue.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        let channels: Vec<ChannelId> = self.channels.keys().copied().collect();
        for channel in channels {
            let due = self
                .channels
                .get_mut(&channel)
                .map(|c| c.take_due(now))
                .unwrap_or_default();
            for scheduled in due {
                let current = self.channels.get(&channel).map(|c| c.generation());
                if current != Some(scheduled.generation) {
                    self.tree.log(
                        LogCategory::Send,
                        LogLevel::Info,
                        None,
                        format!("stale resume dropped (generation {})", scheduled.generation),
                    );
                    continue;
                }
                self.advance(channel);
                fired += 1;
            }
        }
        fired
    }

    /// Wait for and fire scheduled resumes until none remain.
    pub async fn run_pending(&mut self) {
        let span = tracing::debug_span!("navstack.run_pending");
        async {
            while let Some(deadline) = self.next_deadline() {
                tokio::time::sleep_until(deadline).await;
                self.tick(Instant::now());
            }
        }
        .instrument(span)
        .await
    }

    fn channel_id(&self, node: NodeId, operation: &str) -> Option<ChannelId> {
        let channel = self.tree.channel_of(node);
        if channel.is_none() {
            self.tree.log(
                LogCategory::Send,
                LogLevel::Warning,
                Some(node),
                format!("{operation} ignored: stale node handle"),
            );
        }
        channel
    }

    fn apply(&mut self, channel: ChannelId, directive: ResumeDirective) -> bool {
        match directive {
            ResumeDirective::Immediately => {
                self.advance(channel);
                true
            }
            ResumeDirective::Auto => {
                let delay = self.config.auto_resume_delay;
                self.schedule(channel, delay)
            }
            ResumeDirective::After(delay) => self.schedule(channel, delay),
            ResumeDirective::Cancel => self.channels.get_mut(&channel).is_some_and(|c| c.cancel()),
            ResumeDirective::Pause => false,
        }
    }

    fn schedule(&mut self, channel: ChannelId, delay: Duration) -> bool {
        match self.channels.get_mut(&channel) {
            Some(chan) if chan.has_pending() => {
                chan.schedule(Instant::now() + delay);
                true
            }
            _ => false,
        }
    }

    /// Deliver the head of the queue, then follow the receivers' directive.
    fn advance(&mut self, channel: ChannelId) {
        loop {
            let Some(head) = self.channels.get_mut(&channel).and_then(|c| c.take_head()) else {
                return;
            };
            let directive = self.deliver(channel, Envelope::broadcast(head));
            if directive != ResumeDirective::Immediately {
                self.apply(channel, directive);
                return;
            }
        }
    }

    /// Hand `envelope` to every matching live subscriber.
    pub(crate) fn deliver(&mut self, channel: ChannelId, envelope: Envelope) -> ResumeDirective {
        self.reconcile_subscribers();
        let Some(chan) = self.channels.get_mut(&channel) else {
            return ResumeDirective::Pause;
        };
        let mut subscribers = std::mem::take(&mut chan.subscribers);
        let mut directives = Vec::new();
        for subscriber in subscribers.iter_mut() {
            if !subscriber.filter.matches(&envelope) || !self.tree.contains(subscriber.node) {
                continue;
            }
            let mut cx = ReceiveContext {
                tree: &mut self.tree,
                node: subscriber.node,
            };
            directives.push((subscriber.handler)(&envelope, &mut cx));
        }
        let receivers = directives.len();
        if let Some(chan) = self.channels.get_mut(&channel) {
            subscribers.append(&mut chan.subscribers);
            chan.subscribers = subscribers;
            if receivers > 0 {
                chan.record_delivery();
            }
        }
        // Handlers may have reshaped the tree or unwound checkpoints.
        self.reconcile_subscribers();
        let directive = ResumeDirective::combine(directives);
        self.tree.log(
            LogCategory::Send,
            if receivers == 0 { LogLevel::Warning } else { LogLevel::Info },
            None,
            format!(
                "delivered {:?} to {receivers} receiver(s), directive {directive:?}",
                envelope.payload
            ),
        );
        directive
    }
}

// ============================================================================
// Subscription bookkeeping
// ============================================================================

impl<D: Destination> Navigator<D> {
    /// Bring subscriptions in line with the tree.
    ///
    /// Subscribers of despawned nodes and of checkpoints that no longer
    /// carry their correlation id are dropped. Subscribers whose node moved
    /// to another tree follow it to that tree's channel. Channels no live
    /// root uses are dropped with their pending values.
    pub(crate) fn reconcile_subscribers(&mut self) {
        let mut moved = Vec::new();
        for (channel, chan) in self.channels.iter_mut() {
            let mut kept = Vec::with_capacity(chan.subscribers.len());
            for subscriber in chan.subscribers.drain(..) {
                match self.tree.channel_of(subscriber.node) {
                    Some(_) if !serves_live_checkpoint(&self.tree, &subscriber) => {}
                    Some(current) if current == *channel => kept.push(subscriber),
                    Some(current) => moved.push((current, subscriber)),
                    None => {}
                }
            }
            chan.subscribers = kept;
        }
        for (channel, subscriber) in moved {
            self.channels.entry(channel).or_default().subscribers.push(subscriber);
        }
        let live: Vec<ChannelId> = self
            .tree
            .roots()
            .into_iter()
            .filter_map(|root| self.tree.channel_of(root))
            .collect();
        self.channels.retain(|channel, _| live.contains(channel));
    }
}

fn serves_live_checkpoint<D: Destination>(tree: &NodeTree<D>, subscriber: &Subscriber<D>) -> bool {
    let (Some(name), Filter::Correlation(correlation_id)) =
        (subscriber.checkpoint.as_deref(), &subscriber.filter)
    else {
        return true;
    };
    tree.checkpoints(subscriber.node)
        .and_then(|registry| registry.get(name))
        .is_some_and(|c| c.correlation_id.as_deref() == Some(correlation_id.as_str()))
}

/// Mutable borrow of a [`Navigator`]'s tree.
///
/// Dropping it moves subscriptions after re-parenting and releases the
/// handlers of checkpoints that path changes removed.
pub struct TreeMut<'a, D: Destination> {
    nav: &'a mut Navigator<D>,
}

impl<D: Destination> Deref for TreeMut<'_, D> {
    type Target = NodeTree<D>;

    fn deref(&self) -> &NodeTree<D> {
        &self.nav.tree
    }
}

impl<D: Destination> DerefMut for TreeMut<'_, D> {
    fn deref_mut(&mut self) -> &mut NodeTree<D> {
        &mut self.nav.tree
    }
}

impl<D: Destination> Drop for TreeMut<'_, D> {
    fn drop(&mut self) {
        self.nav.reconcile_subscribers();
    }
}
