//! # Broadcast Channel: Send, Pause, Resume
//!
//! One channel exists per rooted tree. A multi-value send publishes only its
//! first value and parks the tail in the pending queue. Whoever receives the
//! value decides, through a [`ResumeDirective`], when the next one goes out.
//!
//! ## Generations
//!
//! Every replacement of the pending queue bumps the channel's generation. A
//! timed resume remembers the generation it was scheduled under and is
//! discarded if the queue has been replaced since; it never drains a queue it
//! was not scheduled for.

use crate::message::{Envelope, Payload};
use navstack_core::{NodeId, NodeTree};
use std::any::TypeId;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// What a receiver wants to happen to the rest of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeDirective {
    /// Resume after the configured transition delay.
    Auto,
    /// Deliver the next value right now.
    Immediately,
    /// Resume after an explicit delay.
    After(Duration),
    /// Drop the remaining values.
    Cancel,
    /// Leave the queue pending until someone calls `resume`.
    #[default]
    Pause,
}

impl ResumeDirective {
    /// Combine the directives returned by every receiver of one value.
    ///
    /// `Cancel` wins over everything; otherwise the first non-`Pause`
    /// directive in registration order applies.
    pub fn combine<I: IntoIterator<Item = ResumeDirective>>(directives: I) -> ResumeDirective {
        let mut chosen = ResumeDirective::Pause;
        for directive in directives {
            match directive {
                ResumeDirective::Cancel => return ResumeDirective::Cancel,
                ResumeDirective::Pause => {}
                other if chosen == ResumeDirective::Pause => chosen = other,
                _ => {}
            }
        }
        chosen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Access handed to a receiver while it handles a value.
pub struct ReceiveContext<'a, D> {
    pub tree: &'a mut NodeTree<D>,
    pub node: NodeId,
}

impl<D> ReceiveContext<'_, D> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tree(&self) -> &NodeTree<D> {
        &*self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree<D> {
        &mut *self.tree
    }
}

pub(crate) type Handler<D> =
    Box<dyn FnMut(&Envelope, &mut ReceiveContext<'_, D>) -> ResumeDirective + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    /// Uncorrelated envelopes whose payload has this type.
    Type(TypeId),
    /// Envelopes addressed to this correlation id.
    Correlation(String),
}

impl Filter {
    pub(crate) fn matches(&self, envelope: &Envelope) -> bool {
        match (self, &envelope.consumed_by) {
            (Filter::Type(type_id), None) => envelope.payload.value_type_id() == *type_id,
            (Filter::Correlation(id), Some(target)) => id == target,
            _ => false,
        }
    }
}

pub(crate) struct Subscriber<D> {
    pub(crate) id: SubscriptionId,
    pub(crate) node: NodeId,
    pub(crate) filter: Filter,
    /// Name of the checkpoint a correlated subscriber serves.
    pub(crate) checkpoint: Option<String>,
    pub(crate) handler: Handler<D>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScheduledResume {
    pub(crate) due: Instant,
    pub(crate) generation: u64,
}

/// Per-tree publish/subscribe bus with a pending queue.
pub struct BroadcastChannel<D> {
    pub(crate) subscribers: Vec<Subscriber<D>>,
    pending: VecDeque<Payload>,
    generation: u64,
    scheduled: Vec<ScheduledResume>,
    delivered: u64,
}

impl<D> Default for BroadcastChannel<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for BroadcastChannel<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending)
            .field("generation", &self.generation)
            .field("scheduled", &self.scheduled.len())
            .finish()
    }
}

impl<D> BroadcastChannel<D> {
    pub fn new() -> Self {
        BroadcastChannel {
            subscribers: Vec::new(),
            pending: VecDeque::new(),
            generation: 0,
            scheduled: Vec::new(),
            delivered: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> impl Iterator<Item = &Payload> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total envelopes handed to at least one receiver.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Replace the pending queue, invalidating any scheduled resume.
    pub(crate) fn replace_pending(&mut self, values: impl IntoIterator<Item = Payload>) {
        self.pending = values.into_iter().collect();
        self.generation += 1;
    }

    /// Take the head of the queue; the tail becomes the new queue.
    pub(crate) fn take_head(&mut self) -> Option<Payload> {
        let head = self.pending.pop_front()?;
        self.generation += 1;
        Some(head)
    }

    /// Drop the queue. Returns whether anything was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        let had = !self.pending.is_empty();
        self.replace_pending(std::iter::empty());
        had
    }

    pub(crate) fn schedule(&mut self, due: Instant) {
        self.scheduled.push(ScheduledResume {
            due,
            generation: self.generation,
        });
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|s| s.due).min()
    }

    /// Remove and return the scheduled resumes due at `now`, earliest first.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<ScheduledResume> {
        let mut due: Vec<ScheduledResume> = Vec::new();
        self.scheduled.retain(|s| {
            if s.due <= now {
                due.push(*s);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|s| s.due);
        due
    }

    pub(crate) fn record_delivery(&mut self) {
        self.delivered += 1;
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }
}
