//! Checkpoint-value correlation.
//!
//! A value-bearing checkpoint binds a value type and a correlation id to a
//! named checkpoint and subscribes a handler for envelopes addressed to that
//! id. Returning with a value publishes a correlated envelope; the handler at
//! the owning node runs the completion and then unwinds to the checkpoint.

use crate::channel::{Filter, Handler, ReceiveContext, ResumeDirective};
use crate::message::{Envelope, Message, Payload};
use crate::navigator::Navigator;
use navstack_core::{Destination, LogCategory, LogLevel, NodeId};
use uuid::Uuid;

impl<D: Destination> Navigator<D> {
    /// Register `name` at `node` and receive values returned to it.
    ///
    /// Registering again for the same node and name re-binds the checkpoint
    /// to a fresh correlation id and replaces the previous completion. The
    /// checkpoint index is never moved. The handler is released once path
    /// changes remove the checkpoint.
    pub fn add_checkpoint_with_value<T, F>(
        &mut self,
        node: NodeId,
        name: &str,
        mut completion: F,
    ) -> bool
    where
        T: Message,
        F: FnMut(&T) + Send + 'static,
    {
        let correlation_id = Uuid::new_v4().to_string();
        if !self
            .tree
            .bind_checkpoint_value(node, name, std::any::type_name::<T>(), &correlation_id)
        {
            return false;
        }
        let checkpoint = name.to_string();
        let handler: Handler<D> = Box::new(
            move |envelope: &Envelope, cx: &mut ReceiveContext<'_, D>| {
                let owner = cx.node();
                let Some(value) = envelope.payload.downcast_ref::<T>() else {
                    return ResumeDirective::Pause;
                };
                completion(value);
                let index = cx
                    .tree()
                    .checkpoints(owner)
                    .and_then(|registry| registry.get(&checkpoint))
                    .map(|c| c.index);
                match index {
                    Some(index) => {
                        cx.tree_mut().unwind_to(owner, index);
                    }
                    None => cx.tree().log(
                        LogCategory::Checkpoint,
                        LogLevel::Warning,
                        Some(owner),
                        format!("checkpoint `{checkpoint}` vanished before its value arrived"),
                    ),
                }
                ResumeDirective::Pause
            },
        );
        self.subscribe(
            node,
            Filter::Correlation(correlation_id),
            Some(name.to_string()),
            handler,
        )
        .is_some()
    }

    /// Return to the nearest checkpoint `name`, handing it `value`.
    ///
    /// Returns `false` when the checkpoint is missing, carries no value
    /// binding, or expects a different type. The pending queue is left
    /// untouched.
    pub fn return_to_checkpoint_with_value<T: Message>(
        &mut self,
        node: NodeId,
        name: &str,
        value: T,
    ) -> bool {
        let Some((owner, checkpoint)) = self.tree.resolve_checkpoint(node, name) else {
            self.tree.log(
                LogCategory::Checkpoint,
                LogLevel::Warning,
                Some(node),
                format!("checkpoint `{name}` not found"),
            );
            return false;
        };
        let expected = std::any::type_name::<T>();
        let (Some(correlation_id), Some(value_type)) =
            (checkpoint.correlation_id, checkpoint.value_type)
        else {
            self.tree.log(
                LogCategory::Checkpoint,
                LogLevel::Warning,
                Some(owner),
                format!("checkpoint `{name}` does not expect a value"),
            );
            return false;
        };
        if value_type != expected {
            self.tree.log(
                LogCategory::Checkpoint,
                LogLevel::Warning,
                Some(owner),
                format!("checkpoint `{name}` expects {value_type}, got {expected}"),
            );
            return false;
        }
        let Some(channel) = self.tree.channel_of(owner) else {
            return false;
        };
        self.tree.log(
            LogCategory::Checkpoint,
            LogLevel::Info,
            Some(owner),
            format!("returning to `{name}` with {value:?}"),
        );
        let before = self.channels.get(&channel).map_or(0, |c| c.delivered());
        self.deliver(channel, Envelope::correlated(Payload::new(value), correlation_id));
        self.channels
            .get(&channel)
            .is_some_and(|c| c.delivered() > before)
    }
}
