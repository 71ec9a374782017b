//! Message - Type-Erased Broadcast Payloads
//!
//! Anything comparable can travel on a broadcast channel. Subscribers select
//! what they receive by concrete type, the same way a type-map is keyed by
//! `TypeId`: no string keys, and the typed API hides the downcast.

use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A value that can be broadcast.
///
/// Implemented for every `Any + Debug + PartialEq + Send + Sync` type.
pub trait Message: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Equality across the erased boundary; values of different types are
    /// never equal.
    fn dyn_eq(&self, other: &dyn Message) -> bool;

    fn message_type_name(&self) -> &'static str;
}

impl<T> Message for T
where
    T: Any + Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Message) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn message_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A shared, type-erased broadcast value.
#[derive(Clone)]
pub struct Payload(Arc<dyn Message>);

impl Payload {
    pub fn new<T: Message>(value: T) -> Self {
        Payload(Arc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.value_type_id() == TypeId::of::<T>()
    }

    pub fn value_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.0.message_type_name()
    }

    pub fn same_as(&self, other: &Payload) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl<T: Message> From<T> for Payload {
    fn from(value: T) -> Self {
        Payload::new(value)
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

/// What actually travels on the channel.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub payload: Payload,
    /// Set for values addressed to one checkpoint handler.
    pub consumed_by: Option<String>,
}

impl Envelope {
    pub fn broadcast(payload: Payload) -> Self {
        Envelope {
            payload,
            consumed_by: None,
        }
    }

    pub fn correlated(payload: Payload, correlation_id: impl Into<String>) -> Self {
        Envelope {
            payload,
            consumed_by: Some(correlation_id.into()),
        }
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.consumed_by == other.consumed_by && self.payload.same_as(&other.payload)
    }
}
