//! # Destination: Where To Go, And How
//!
//! A destination is a plain value. Two destinations that compare equal are
//! the same destination, regardless of where they were constructed. This is
//! what lets a modal slot refuse a duplicate presentation.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Fixed seeds so identities are stable for the lifetime of the process.
const IDENTITY_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// How a destination is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PresentationMethod {
    /// Appended to the node's path.
    #[default]
    Push,
    /// Placed in the node's sheet slot.
    Sheet,
    /// Placed in the node's full-screen cover slot.
    Cover,
    /// Never touches the tree; delivered on the broadcast channel only.
    BroadcastOnly,
}

impl PresentationMethod {
    pub fn is_modal(&self) -> bool {
        matches!(self, PresentationMethod::Sheet | PresentationMethod::Cover)
    }

    pub fn modal_kind(&self) -> Option<ModalKind> {
        match self {
            PresentationMethod::Sheet => Some(ModalKind::Sheet),
            PresentationMethod::Cover => Some(ModalKind::Cover),
            _ => None,
        }
    }
}

/// The modal slot through which a child node was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModalKind {
    Sheet,
    Cover,
}

impl From<ModalKind> for PresentationMethod {
    fn from(kind: ModalKind) -> Self {
        match kind {
            ModalKind::Sheet => PresentationMethod::Sheet,
            ModalKind::Cover => PresentationMethod::Cover,
        }
    }
}

/// Value-derived identity of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationIdentity(pub u64);

impl DestinationIdentity {
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let state = ahash::RandomState::with_seeds(
            IDENTITY_SEEDS[0],
            IDENTITY_SEEDS[1],
            IDENTITY_SEEDS[2],
            IDENTITY_SEEDS[3],
        );
        DestinationIdentity(state.hash_one(value))
    }
}

impl std::fmt::Display for DestinationIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The contract every destination type fulfils.
///
/// Most applications implement this for a single `enum` listing every screen
/// they can show. Only `method` usually needs overriding.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// enum Screen {
///     Home,
///     Settings,
///     Login,
/// }
///
/// impl Destination for Screen {
///     fn method(&self) -> PresentationMethod {
///         match self {
///             Screen::Login => PresentationMethod::Cover,
///             _ => PresentationMethod::Push,
///         }
///     }
/// }
/// ```
pub trait Destination: Clone + PartialEq + Eq + Hash + Debug + Send + Sync + 'static {
    /// Presentation used by `navigate` when no explicit method is given.
    fn method(&self) -> PresentationMethod {
        PresentationMethod::Push
    }

    fn identity(&self) -> DestinationIdentity {
        DestinationIdentity::of(self)
    }

    /// Tag written next to each encoded entry in a snapshot.
    fn type_tag(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Whether this particular value may be written to a snapshot.
    ///
    /// Variants carrying transient data (open file handles, one-shot tokens)
    /// return `false`, which makes the whole snapshot fail to encode.
    fn is_persistable(&self) -> bool {
        true
    }
}

/// Extract the final path segment of a type name.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
