//! # Snapshot: Encode / Decode Node State
//!
//! A snapshot is a JSON document holding one node's path, checkpoints and
//! modal slots. Every path entry is stored next to its destination type tag
//! so that a decode against a different destination type is rejected rather
//! than misread.
//!
//! Encoding fails closed: if any entry cannot be persisted, no bytes are
//! produced. Decoding never fails outward: a malformed snapshot, a version
//! or tag mismatch, or a restoration key mismatch all yield the default empty
//! [`RestoredState`].

use chrono::{DateTime, Utc};
use navstack_core::{
    Checkpoint, Destination, LogCategory, LogLevel, NavigationError, NavigationResult, NodeId,
    NodeKey, NodeTree,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TaggedEntry {
    #[serde(rename = "type")]
    type_tag: String,
    value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NodeSnapshot {
    format_version: u32,
    restoration_key: String,
    captured_at: DateTime<Utc>,
    id: NodeKey,
    name: Option<String>,
    path: Vec<TaggedEntry>,
    checkpoints: Vec<Checkpoint>,
    is_presented: bool,
    sheet: Option<TaggedEntry>,
    cover: Option<TaggedEntry>,
}

/// Node state recovered from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState<D> {
    pub key: Option<NodeKey>,
    pub name: Option<String>,
    pub path: Vec<D>,
    pub checkpoints: Vec<Checkpoint>,
    pub is_presented: bool,
    pub sheet: Option<D>,
    pub cover: Option<D>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl<D> Default for RestoredState<D> {
    fn default() -> Self {
        RestoredState {
            key: None,
            name: None,
            path: Vec::new(),
            checkpoints: Vec::new(),
            is_presented: false,
            sheet: None,
            cover: None,
            captured_at: None,
        }
    }
}

impl<D: Destination> RestoredState<D> {
    /// True for the state produced by a failed decode.
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
            && self.path.is_empty()
            && self.checkpoints.is_empty()
            && self.sheet.is_none()
            && self.cover.is_none()
    }

    /// Write the restored state onto a live node.
    pub fn apply(self, tree: &mut NodeTree<D>, node: NodeId) -> bool {
        let presented = self.is_presented;
        tree.restore_state(
            node,
            self.key,
            self.path,
            self.checkpoints,
            self.sheet,
            self.cover,
        ) && tree.set_presented(node, presented)
    }
}

fn encode_entry<D: Destination + Serialize>(destination: &D) -> NavigationResult<TaggedEntry> {
    if !destination.is_persistable() {
        return Err(NavigationError::EncodeFailure(format!(
            "{} {destination:?} is not persistable",
            destination.type_tag()
        )));
    }
    let value = serde_json::to_value(destination)
        .map_err(|e| NavigationError::EncodeFailure(format!("{destination:?}: {e}")))?;
    Ok(TaggedEntry {
        type_tag: destination.type_tag().to_string(),
        value,
    })
}

fn decode_entry<D: Destination + DeserializeOwned>(entry: TaggedEntry) -> NavigationResult<D> {
    let destination: D = serde_json::from_value(entry.value)
        .map_err(|e| NavigationError::DecodeFailure(e.to_string()))?;
    if destination.type_tag() != entry.type_tag {
        return Err(NavigationError::DecodeFailure(format!(
            "type tag `{}` does not match `{}`",
            entry.type_tag,
            destination.type_tag()
        )));
    }
    Ok(destination)
}

/// Capture `node` as snapshot bytes bound to `restoration_key`.
pub fn encode<D>(
    tree: &NodeTree<D>,
    node: NodeId,
    restoration_key: &str,
) -> NavigationResult<Vec<u8>>
where
    D: Destination + Serialize,
{
    let state = tree.get(node).ok_or(NavigationError::StaleNode)?;
    let snapshot = NodeSnapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        restoration_key: restoration_key.to_string(),
        captured_at: Utc::now(),
        id: state.key,
        name: state.name.clone(),
        path: state
            .path
            .iter()
            .map(encode_entry)
            .collect::<NavigationResult<Vec<_>>>()?,
        checkpoints: state.checkpoints.iter().cloned().collect(),
        is_presented: state.is_presented,
        sheet: state.sheet.as_ref().map(encode_entry).transpose()?,
        cover: state.cover.as_ref().map(encode_entry).transpose()?,
    };
    let bytes = serde_json::to_vec(&snapshot)
        .map_err(|e| NavigationError::EncodeFailure(e.to_string()))?;
    tree.log(
        LogCategory::Lifecycle,
        LogLevel::Info,
        Some(node),
        format!("encoded {} path entries ({} bytes)", snapshot.path.len(), bytes.len()),
    );
    Ok(bytes)
}

/// Decode a snapshot, reporting why it was rejected.
pub fn try_decode<D>(bytes: &[u8], restoration_key: &str) -> NavigationResult<RestoredState<D>>
where
    D: Destination + DeserializeOwned,
{
    let snapshot: NodeSnapshot =
        serde_json::from_slice(bytes).map_err(|e| NavigationError::DecodeFailure(e.to_string()))?;
    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(NavigationError::DecodeFailure(format!(
            "unsupported format version {}",
            snapshot.format_version
        )));
    }
    if snapshot.restoration_key != restoration_key {
        return Err(NavigationError::DecodeFailure(
            "restoration key mismatch".to_string(),
        ));
    }
    let path = snapshot
        .path
        .into_iter()
        .map(decode_entry)
        .collect::<NavigationResult<Vec<D>>>()?;
    Ok(RestoredState {
        key: Some(snapshot.id),
        name: snapshot.name,
        checkpoints: snapshot
            .checkpoints
            .into_iter()
            .filter(|c| c.index <= path.len())
            .collect(),
        path,
        is_presented: snapshot.is_presented,
        sheet: snapshot.sheet.map(decode_entry).transpose()?,
        cover: snapshot.cover.map(decode_entry).transpose()?,
        captured_at: Some(snapshot.captured_at),
    })
}

/// Decode a snapshot, falling back to the empty state on any failure.
pub fn decode<D>(bytes: &[u8], restoration_key: &str) -> RestoredState<D>
where
    D: Destination + DeserializeOwned,
{
    match try_decode(bytes, restoration_key) {
        Ok(state) => state,
        Err(error) => {
            tracing::warn!(target: "navstack", { navstack.category = "lifecycle" }, "{error}");
            RestoredState::default()
        }
    }
}
