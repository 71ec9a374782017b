use thiserror::Error;

pub type NavigationResult<T> = Result<T, NavigationError>;

/// Failures surfaced by the navigation engine.
///
/// Only structural failures reach callers as `Err`. "Nothing to do"
/// conditions (empty pops, missing checkpoints, duplicate presentation) are
/// reported through boolean results instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("navigation is locked")]
    NavigationLocked,
    #[error("checkpoint `{0}` not found")]
    CheckpointNotFound(String),
    #[error("snapshot could not be decoded: {0}")]
    DecodeFailure(String),
    #[error("snapshot could not be encoded: {0}")]
    EncodeFailure(String),
    #[error("node handle is stale")]
    StaleNode,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
}
