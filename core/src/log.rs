//! # Log: The Logging Collaborator
//!
//! The engine reports what it does as [`LogEvent`]s. A [`NavigationLogger`]
//! decides what to do with them. The default [`TracingLogger`] forwards to
//! `tracing`, so the host application's subscriber controls output.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What part of the engine produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Lifecycle,
    Navigation,
    Checkpoint,
    Send,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Lifecycle => "lifecycle",
            LogCategory::Navigation => "navigation",
            LogCategory::Checkpoint => "checkpoint",
            LogCategory::Send => "send",
        }
    }
}

/// Verbosity threshold. `None` silences everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
    None,
}

impl LogLevel {
    /// Whether an event at `level` passes a `self` threshold.
    pub fn allows(&self, level: LogLevel) -> bool {
        level != LogLevel::None && *self != LogLevel::None && level >= *self
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub category: LogCategory,
    pub level: LogLevel,
    pub node: Option<NodeId>,
    pub message: String,
}

impl LogEvent {
    pub fn new(category: LogCategory, level: LogLevel, message: impl Into<String>) -> Self {
        LogEvent {
            category,
            level,
            node: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "[{}] {} {}", self.category.as_str(), node, self.message),
            None => write!(f, "[{}] {}", self.category.as_str(), self.message),
        }
    }
}

/// Receives structured engine events. Implementations must not panic or block.
pub trait NavigationLogger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Forwards events to `tracing` when they pass the verbosity threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    verbosity: LogLevel,
}

impl TracingLogger {
    pub fn new(verbosity: LogLevel) -> Self {
        TracingLogger { verbosity }
    }

    pub fn verbosity(&self) -> LogLevel {
        self.verbosity
    }
}

impl NavigationLogger for TracingLogger {
    fn log(&self, event: &LogEvent) {
        if !self.verbosity.allows(event.level) {
            return;
        }
        let node = event.node.map(|n| n.to_string()).unwrap_or_default();
        let category = event.category.as_str();
        match event.level {
            LogLevel::Info => {
                tracing::info!(
                    target: "navstack",
                    { navstack.category = category, navstack.node = %node },
                    "{}",
                    event.message
                )
            }
            LogLevel::Warning => {
                tracing::warn!(
                    target: "navstack",
                    { navstack.category = category, navstack.node = %node },
                    "{}",
                    event.message
                )
            }
            LogLevel::Error => {
                tracing::error!(
                    target: "navstack",
                    { navstack.category = category, navstack.node = %node },
                    "{}",
                    event.message
                )
            }
            LogLevel::None => {}
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl NavigationLogger for NullLogger {
    fn log(&self, _event: &LogEvent) {}
}
