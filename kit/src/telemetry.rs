//! Stdout tracing for applications embedding navstack.

use navstack_core::LogLevel;
use tracing_subscriber::EnvFilter;

/// Install a stdout `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter follows `level`. Does
/// nothing if a global subscriber is already installed.
pub fn init_stdout_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn default_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(directive(level))
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "warn,navstack=info",
        LogLevel::Warning => "warn",
        LogLevel::Error => "error",
        LogLevel::None => "off",
    }
}
