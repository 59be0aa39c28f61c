//! Log level handling and tracing subscriber setup.
//!
//! Levels follow the provider's numeric scale, 1 (TRACE) through 5 (ERROR).
//! `RUST_LOG`, when set, overrides the configured level.

use std::fmt;

use tracing_subscriber::EnvFilter;

/// Provider log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace = 1,
    Debug = 2,
    Info = 3,
    #[default]
    Warn = 4,
    Error = 5,
}

impl LogLevel {
    /// Map the numeric configuration value.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Trace),
            2 => Some(Self::Debug),
            3 => Some(Self::Info),
            4 => Some(Self::Warn),
            5 => Some(Self::Error),
            _ => None,
        }
    }

    /// Filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_filter().to_ascii_uppercase())
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
