//! Structured logging for simulation debugging and monitoring.
//!
//! Hierarchical verbosity ladder mirroring the teacher library's
//! `VerboseLevel`, built on `tracing` with JSON output. Nothing logs by
//! default; a caller opts in with [`set_verbose_level`].
//!
//! ## Levels
//!
//! - `None` - no logging
//! - `Main` - step-level orchestration (spawn/actions/lane-change/...)
//! - `Additional` - per-phase summaries
//! - `Detailed` - per-vehicle decisions
//! - `All` - raw numeric traces

use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, trace, Level};
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Hierarchical logging level. Each level includes all lower levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum VerboseLevel {
    None = 0,
    Main = 1,
    Additional = 2,
    Detailed = 3,
    All = 4,
}

impl fmt::Display for VerboseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerboseLevel::None => "none",
            VerboseLevel::Main => "main",
            VerboseLevel::Additional => "additional",
            VerboseLevel::Detailed => "detailed",
            VerboseLevel::All => "all",
        };
        write!(f, "{}", s)
    }
}

impl From<VerboseLevel> for Level {
    fn from(level: VerboseLevel) -> Self {
        match level {
            VerboseLevel::None => Level::ERROR,
            VerboseLevel::Main => Level::INFO,
            VerboseLevel::Additional => Level::DEBUG,
            VerboseLevel::Detailed => Level::DEBUG,
            VerboseLevel::All => Level::TRACE,
        }
    }
}

// Event name constants for this domain's phases (spec §4.1 pipeline).
pub const EVENT_STEP: &str = "step";
pub const EVENT_SPAWN: &str = "spawn";
pub const EVENT_ACTIONS: &str = "actions";
pub const EVENT_FORMATION_STEP: &str = "formation_step";
pub const EVENT_JOIN_REQUESTED: &str = "join_requested";
pub const EVENT_JOIN_COMMITTED: &str = "join_committed";
pub const EVENT_JOIN_ABORTED: &str = "join_aborted";
pub const EVENT_LEAVE: &str = "leave";
pub const EVENT_LANE_CHANGE: &str = "lane_change";
pub const EVENT_CAR_FOLLOWING: &str = "car_following";
pub const EVENT_POSITION_UPDATE: &str = "position_update";
pub const EVENT_COLLISION: &str = "collision";
pub const EVENT_COMPLETION: &str = "completion";
pub const EVENT_SOLVER_TIMEOUT: &str = "solver_timeout";

static VERBOSE_LEVEL: OnceLock<VerboseLevel> = OnceLock::new();
static LOGGER_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Initialize the tracing subscriber once.
pub fn init_logger() {
    if LOGGER_INITIALIZED.set(true).is_ok() {
        tracing_subscriber::registry()
            .with(
                tracing_fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

/// Sets the global verbosity level and lazily initializes the subscriber.
pub fn set_verbose_level(level: VerboseLevel) {
    let _ = VERBOSE_LEVEL.set(level);
    init_logger();
}

/// Gets the current global verbosity level (`None` if never set).
pub fn get_verbose_level() -> VerboseLevel {
    *VERBOSE_LEVEL.get().unwrap_or(&VerboseLevel::None)
}

/// Checks whether the global level is at least `level`.
pub fn is_verbose_level(level: VerboseLevel) -> bool {
    get_verbose_level() >= level
}

/// Logs a message at the given level if the global level allows it.
pub fn verbose_log(level: VerboseLevel, event: &str, message: &str) {
    if !is_verbose_level(level) {
        return;
    }
    match level {
        VerboseLevel::None => {}
        VerboseLevel::Main => info!(event = event, message),
        VerboseLevel::Additional | VerboseLevel::Detailed => debug!(event = event, message),
        VerboseLevel::All => trace!(event = event, message),
    }
}

/// Global-level logging macro, analogous to the teacher's `log_main!`.
#[macro_export]
macro_rules! log_main {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::diagnostics::is_verbose_level($crate::diagnostics::VerboseLevel::Main) {
            tracing::info!(event = $event, $($key = $value,)* $msg);
        }
    };
}

/// Per-phase logging macro (`VerboseLevel::Additional`).
#[macro_export]
macro_rules! log_additional {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::diagnostics::is_verbose_level($crate::diagnostics::VerboseLevel::Additional) {
            tracing::debug!(event = $event, $($key = $value,)* $msg);
        }
    };
}

/// Per-vehicle logging macro (`VerboseLevel::Detailed`).
#[macro_export]
macro_rules! log_detailed {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::diagnostics::is_verbose_level($crate::diagnostics::VerboseLevel::Detailed) {
            tracing::debug!(event = $event, $($key = $value,)* $msg);
        }
    };
}

/// Raw-trace logging macro (`VerboseLevel::All`).
#[macro_export]
macro_rules! log_all {
    ($event:expr, $msg:literal, $($key:ident = $value:expr),* $(,)?) => {
        if $crate::diagnostics::is_verbose_level($crate::diagnostics::VerboseLevel::All) {
            tracing::trace!(event = $event, $($key = $value,)* $msg);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(VerboseLevel::All > VerboseLevel::Detailed);
        assert!(VerboseLevel::Detailed > VerboseLevel::Additional);
        assert!(VerboseLevel::Additional > VerboseLevel::Main);
        assert!(VerboseLevel::Main > VerboseLevel::None);
    }

    #[test]
    fn display_matches_lowercase_name() {
        assert_eq!(format!("{}", VerboseLevel::Detailed), "detailed");
    }
}
