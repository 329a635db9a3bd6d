//! A minimal, zero-dependency logging crate for the `OxideX` workspace.
//!
//! Every crate in the workspace logs through the macros exported here. Each
//! record carries the module path it was emitted from, so the bridge's class
//! setup, binding and dispatch traffic can be told apart at a glance:
//!
//! ```text
//! [DEBUG] oxbridge::bridge: added -[Widget doThing:] as i@:i
//! [TRACE] oxbridge::trampoline: dispatch -[Widget doThing:]
//! ```
//!
//! Output goes to stderr so it never interleaves with a host program's own
//! stdout protocol.
//!
//! # Example
//!
//! ```
//! use oxidex_log::{error, warn, info, debug, Level};
//!
//! oxidex_log::set_level(Level::Debug);
//!
//! let class = "Widget";
//! info!("defined class {}", class);
//! debug!("method table: {:?}", ["doThing:"]);
//! warn!("class {} redefined", class);
//! error!("unrecoverable bridge fault");
//! ```
//!
//! # Configuration
//!
//! The level can be taken from the environment with [`init_from_env`]:
//!
//! ```
//! // OXBRIDGE_LOG=trace ./app
//! let level = oxidex_log::init_from_env("OXBRIDGE_LOG");
//! assert!(level <= oxidex_log::Level::Trace);
//! ```

use std::fmt;
use std::fmt::Arguments;
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log levels representing the severity of a record.
///
/// Ordered from most severe (`Error`) to least severe (`Trace`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Unrecoverable failures (bridge faults).
    Error = 0,
    /// Suspicious but tolerated situations (class redefinition).
    Warn = 1,
    /// Setup milestones (class defined, class registered).
    Info = 2,
    /// Per-method and per-instance detail.
    Debug = 3,
    /// Per-message detail.
    Trace = 4,
}

const NAMES: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

// red, yellow, green, cyan, magenta
const COLORS: [&str; 5] = ["\x1b[31m", "\x1b[33m", "\x1b[32m", "\x1b[36m", "\x1b[35m"];

const ALL: [Level; 5] = [
    Level::Error,
    Level::Warn,
    Level::Info,
    Level::Debug,
    Level::Trace,
];

impl Level {
    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        NAMES[self as usize]
    }

    const fn color_code(self) -> &'static str {
        COLORS[self as usize]
    }

    const fn from_u8(raw: u8) -> Self {
        if (raw as usize) < ALL.len() {
            ALL[raw as usize]
        } else {
            Level::Trace
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a log level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError {
    input: String,
}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid log level: {}", self.input)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, case-insensitively.
    ///
    /// ```
    /// use oxidex_log::Level;
    ///
    /// assert_eq!("error".parse::<Level>(), Ok(Level::Error));
    /// assert_eq!("INFO".parse::<Level>(), Ok(Level::Info));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let wanted = if wanted.eq_ignore_ascii_case("warning") {
            "WARN"
        } else {
            wanted
        };
        ALL.into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseLevelError {
                input: s.to_string(),
            })
    }
}

/// The global logger.
///
/// Level and colour settings are atomics, so any thread may log or
/// reconfigure without locking.
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level, color: bool) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(color),
        }
    }

    /// Sets the minimum level that will be written.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Enables or disables ANSI colours.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Checks if a record at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    fn format(&self, level: Level, target: &str, args: Arguments) -> String {
        if self.color.load(Ordering::Relaxed) {
            format!("{}[{level}]\x1b[0m {target}: {args}", level.color_code())
        } else {
            format!("[{level}] {target}: {args}")
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at `Level::Warn` on first use.
///
/// Colours are on unless `NO_COLOR` is set.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn, std::env::var_os("NO_COLOR").is_none()))
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum level of the global logger from a level name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if `s` is not a level name; the current
/// level is left untouched.
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Reads the level from the environment variable `var`.
///
/// An unset or unparsable variable leaves the current level in place. The
/// level in effect afterwards is returned.
pub fn init_from_env(var: &str) -> Level {
    if let Ok(value) = std::env::var(var) {
        if set_level_from_str(&value).is_err() {
            __log_with_target(
                Level::Warn,
                module_path!(),
                format_args!("ignoring {var}={value:?}: not a log level"),
            );
        }
    }
    get_logger().level()
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    let logger = get_logger();
    if !logger.enabled(level) {
        return;
    }

    let line = logger.format(level, target, args);
    let _ = writeln!(std::io::stderr().lock(), "{line}");
}

/// Logs a record at an explicit level.
///
/// ```
/// use oxidex_log::{log, Level};
///
/// log!(level: Level::Info, "answer: {}", 42);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level: $crate::Level = $level;
        if $crate::get_logger().enabled(level) {
            $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`]. Reserved for unrecoverable faults.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`]. Hot paths such as message dispatch log here, so
/// the level check happens before any formatting.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
