//! Bridge configuration resolved from code or environment variables.
//!
//! | variable | values | effect |
//! |---|---|---|
//! | `OXBRIDGE_LOG` | `error`, `warn`, `info`, `debug`, `trace` | global log level |
//! | `OXBRIDGE_ON_FAULT` | `abort`, `panic` | [`FaultAction`] |
//!
//! Unset variables keep the defaults; unparsable values are reported at
//! `warn` and ignored.

use crate::fault::{self, FaultAction};
use oxidex_log::{Level, warn};
use std::env;

/// Environment variable holding the log level.
pub const LOG_ENV: &str = "OXBRIDGE_LOG";

/// Environment variable holding the fault action.
pub const FAULT_ENV: &str = "OXBRIDGE_ON_FAULT";

/// Process-wide bridge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeConfig {
    /// Log level to install; `None` leaves the logger untouched.
    pub log_level: Option<Level>,

    /// What a [`BridgeFault`](crate::BridgeFault) does after being reported.
    pub fault_action: FaultAction,
}

impl BridgeConfig {
    /// Default configuration: logger untouched, faults abort.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Sets the fault action.
    #[must_use]
    pub fn with_fault_action(mut self, action: FaultAction) -> Self {
        self.fault_action = action;
        self
    }

    /// Reads [`LOG_ENV`] and [`FAULT_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(LOG_ENV) {
            match value.parse::<Level>() {
                Ok(level) => config.log_level = Some(level),
                Err(err) => warn!("ignoring {}: {}", LOG_ENV, err),
            }
        }

        if let Some(value) = lookup(FAULT_ENV) {
            match value.parse::<FaultAction>() {
                Ok(action) => config.fault_action = action,
                Err(err) => warn!("ignoring {}: {}", FAULT_ENV, err),
            }
        }

        config
    }

    /// Installs the settings process-wide.
    pub fn apply(&self) {
        if let Some(level) = self.log_level {
            oxidex_log::set_level(level);
        }
        fault::set_fault_action(self.fault_action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.fault_action, FaultAction::Abort);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_reads_both_variables() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (LOG_ENV, "debug"),
            (FAULT_ENV, "panic"),
        ]));
        assert_eq!(config.log_level, Some(Level::Debug));
        assert_eq!(config.fault_action, FaultAction::Panic);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (LOG_ENV, "loud"),
            (FAULT_ENV, "explode"),
        ]));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = BridgeConfig::new()
            .with_log_level(Level::Trace)
            .with_fault_action(FaultAction::Panic);
        assert_eq!(config.log_level, Some(Level::Trace));
        assert_eq!(config.fault_action, FaultAction::Panic);
    }
}
