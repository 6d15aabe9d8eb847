//! Listener settings loaded once at construction
//!
//! ```json
//! {
//!   "name": "orders",
//!   "caller_capture": "symbolized",
//!   "match_mode": "case_insensitive",
//!   "console": { "enabled": true, "use_colors": false, "min_level": "warn" }
//! }
//! ```
//!
//! Every field is optional and falls back to its default.

use super::caller::CallerCapture;
use super::error::{LoggerError, Result};
use super::projector::MatchMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LISTENER_NAME: &str = "trace";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerSettings {
    /// Logger name carried by every event
    pub name: String,
    /// Defaults to `call_site`: events carry file and line, but the declaring
    /// path and method of the caller are only filled with `symbolized`
    pub caller_capture: CallerCapture,
    pub match_mode: MatchMode,
    pub console: ConsoleSettings,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_LISTENER_NAME.to_string(),
            caller_capture: CallerCapture::default(),
            match_mode: MatchMode::default(),
            console: ConsoleSettings::default(),
        }
    }
}

impl ListenerSettings {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let settings: ListenerSettings = serde_json::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading listener settings",
                path.display().to_string(),
                e,
            )
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::config("ListenerSettings", "name must not be empty"));
        }
        if self.console.min_level.trim().is_empty() {
            return Err(LoggerError::config(
                "ListenerSettings.console",
                "min_level must not be empty",
            ));
        }
        Ok(())
    }
}

/// Console backend block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleSettings {
    pub enabled: bool,
    pub use_colors: bool,
    /// Category name resolved through the severity registry
    pub min_level: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            use_colors: true,
            min_level: "all".to_string(),
        }
    }
}
