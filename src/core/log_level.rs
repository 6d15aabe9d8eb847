//! Severity level definitions
//!
//! A [`Level`] is an integer rank plus a symbolic name. The built-in table
//! below is fixed; further levels are created by the
//! [`SeverityRegistry`](super::SeverityRegistry).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub const OFF_RANK: i32 = i32::MAX;
pub const EMERGENCY_RANK: i32 = 120_000;
pub const FATAL_RANK: i32 = 110_000;
pub const ALERT_RANK: i32 = 100_000;
pub const CRITICAL_RANK: i32 = 90_000;
pub const SEVERE_RANK: i32 = 80_000;
pub const ERROR_RANK: i32 = 70_000;
pub const WARN_RANK: i32 = 60_000;
pub const NOTICE_RANK: i32 = 50_000;
pub const INFO_RANK: i32 = 40_000;
pub const DEBUG_RANK: i32 = 30_000;
pub const TRACE_RANK: i32 = 20_000;
pub const VERBOSE_RANK: i32 = 10_000;
pub const ALL_RANK: i32 = i32::MIN;

/// Rank given to categories nobody registered
pub const UNKNOWN_RANK: i32 = VERBOSE_RANK - 1;

/// Built-in category names (lowercase) and the symbolic name and rank they map to
pub(crate) const BUILTIN_LEVELS: &[(&str, &str, i32)] = &[
    ("off", "OFF", OFF_RANK),
    ("debug-diagnostic", "DEBUG-DIAGNOSTIC", EMERGENCY_RANK),
    ("emergency", "EMERGENCY", EMERGENCY_RANK),
    ("fatal", "FATAL", FATAL_RANK),
    ("alert", "ALERT", ALERT_RANK),
    ("critical", "CRITICAL", CRITICAL_RANK),
    ("severe", "SEVERE", SEVERE_RANK),
    ("error", "ERROR", ERROR_RANK),
    ("warn", "WARN", WARN_RANK),
    ("notice", "NOTICE", NOTICE_RANK),
    ("info", "INFO", INFO_RANK),
    ("debug", "DEBUG", DEBUG_RANK),
    ("fine", "FINE", DEBUG_RANK),
    ("finer", "FINER", TRACE_RANK),
    ("trace", "TRACE", TRACE_RANK),
    ("finest", "FINEST", VERBOSE_RANK),
    ("verbose", "VERBOSE", VERBOSE_RANK),
    ("all", "ALL", ALL_RANK),
];

pub(crate) fn is_builtin(key: &str) -> bool {
    BUILTIN_LEVELS.iter().any(|(k, _, _)| *k == key)
}

/// A severity level: numeric rank, symbolic name and optional display name
///
/// Levels compare by rank first, then by name, so two levels sharing a rank
/// (`debug` and `fine`) are still distinct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    rank: i32,
    name: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<Arc<str>>,
}

impl Level {
    pub fn new(rank: i32, name: impl Into<Arc<str>>) -> Self {
        Self {
            rank,
            name: name.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<Arc<str>>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[inline]
    pub fn rank(&self) -> i32 {
        self.rank
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// True for the "never log" sentinel
    #[inline]
    pub fn is_off(&self) -> bool {
        self.rank == OFF_RANK
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.name == other.name
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
