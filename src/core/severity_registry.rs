//! Category name to severity level resolution
//!
//! The registry is append-only. Unknown names are materialised on first use
//! with a check / lock / check-again sequence so concurrent first lookups of
//! the same name all receive one shared [`Level`] instance.

use super::error::{LoggerError, Result};
use super::log_level::{self, Level, BUILTIN_LEVELS, UNKNOWN_RANK};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_REGISTRY: OnceLock<Arc<SeverityRegistry>> = OnceLock::new();

/// Thread-safe map from lowercase category name to [`Level`]
///
/// # Example
///
/// ```
/// use trace_bridge::SeverityRegistry;
/// use std::sync::Arc;
///
/// let registry = SeverityRegistry::new();
/// assert_eq!(registry.resolve("Warn").rank(), 60_000);
///
/// let first = registry.resolve("audit");
/// let second = registry.resolve("AUDIT");
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug)]
pub struct SeverityRegistry {
    levels: RwLock<HashMap<String, Arc<Level>>>,
    info: Arc<Level>,
    off: Arc<Level>,
    /// Number of levels created for unknown names
    created: AtomicU64,
}

impl SeverityRegistry {
    /// Create a registry holding only the built-in levels
    pub fn new() -> Self {
        let mut levels = HashMap::with_capacity(BUILTIN_LEVELS.len());
        for (key, name, rank) in BUILTIN_LEVELS {
            levels.insert((*key).to_string(), Arc::new(Level::new(*rank, *name)));
        }

        let info = Arc::clone(&levels["info"]);
        let off = Arc::clone(&levels["off"]);

        Self {
            levels: RwLock::new(levels),
            info,
            off,
            created: AtomicU64::new(0),
        }
    }

    /// The process-wide registry, created on first use
    pub fn global() -> Arc<SeverityRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(SeverityRegistry::new())))
    }

    /// Resolve a free-form category to a level, creating it when unseen
    ///
    /// Matching is case-insensitive. An unseen name becomes a new level
    /// ranked just below `verbose`, and every later call for that name
    /// returns the same `Arc`.
    pub fn resolve(&self, category: &str) -> Arc<Level> {
        let key = category.to_lowercase();

        if let Some(level) = self.levels.read().get(&key) {
            return Arc::clone(level);
        }

        let mut levels = self.levels.write();
        let level = levels.entry(key).or_insert_with_key(|key| {
            self.created.fetch_add(1, Ordering::Relaxed);
            Arc::new(Level::new(UNKNOWN_RANK, key.as_str()))
        });
        Arc::clone(level)
    }

    /// Register a custom level, replacing any custom level of the same name
    ///
    /// Built-in names cannot be redefined.
    pub fn add_level(
        &self,
        rank: i32,
        name: &str,
        display_name: Option<&str>,
    ) -> Result<Arc<Level>> {
        let key = name.to_lowercase();
        if key.is_empty() {
            return Err(LoggerError::config("SeverityRegistry", "level name is empty"));
        }
        if log_level::is_builtin(&key) {
            return Err(LoggerError::reserved_level(key));
        }

        let mut level = Level::new(rank, name);
        if let Some(display_name) = display_name {
            level = level.with_display_name(display_name);
        }
        let level = Arc::new(level);

        self.levels.write().insert(key, Arc::clone(&level));
        Ok(level)
    }

    /// Look up a level without creating it
    pub fn get(&self, category: &str) -> Option<Arc<Level>> {
        self.levels.read().get(&category.to_lowercase()).cloned()
    }

    /// Level used when a write carries no category
    #[inline]
    pub fn info(&self) -> Arc<Level> {
        Arc::clone(&self.info)
    }

    #[inline]
    pub fn off(&self) -> Arc<Level> {
        Arc::clone(&self.off)
    }

    /// Number of registered names, built-ins included
    pub fn len(&self) -> usize {
        self.levels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }

    /// Number of levels created on demand for unknown categories
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}

impl Default for SeverityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::*;

    #[test]
    fn test_builtin_ranks() {
        let registry = SeverityRegistry::new();
        let expected = [
            ("off", OFF_RANK),
            ("emergency", 120_000),
            ("debug-diagnostic", 120_000),
            ("fatal", 110_000),
            ("alert", 100_000),
            ("critical", 90_000),
            ("severe", 80_000),
            ("error", 70_000),
            ("warn", 60_000),
            ("notice", 50_000),
            ("info", 40_000),
            ("debug", 30_000),
            ("fine", 30_000),
            ("finer", 20_000),
            ("trace", 20_000),
            ("finest", 10_000),
            ("verbose", 10_000),
            ("all", ALL_RANK),
        ];

        for (name, rank) in expected {
            assert_eq!(registry.resolve(name).rank(), rank, "rank of {}", name);
        }
        assert_eq!(registry.created_count(), 0);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = SeverityRegistry::new();
        assert!(Arc::ptr_eq(&registry.resolve("ERROR"), &registry.resolve("error")));
        assert!(Arc::ptr_eq(&registry.resolve("Info"), &registry.info()));
        assert!(registry.resolve("OFF").is_off());
    }

    #[test]
    fn test_unknown_category_is_created_once() {
        let registry = SeverityRegistry::new();
        let before = registry.len();

        let first = registry.resolve("Audit");
        let second = registry.resolve("audit");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rank(), UNKNOWN_RANK);
        assert_eq!(first.name(), "audit");
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.created_count(), 1);
    }

    #[test]
    fn test_unknown_categories_differ_by_name() {
        let registry = SeverityRegistry::new();
        let a = registry.resolve("alpha");
        let b = registry.resolve("beta");
        assert_eq!(a.rank(), b.rank());
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_add_level() {
        let registry = SeverityRegistry::new();
        let added = registry.add_level(45_000, "Audit", Some("Audit Trail")).unwrap();

        let resolved = registry.resolve("audit");
        assert!(Arc::ptr_eq(&added, &resolved));
        assert_eq!(resolved.rank(), 45_000);
        assert_eq!(resolved.display_name(), "Audit Trail");
    }

    #[test]
    fn test_add_level_overwrites_custom_level() {
        let registry = SeverityRegistry::new();
        let created = registry.resolve("audit");
        assert_eq!(created.rank(), UNKNOWN_RANK);

        registry.add_level(45_000, "audit", None).unwrap();
        assert_eq!(registry.resolve("audit").rank(), 45_000);
    }

    #[test]
    fn test_add_level_rejects_builtin_names() {
        let registry = SeverityRegistry::new();
        let err = registry.add_level(1, "Info", None).unwrap_err();
        assert!(matches!(err, LoggerError::ReservedLevel { .. }));
        assert_eq!(registry.resolve("info").rank(), INFO_RANK);

        let err = registry.add_level(1, "", None).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_concurrent_first_resolution() {
        let registry = Arc::new(SeverityRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve("race-level"))
            })
            .collect();

        let levels: Vec<Arc<Level>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(levels.iter().all(|l| Arc::ptr_eq(l, &levels[0])));
        assert_eq!(registry.created_count(), 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(&SeverityRegistry::global(), &SeverityRegistry::global()));
    }
}
