//! Caller attribution for log events
//!
//! Every write entry point is `#[track_caller]`, so the engine always knows
//! the source position of the code that wrote. In `Symbolized` mode the
//! resolver also walks the current backtrace from the innermost frame
//! outward, skipping the engine's own frames until it reaches the one
//! positioned at that call site, and takes the function path from it.
//! Symbol lookups are cached per call site.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock};

/// How much caller information is attached to events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerCapture {
    /// No caller location at all
    Disabled,
    /// File, line and column of the write call. Declaring path and method
    /// stay empty; only `Symbolized` fills them.
    #[default]
    CallSite,
    /// Call site plus declaring path and function name from the backtrace.
    /// Captures a backtrace on the first write from each call site.
    Symbolized,
}

/// Source-code origin attributed to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

impl CallerLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_call_site(call_site: &Location<'_>) -> Self {
        Self {
            type_name: None,
            method: None,
            file: Some(call_site.file().to_string()),
            line: Some(call_site.line()),
            column: Some(call_site.column()),
        }
    }

    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Declaring path of the calling function
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Full function path of the caller
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Last segment of the function path
    pub fn method_name(&self) -> Option<&str> {
        self.method
            .as_deref()
            .map(|m| m.rsplit_once("::").map_or(m, |(_, name)| name))
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }
}

impl fmt::Display for CallerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.method, &self.type_name) {
            (Some(method), _) => write!(f, "{}", method)?,
            (None, Some(type_name)) => write!(f, "{}", type_name)?,
            (None, None) => write!(f, "?")?,
        }
        if let Some(file) = &self.file {
            write!(f, " ({}:{})", file, self.line.unwrap_or(0))?;
        }
        Ok(())
    }
}

/// Resolves the caller location for writes without an error attached
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerResolver {
    capture: CallerCapture,
}

impl CallerResolver {
    pub fn new(capture: CallerCapture) -> Self {
        Self { capture }
    }

    pub fn capture(&self) -> CallerCapture {
        self.capture
    }

    /// Location for a write made at `call_site`
    pub fn resolve(&self, call_site: &'static Location<'static>) -> Option<CallerLocation> {
        match self.capture {
            CallerCapture::Disabled => None,
            CallerCapture::CallSite => Some(CallerLocation::from_call_site(call_site)),
            CallerCapture::Symbolized => {
                let mut location = CallerLocation::from_call_site(call_site);
                if let Some(symbol) = symbolize(call_site) {
                    location.type_name = Some(symbol.type_name.clone());
                    location.method = Some(symbol.method.clone());
                }
                Some(location)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SymbolInfo {
    pub type_name: String,
    pub method: String,
}

type SiteKey = (&'static str, u32, u32);

static SYMBOL_CACHE: OnceLock<RwLock<HashMap<SiteKey, Option<Arc<SymbolInfo>>>>> = OnceLock::new();

/// Function path of the frame positioned at `call_site`, cached per site
pub(crate) fn symbolize(call_site: &'static Location<'static>) -> Option<Arc<SymbolInfo>> {
    let cache = SYMBOL_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = (call_site.file(), call_site.line(), call_site.column());

    if let Some(cached) = cache.read().get(&key) {
        return cached.clone();
    }

    let trace = Backtrace::force_capture().to_string();
    let resolved = first_frame_at(&parse_frames(&trace), call_site.file(), call_site.line())
        .map(|frame| Arc::new(split_symbol(&frame.symbol)));

    cache.write().entry(key).or_insert(resolved).clone()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StackFrame {
    pub symbol: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

/// Parse the textual form of `std::backtrace::Backtrace`
pub(crate) fn parse_frames(trace: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in trace.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.file.is_none() {
                    let (file, line) = split_location(location);
                    frame.file = Some(file);
                    frame.line = line;
                }
            }
            continue;
        }

        let symbol = match line.split_once(": ") {
            Some((index, symbol)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
                symbol
            }
            _ => line,
        };
        frames.push(StackFrame {
            symbol: strip_hash(symbol).to_string(),
            file: None,
            line: None,
        });
    }

    frames
}

/// Innermost frame whose source position is `file:line`
///
/// Frames inside the engine sit closer to the top of the stack than the
/// caller, so scanning from the top skips them.
pub(crate) fn first_frame_at<'a>(frames: &'a [StackFrame], file: &str, line: u32) -> Option<&'a StackFrame> {
    let wanted = file.replace('\\', "/");
    frames.iter().find(|frame| {
        frame.line == Some(line)
            && frame
                .file
                .as_deref()
                .map(|f| same_source(&f.replace('\\', "/"), &wanted))
                .unwrap_or(false)
    })
}

fn same_source(path: &str, wanted: &str) -> bool {
    path == wanted
        || (path.ends_with(wanted) && path[..path.len() - wanted.len()].ends_with('/'))
}

fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        // path:line:column
        (Some(path), Some(line), Some(_)) => (path.to_string(), line.parse().ok()),
        // path:line
        (None, Some(path), Some(line)) => (path.to_string(), line.parse().ok()),
        _ => (location.to_string(), None),
    }
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((path, hash)) if hash.len() == 16 && hash.bytes().all(|b| b.is_ascii_hexdigit()) => path,
        _ => symbol,
    }
}

pub(crate) fn split_symbol(symbol: &str) -> SymbolInfo {
    let mut method = symbol;
    while let Some(outer) = method.strip_suffix("::{{closure}}") {
        method = outer;
    }

    let type_name = match method.rsplit_once("::") {
        Some((declaring, _)) => declaring,
        None => method,
    };

    SymbolInfo {
        type_name: type_name.to_string(),
        method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:13
   1: trace_bridge::core::caller::symbolize::h0123456789abcdef
             at ./src/core/caller.rs:170:17
   2: app::handlers::Orders::submit::{{closure}}
             at ./src/handlers.rs:42:9
   3: app::main
             at ./src/main.rs:10:5
   4: core::ops::function::FnOnce::call_once
";

    #[test]
    fn test_parse_frames() {
        let frames = parse_frames(SAMPLE);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[1].symbol, "trace_bridge::core::caller::symbolize");
        assert_eq!(frames[1].file.as_deref(), Some("./src/core/caller.rs"));
        assert_eq!(frames[1].line, Some(170));
        assert_eq!(frames[4].file, None);
    }

    #[test]
    fn test_first_frame_at_skips_engine_frames() {
        let frames = parse_frames(SAMPLE);
        let frame = first_frame_at(&frames, "src/handlers.rs", 42).unwrap();
        assert_eq!(frame.symbol, "app::handlers::Orders::submit::{{closure}}");

        assert!(first_frame_at(&frames, "src/handlers.rs", 43).is_none());
        assert!(first_frame_at(&frames, "rc/main.rs", 10).is_none());
    }

    #[test]
    fn test_split_symbol() {
        let info = split_symbol("app::handlers::Orders::submit::{{closure}}");
        assert_eq!(info.type_name, "app::handlers::Orders");
        assert_eq!(info.method, "app::handlers::Orders::submit");

        let info = split_symbol("main");
        assert_eq!(info.type_name, "main");
        assert_eq!(info.method, "main");
    }

    #[test]
    fn test_split_location_handles_windows_paths() {
        let (file, line) = split_location(r"C:\work\src\lib.rs:12:5");
        assert_eq!(file, r"C:\work\src\lib.rs");
        assert_eq!(line, Some(12));
    }

    #[test]
    fn test_disabled_capture_yields_nothing() {
        let resolver = CallerResolver::new(CallerCapture::Disabled);
        assert!(resolver.resolve(Location::caller()).is_none());
    }

    #[test]
    fn test_call_site_capture() {
        let resolver = CallerResolver::new(CallerCapture::CallSite);
        let site = Location::caller();
        let location = resolver.resolve(site).unwrap();

        assert_eq!(location.file(), Some(file!()));
        assert_eq!(location.line(), Some(site.line()));
        assert!(location.method().is_none());
        assert!(location.type_name().is_none());
    }

    #[test]
    fn test_symbolized_capture_keeps_call_site() {
        let resolver = CallerResolver::new(CallerCapture::Symbolized);
        let site = Location::caller();
        let location = resolver.resolve(site).unwrap();

        assert_eq!(location.file(), Some(file!()));
        assert_eq!(location.line(), Some(site.line()));
        // Symbol names depend on debug info, so only check consistency
        if let Some(method) = location.method() {
            assert!(method.contains("test_symbolized_capture_keeps_call_site"));
        }
    }

    #[test]
    fn test_location_display() {
        let location = CallerLocation::new()
            .with_method("app::run")
            .with_file("src/main.rs", 3);
        assert_eq!(location.to_string(), "app::run (src/main.rs:3)");
        assert_eq!(location.method_name(), Some("run"));
    }
}
