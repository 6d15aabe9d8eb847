//! Errors written through the trace facility
//!
//! A [`CapturedError`] is a snapshot of an error value taken where it was
//! raised: its message, the crate that defined its type, the throw site and
//! a description of the errors it wraps. The throw site is recorded with
//! `#[track_caller]` at the point of capture.

use super::caller::{self, CallerLocation};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::panic::Location;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedError {
    message: String,
    type_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    throw_site: Option<CallerLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inner: Option<String>,
}

impl CapturedError {
    /// Capture an error at the caller's position
    ///
    /// # Example
    ///
    /// ```
    /// use trace_bridge::CapturedError;
    ///
    /// let err = "x".parse::<u32>().unwrap_err();
    /// let captured = CapturedError::new(&err);
    ///
    /// assert_eq!(captured.message(), "invalid digit found in string");
    /// assert_eq!(captured.source_name(), Some("core"));
    /// assert!(captured.throw_site().is_some());
    /// ```
    #[track_caller]
    pub fn new<E: Error + ?Sized + 'static>(err: &E) -> Self {
        let type_name = std::any::type_name::<E>();
        Self {
            message: err.to_string(),
            type_name,
            source: defining_crate(type_name),
            throw_site: Some(throw_site(Location::caller())),
            inner: describe_chain(err.source()),
        }
    }

    /// Capture a bare message as an error
    #[track_caller]
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_name: "",
            source: None,
            throw_site: Some(throw_site(Location::caller())),
            inner: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_inner(mut self, inner: impl Into<String>) -> Self {
        self.inner = Some(inner.into());
        self
    }

    #[must_use]
    pub fn with_throw_site(mut self, throw_site: Option<CallerLocation>) -> Self {
        self.throw_site = throw_site;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the error type, empty for message-only errors
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Crate that defined the error type
    pub fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn throw_site(&self) -> Option<&CallerLocation> {
        self.throw_site.as_ref()
    }

    /// Function that raised the error, or its file position when the
    /// function could not be resolved
    pub fn method(&self) -> Option<String> {
        let site = self.throw_site.as_ref()?;
        match site.method_name() {
            Some(name) => Some(name.to_string()),
            None => site
                .file()
                .map(|file| format!("{}:{}", file, site.line().unwrap_or(0))),
        }
    }

    /// Wrapped errors, outermost first, joined with `": "`
    pub fn inner(&self) -> Option<&str> {
        self.inner.as_deref()
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(inner) = &self.inner {
            write!(f, ": {}", inner)?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> From<E> for CapturedError {
    #[track_caller]
    fn from(err: E) -> Self {
        CapturedError::new(&err)
    }
}

fn throw_site(call_site: &'static Location<'static>) -> CallerLocation {
    let mut location = CallerLocation::from_call_site(call_site);
    if let Some(symbol) = caller::symbolize(call_site) {
        location = location
            .with_type_name(symbol.type_name.clone())
            .with_method(symbol.method.clone());
    }
    location
}

fn defining_crate(type_name: &str) -> Option<String> {
    if type_name.starts_with("dyn ") || type_name.starts_with('&') {
        return None;
    }
    type_name
        .split_once("::")
        .map(|(krate, _)| krate.to_string())
}

fn describe_chain(mut next: Option<&(dyn Error + 'static)>) -> Option<String> {
    let mut parts = Vec::new();
    while let Some(err) = next {
        parts.push(err.to_string());
        next = err.source();
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(": "))
    }
}
