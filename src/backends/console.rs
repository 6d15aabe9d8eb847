//! Console backend implementation

use crate::core::log_level::{
    DEBUG_RANK, ERROR_RANK, FATAL_RANK, INFO_RANK, NOTICE_RANK, WARN_RANK,
};
use crate::core::{Backend, Level, LogEvent, LoggerError, Result};
use colored::{Color, Colorize};
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Writes events as single text lines
///
/// Events ranked `error` and above go to stderr, the rest to stdout.
pub struct ConsoleBackend {
    use_colors: bool,
    min_level: Option<Arc<Level>>,
}

impl ConsoleBackend {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            min_level: None,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Skip events ranked below `level`
    #[must_use]
    pub fn with_min_level(mut self, level: Arc<Level>) -> Self {
        self.min_level = Some(level);
        self
    }

    fn accepts(&self, level: &Level) -> bool {
        self.min_level
            .as_ref()
            .map_or(true, |min| level.rank() >= min.rank())
    }

    /// Format as text with optional colors
    pub(crate) fn format_text(&self, event: &LogEvent) -> String {
        let level = event.level();
        let level_str = if self.use_colors {
            format!("{:8}", level.display_name())
                .color(color_for(level.rank()))
                .to_string()
        } else {
            format!("{:8}", level.display_name())
        };

        let mut line = format!(
            "[{}] [{}] [{}] {} - {}",
            event.timestamp().format(TIMESTAMP_FORMAT),
            level_str,
            event.logger_name(),
            event.thread_name().unwrap_or(event.thread_id()),
            sanitize(event.message())
        );

        if let Some(location) = event.location() {
            line.push_str(&format!(" ({})", location));
        }
        if !event.properties().is_empty() {
            line.push(' ');
            line.push_str(&sanitize(&event.properties().format_fields()));
        }
        line
    }
}

impl Default for ConsoleBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ConsoleBackend {
    fn log(&self, event: &LogEvent) -> Result<()> {
        if !self.accepts(event.level()) {
            return Ok(());
        }

        let output = self.format_text(event);
        if event.level().rank() >= ERROR_RANK {
            eprintln!("{}", output);
        } else {
            println!("{}", output);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        use std::io::Write;
        // Flush both stdout and stderr since we write to both
        std::io::stdout()
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing", "stdout", e))?;
        std::io::stderr()
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing", "stderr", e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Escape line breaks and tabs so one event stays one line
fn sanitize(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn color_for(rank: i32) -> Color {
    match rank {
        r if r >= FATAL_RANK => Color::BrightRed,
        r if r >= ERROR_RANK => Color::Red,
        r if r >= WARN_RANK => Color::Yellow,
        r if r >= NOTICE_RANK => Color::Cyan,
        r if r >= INFO_RANK => Color::Green,
        r if r >= DEBUG_RANK => Color::Blue,
        _ => Color::BrightBlack,
    }
}
