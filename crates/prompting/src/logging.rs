//! Tracing layer that captures log events for hosts to display.
//!
//! [`PanelTracingLayer`] writes [`LogLine`]s into a [`LogBuffer`] that any
//! host drains at its own pace. The buffer has its own mutex, so logging
//! from inside a reconciliation pass never contends with the host.

use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::Serialize;
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Buffer size that triggers trimming.
pub const MAX_LOG_LINES: usize = 2000;
/// Number of most recent lines kept after trimming.
pub const LOG_TRIM_TO: usize = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Short fixed-width label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Trace,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Local wall-clock time, `HH:MM:SS`.
    pub time: String,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
}

impl LogLine {
    pub fn render(&self) -> String {
        format!("{} {} {}", self.time, self.level.label(), self.message)
    }
}

/// Shared buffer of pending log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<LogLine>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::with_capacity(128))))
    }

    /// Take every pending line.
    pub fn drain(&self) -> Vec<LogLine> {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buf)
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, line: LogLine) {
        if let Ok(mut buf) = self.0.lock() {
            buf.push(line);
            if buf.len() > MAX_LOG_LINES {
                let trim_to = buf.len() - LOG_TRIM_TO;
                buf.drain(..trim_to);
            }
        }
    }
}

/// A [`tracing_subscriber::Layer`] that captures events into a [`LogBuffer`].
pub struct PanelTracingLayer {
    buffer: LogBuffer,
    min_level: LogLevel,
}

impl PanelTracingLayer {
    /// Create a layer and the buffer it fills.
    pub fn new() -> (Self, LogBuffer) {
        let buffer = LogBuffer::new();
        (
            Self {
                buffer: buffer.clone(),
                min_level: LogLevel::Debug,
            },
            buffer,
        )
    }

    /// Ignore events below `level`. Default: `Debug`.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for PanelTracingLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = LogLevel::from(event.metadata().level());
        if level < self.min_level {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut message = visitor.message;
        if !visitor.fields.is_empty() {
            let extras: Vec<String> = visitor
                .fields
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            if message.is_empty() {
                message = extras.join(" ");
            } else {
                message = format!("{message} {{{}}}", extras.join(", "));
            }
        }

        self.buffer.push(LogLine {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            target: event.metadata().target().to_string(),
            message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let raw = format!("{value:?}");
        if field.name() == "message" {
            self.message = raw
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .map(str::to_string)
                .unwrap_or(raw);
        } else {
            self.fields.push((field.name().to_string(), raw));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name().to_string(), value.to_string()));
        }
    }
}

/// Map a `-v` count to a level filter: warn, info, debug, trace.
pub fn verbosity_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install a global subscriber: a stderr `fmt` layer filtered by `verbose`,
/// plus an optional capture layer.
pub fn init_tracing(verbose: u8, capture: Option<PanelTracingLayer>) {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(verbosity_filter(verbose));
    let _ = tracing_subscriber::registry()
        .with(fmt)
        .with(capture)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, trace, warn};

    fn capture<F: FnOnce()>(layer: PanelTracingLayer, f: F) {
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn captures_messages_and_fields() {
        let (layer, buffer) = PanelTracingLayer::new();
        capture(layer, || {
            info!("hello");
            warn!(queued = 2, "Overlapping refresh");
            debug!(removed = 1);
        });
        let lines = buffer.drain();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "hello");
        assert_eq!(lines[0].level, LogLevel::Info);
        assert_eq!(lines[1].message, "Overlapping refresh {queued=2}");
        assert_eq!(lines[2].message, "removed=1");
        assert!(buffer.is_empty());
    }

    #[test]
    fn min_level_filters() {
        let (layer, buffer) = PanelTracingLayer::new();
        capture(layer.with_min_level(LogLevel::Warn), || {
            trace!("t");
            info!("i");
            warn!("w");
        });
        let lines = buffer.drain();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].render().split_once(' ').unwrap().1, "WARN  w");
    }

    #[test]
    fn buffer_is_trimmed() {
        let buffer = LogBuffer::new();
        for i in 0..=MAX_LOG_LINES {
            buffer.push(LogLine {
                time: String::new(),
                level: LogLevel::Info,
                target: String::new(),
                message: i.to_string(),
            });
        }
        let lines = buffer.drain();
        assert_eq!(lines.len(), LOG_TRIM_TO);
        assert_eq!(lines.last().unwrap().message, MAX_LOG_LINES.to_string());
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity_filter(0), LevelFilter::WARN);
        assert_eq!(verbosity_filter(2), LevelFilter::DEBUG);
        assert_eq!(verbosity_filter(9), LevelFilter::TRACE);
    }
}
