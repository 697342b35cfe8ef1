//! Structured status trail returned by every pipeline entry point.
//!
//! Each entry is mirrored to `tracing` as it is recorded, so the same
//! messages reach the process log and the caller-facing report.

use crate::error::PipelineError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One user-visible status line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEntry {
    pub severity: Severity,
    pub message: String,
}

/// Accumulates status entries for a single operation.
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: Vec<StatusEntry>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.push(Severity::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.push(Severity::Error, message);
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    /// Close the log with a final outcome.
    pub fn finish<T>(self, outcome: Result<T, PipelineError>) -> Report<T> {
        Report {
            entries: self.entries,
            outcome,
        }
    }

    fn push(&mut self, severity: Severity, message: String) {
        self.entries.push(StatusEntry { severity, message });
    }
}

/// Status entries plus the final outcome of an operation.
#[derive(Debug)]
pub struct Report<T> {
    pub entries: Vec<StatusEntry>,
    pub outcome: Result<T, PipelineError>,
}

impl<T> Report<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Render the trail as plain text, one entry per line, with the failure
    /// (if any) as the last line.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.entries.iter().map(|e| e.message.clone()).collect();
        if let Err(err) = &self.outcome {
            lines.push(format!("Error: {err}"));
        }
        lines.join("\n")
    }

    pub fn has_message(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(needle))
    }
}
