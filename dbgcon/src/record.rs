use chrono::{DateTime, Local};
use std::fmt;

/// Classification label of a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    /// Short tag used in the console.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
            Severity::Success => "OK",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One received message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    timestamp: DateTime<Local>,
    raw_text: String,
    severity: Severity,
}

impl Record {
    pub(crate) fn new(timestamp: DateTime<Local>, raw_text: String, severity: Severity) -> Record {
        Record {
            timestamp,
            raw_text,
            severity,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// The payload exactly as it was decoded.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Capture time with millisecond precision, e.g. `14:03:27.015`.
    pub fn display_time(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }
}

/// `[HH:MM:SS.mmm] text`, the line as shown in the console.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.display_time(), self.raw_text)
    }
}
