//! Keyword based severity detection.
//!
//! Rules are checked in table order and the first hit wins, so a message
//! mentioning both "warning" and "error" is an `Error`.

use crate::record::{Record, Severity};
use chrono::{DateTime, Local};

/// Ordered (keywords, severity) rules. Keywords are lowercase.
static RULES: [(&[&str], Severity); 3] = [
    (&["error"], Severity::Error),
    (&["warning"], Severity::Warning),
    (&["success", "initialized"], Severity::Success),
];

/// Severity for `raw_text`, `Info` if no rule matches.
pub fn severity_of(raw_text: &str) -> Severity {
    let lower = raw_text.to_lowercase();
    for (keywords, severity) in RULES.iter() {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *severity;
        }
    }
    Severity::Info
}

/// Turns a decoded payload into a `Record` captured at `now`. Never fails.
pub fn classify(raw_text: &str, now: DateTime<Local>) -> Record {
    Record::new(now, raw_text.to_string(), severity_of(raw_text))
}
