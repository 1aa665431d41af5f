//! Structured JSONL trace of case command handling.
//!
//! This module provides machine-parseable logging with:
//! - Monotonic sequence numbers for ordering
//! - ISO 8601 timestamps with microsecond precision
//! - Case ids for correlation
//! - Structured event data in JSON format

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::CaseCommand;

/// Structured JSONL trace writer for one case.
pub struct CaseTrace {
    case_id: String,
    seq: AtomicU64,
    trace_file: Mutex<File>,
    trace_path: PathBuf,
}

/// A single trace entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct TraceEntry {
    /// Monotonic sequence number (unique within one process)
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds
    pub ts: String,
    /// Case ID
    pub case_id: String,
    /// Component that emitted the entry
    pub component: String,
    /// Structured event data
    pub event: Value,
}

impl CaseTrace {
    /// Creates a new trace writer for the given case.
    ///
    /// Entries are appended to the file at `trace_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - The trace file cannot be opened
    pub fn new(case_id: &str, trace_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = trace_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(trace_path)?;

        Ok(Self {
            case_id: case_id.to_string(),
            seq: AtomicU64::new(0),
            trace_file: Mutex::new(file),
            trace_path: trace_path.to_path_buf(),
        })
    }

    /// Returns the next sequence number.
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Logs a structured event.
    ///
    /// The event is serialized to JSON and written as a single line.
    /// This method is thread-safe.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = TraceEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            case_id: self.case_id.clone(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.trace_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }

    /// Logs a dispatched case command.
    pub fn log_command(&self, command: &CaseCommand) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "Dispatched",
                "command": command
            }),
        );
    }

    /// Logs a command the aggregate accepted, with the resulting case state.
    pub fn log_command_accepted(&self, case_state: &str) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "Accepted",
                "case_state": case_state
            }),
        );
    }

    /// Logs a command the aggregate rejected.
    pub fn log_command_rejected(&self, error: &str) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "Rejected",
                "error": error
            }),
        );
    }

    /// Returns the path to the trace file.
    pub fn path(&self) -> &Path {
        &self.trace_path
    }

    /// Returns the case ID this trace belongs to.
    pub fn case_id(&self) -> &str {
        &self.case_id
    }
}

#[cfg(test)]
#[path = "case_trace_tests.rs"]
mod tests;
