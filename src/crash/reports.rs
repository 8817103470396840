//! Crash report correlation.
//!
//! The OS writes a crash report for every process that dies abnormally. When
//! a test run fails oddly, recent reports from simulator or test-host
//! processes tell a crash apart from an ordinary failure.
//!
//! Reports use the IPS format: a one-line JSON header followed by a JSON
//! body. Older reports are a single JSON document. Both are read as a stream
//! of JSON values and merged, body fields winning.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use super::error::CrashReportError;

/// Processes whose reports are always of interest.
pub const DEFAULT_WATCH_LIST: &[&str] = &[
    "Simulator",
    "launchd_sim",
    "testmanagerd",
    "xctest",
    "simctl",
];

/// Process name fragments that identify the simulator itself.
const SIMULATOR_PROCESSES: &[&str] = &["Simulator", "launchd_sim", "simctl", "CoreSimulator"];

/// One parsed crash report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrashReport {
    pub file_path: PathBuf,
    pub process_name: String,
    pub process_path: String,
    pub exception_type: String,
    pub signal: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CrashReport {
    /// Whether the crashed process belongs to the simulator runtime.
    pub fn is_simulator(&self) -> bool {
        SIMULATOR_PROCESSES
            .iter()
            .any(|p| self.process_name.contains(p) || self.process_path.contains(p))
    }
}

/// Lists and parses recent crash reports from one directory.
#[derive(Debug, Clone)]
pub struct CrashReportScanner {
    directory: PathBuf,
    watch_list: Vec<String>,
    extension: String,
}

impl Default for CrashReportScanner {
    fn default() -> Self {
        Self::new(Self::default_directory())
    }
}

impl CrashReportScanner {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            watch_list: DEFAULT_WATCH_LIST.iter().map(|s| s.to_string()).collect(),
            extension: "ips".to_string(),
        }
    }

    /// `~/Library/Logs/DiagnosticReports`
    pub fn default_directory() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_default()
            .join("Library")
            .join("Logs")
            .join("DiagnosticReports")
    }

    pub fn with_watch_list(mut self, watch_list: Vec<String>) -> Self {
        self.watch_list = watch_list;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reports modified at or after `since` whose file name mentions
    /// `process_name` or a watched process, oldest first.
    ///
    /// A missing directory yields an empty list. Unreadable or malformed
    /// reports are skipped.
    pub fn scan(&self, process_name: Option<&str>, since: SystemTime) -> Vec<CrashReport> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.directory.display(), error = %e, "crash report directory unavailable");
                return Vec::new();
            }
        };

        let candidates: Vec<(PathBuf, SystemTime)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if !self.is_candidate(&path, process_name) {
                    return None;
                }
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                (modified >= since).then_some((path, modified))
            })
            .collect();

        let mut reports: Vec<CrashReport> = candidates
            .par_iter()
            .filter_map(|(path, modified)| match parse_report(path, *modified) {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping crash report");
                    None
                }
            })
            .collect();
        reports.sort_by_key(|r| r.timestamp);

        tracing::debug!(
            dir = %self.directory.display(),
            candidates = candidates.len(),
            parsed = reports.len(),
            "crash report scan finished"
        );
        reports
    }

    /// Like [`scan`](Self::scan), but gives up after `deadline` and returns
    /// nothing. The abandoned scan finishes in the background.
    pub fn scan_with_deadline(
        &self,
        process_name: Option<&str>,
        since: SystemTime,
        deadline: Duration,
    ) -> Vec<CrashReport> {
        let scanner = self.clone();
        let process_name = process_name.map(str::to_string);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(scanner.scan(process_name.as_deref(), since));
        });

        match rx.recv_timeout(deadline) {
            Ok(reports) => reports,
            Err(_) => {
                tracing::warn!(
                    dir = %self.directory.display(),
                    deadline_ms = deadline.as_millis() as u64,
                    "crash report scan timed out"
                );
                Vec::new()
            }
        }
    }

    fn is_candidate(&self, path: &Path, process_name: Option<&str>) -> bool {
        let has_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()));
        if !has_extension {
            return false;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        process_name.is_some_and(|name| !name.is_empty() && file_name.contains(name))
            || self.watch_list.iter().any(|w| file_name.contains(w.as_str()))
    }
}

/// Read and parse one report file.
pub fn parse_report(path: &Path, modified: SystemTime) -> Result<CrashReport, CrashReportError> {
    let content = fs::read_to_string(path).map_err(|source| CrashReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ips(path, &content, modified)
}

/// Parse report text. `modified` is the fallback timestamp.
pub fn parse_ips(
    path: &Path,
    content: &str,
    modified: SystemTime,
) -> Result<CrashReport, CrashReportError> {
    let mut merged = Map::new();
    let mut documents = 0usize;
    for value in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        let value = value.map_err(|source| CrashReportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if let Value::Object(fields) = value {
            merged.extend(fields);
        }
        documents += 1;
    }
    if documents == 0 {
        return Err(CrashReportError::Empty {
            path: path.to_path_buf(),
        });
    }

    let text = |key: &str| merged.get(key).and_then(Value::as_str).map(str::to_string);
    let nested = |outer: &str, inner: &str| merged.get(outer).and_then(|v| v.get(inner));

    let process_name = text("procName")
        .or_else(|| text("app_name"))
        .or_else(|| text("name"))
        .unwrap_or_default();
    let signal = nested("exception", "signal")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| nested("termination", "code").and_then(Value::as_i64).map(|c| c.to_string()));
    let timestamp = text("captureTime")
        .or_else(|| text("timestamp"))
        .and_then(|t| parse_timestamp(&t))
        .unwrap_or_else(|| DateTime::<Utc>::from(modified));

    Ok(CrashReport {
        file_path: path.to_path_buf(),
        process_name,
        process_path: text("procPath").unwrap_or_default(),
        exception_type: nested("exception", "type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        signal,
        timestamp,
    })
}

/// RFC 3339, or the `2024-01-15 10:30:52.1234 -0800` form crash reports use.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z"))
        .map(|t| t.with_timezone(&Utc))
        .ok()
}
