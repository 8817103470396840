//! Crash report parsing errors.

use std::path::PathBuf;

/// Errors reading a single crash report. The scanner logs and skips these.
#[derive(Debug, thiserror::Error)]
pub enum CrashReportError {
    #[error("Failed to read crash report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed crash report {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Crash report {path} contains no JSON document")]
    Empty { path: PathBuf },
}
