//! User configuration (`~/.config/xctriage/config.toml`).

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::crash::{CrashReportScanner, DEFAULT_WATCH_LIST};
use crate::triage::{DebugOptions, VerbosityMode};

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "XCTRIAGE_CONFIG";

/// Top-level configuration. Every field has a default, so a partial or
/// missing file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub triage: TriageConfig,
    pub crash_reports: CrashReportConfig,
}

/// Digest settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Mode used when none is given on the command line
    pub default_mode: VerbosityMode,
    /// Write a per-line decision trace for every run
    pub debug: bool,
    /// Trace directory (system temp dir when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<PathBuf>,
}

/// Crash report correlation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashReportConfig {
    pub enabled: bool,
    /// Report directory (`~/Library/Logs/DiagnosticReports` when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Processes whose reports are always correlated
    pub watch_list: Vec<String>,
    /// Give up on the scan after this many milliseconds
    pub scan_timeout_ms: u64,
}

impl Default for CrashReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            watch_list: DEFAULT_WATCH_LIST.iter().map(|s| s.to_string()).collect(),
            scan_timeout_ms: 2_000,
        }
    }
}

impl CrashReportConfig {
    /// Scanner for these settings, or `None` when correlation is off.
    pub fn scanner(&self) -> Option<CrashReportScanner> {
        if !self.enabled {
            return None;
        }
        let directory = self
            .directory
            .clone()
            .unwrap_or_else(CrashReportScanner::default_directory);
        Some(CrashReportScanner::new(directory).with_watch_list(self.watch_list.clone()))
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

impl TriageConfig {
    /// Debug options from config, then `XCTRIAGE_FILTER_DEBUG*` overrides.
    pub fn debug_options(&self) -> DebugOptions {
        DebugOptions {
            enabled: self.debug,
            directory: self.debug_dir.clone(),
        }
        .with_env_overrides()
    }
}

impl Config {
    /// Path of the config file: `$XCTRIAGE_CONFIG`, else
    /// `<config dir>/xctriage/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("xctriage").join("config.toml"))
    }

    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
