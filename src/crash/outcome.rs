//! Process outcomes and the failure taxonomy derived from them.

use std::fmt;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// How the toolchain process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub signaled: bool,
    /// Signal name (`SIGSEGV`, `SEGV`, `segv`) or number, when signaled.
    pub signal: Option<String>,
    pub core_dumped: bool,
    pub timed_out: bool,
    pub canceled: bool,
}

impl ProcessOutcome {
    /// A normal exit with `code`.
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    /// Termination by `signal`.
    pub fn signaled(signal: impl Into<String>) -> Self {
        Self {
            exit_code: -1,
            signaled: true,
            signal: Some(signal.into()),
            ..Self::default()
        }
    }

    /// Build from an OS exit status.
    pub fn from_status(status: ExitStatus) -> Self {
        let mut outcome = Self::exited(status.code().unwrap_or(-1));
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signo) = status.signal() {
                outcome.signaled = true;
                outcome.signal = Some(
                    signal_name(signo).map_or_else(|| signo.to_string(), str::to_string),
                );
            }
            outcome.core_dumped = status.core_dumped();
        }
        outcome
    }

    /// Signal number, parsed from a name or a number.
    pub fn signal_number(&self) -> Option<i32> {
        self.signal.as_deref().and_then(parse_signal)
    }
}

/// Failure taxonomy for one toolchain invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashType {
    #[default]
    None,
    SegFault,
    Abort,
    Killed,
    Interrupted,
    Terminated,
    Timeout,
    BuildFailure,
    TestFailure,
    FatalError,
    TestCrash,
    SimulatorCrash,
    Unknown,
}

impl CrashType {
    /// Classify a process outcome, ignoring the transcript.
    ///
    /// Timeouts and cancellation win over whatever signal the kill produced;
    /// signals win over exit codes.
    pub fn from_outcome(outcome: &ProcessOutcome) -> Self {
        if outcome.timed_out {
            return Self::Timeout;
        }
        if outcome.canceled {
            return Self::Interrupted;
        }
        if outcome.core_dumped {
            return Self::SegFault;
        }
        if outcome.signaled {
            return outcome
                .signal_number()
                .map_or(Self::Unknown, Self::from_signal);
        }
        Self::from_exit_code(outcome.exit_code)
    }

    fn from_signal(signo: i32) -> Self {
        match signo {
            libc::SIGSEGV | libc::SIGBUS => Self::SegFault,
            libc::SIGABRT | libc::SIGTRAP | libc::SIGILL | libc::SIGFPE => Self::Abort,
            libc::SIGKILL => Self::Killed,
            libc::SIGINT => Self::Interrupted,
            libc::SIGTERM | libc::SIGHUP | libc::SIGQUIT => Self::Terminated,
            _ => Self::Unknown,
        }
    }

    fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::None,
            65 => Self::TestFailure,
            // generic failure, input not found, destination/target mismatch
            1 | 66 | 70 => Self::BuildFailure,
            129..=160 => Self::from_signal(code - 128),
            _ => Self::Unknown,
        }
    }

    /// Whether this is an abnormal termination rather than a reported failure.
    pub fn is_crash(&self) -> bool {
        !matches!(self, Self::None | Self::BuildFailure | Self::TestFailure)
    }

    /// Types that transcript or crash-report evidence may replace.
    pub fn is_upgradable(&self) -> bool {
        matches!(
            self,
            Self::None | Self::Unknown | Self::BuildFailure | Self::TestFailure
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SegFault => "seg_fault",
            Self::Abort => "abort",
            Self::Killed => "killed",
            Self::Interrupted => "interrupted",
            Self::Terminated => "terminated",
            Self::Timeout => "timeout",
            Self::BuildFailure => "build_failure",
            Self::TestFailure => "test_failure",
            Self::FatalError => "fatal_error",
            Self::TestCrash => "test_crash",
            Self::SimulatorCrash => "simulator_crash",
            Self::Unknown => "unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "completed successfully",
            Self::SegFault => "segmentation fault",
            Self::Abort => "aborted",
            Self::Killed => "killed",
            Self::Interrupted => "interrupted",
            Self::Terminated => "terminated",
            Self::Timeout => "timed out",
            Self::BuildFailure => "build failed",
            Self::TestFailure => "tests failed",
            Self::FatalError => "fatal runtime error",
            Self::TestCrash => "test process crashed",
            Self::SimulatorCrash => "simulator crashed",
            Self::Unknown => "unknown failure",
        }
    }
}

impl fmt::Display for CrashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SIGNALS: &[(&str, i32)] = &[
    ("SIGHUP", libc::SIGHUP),
    ("SIGINT", libc::SIGINT),
    ("SIGQUIT", libc::SIGQUIT),
    ("SIGILL", libc::SIGILL),
    ("SIGTRAP", libc::SIGTRAP),
    ("SIGABRT", libc::SIGABRT),
    ("SIGBUS", libc::SIGBUS),
    ("SIGFPE", libc::SIGFPE),
    ("SIGKILL", libc::SIGKILL),
    ("SIGSEGV", libc::SIGSEGV),
    ("SIGPIPE", libc::SIGPIPE),
    ("SIGALRM", libc::SIGALRM),
    ("SIGTERM", libc::SIGTERM),
];

/// Parse `SIGSEGV`, `SEGV`, `segv` or `11`.
pub fn parse_signal(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(number) = value.parse::<i32>() {
        return (number > 0).then_some(number);
    }
    let upper = value.to_ascii_uppercase();
    let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
    SIGNALS
        .iter()
        .find(|(name, _)| name[3..] == *bare)
        .map(|(_, number)| *number)
}

/// Canonical `SIGXXX` name for a signal number.
pub fn signal_name(signo: i32) -> Option<&'static str> {
    SIGNALS
        .iter()
        .find(|(_, number)| *number == signo)
        .map(|(name, _)| *name)
}
