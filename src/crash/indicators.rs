//! Textual crash evidence in a transcript.

use regex::RegexSet;
use serde::Serialize;

/// Which crash signatures a transcript contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrashIndicators {
    pub test_runner_crashed: bool,
    pub connection_interrupted: bool,
    pub early_exit: bool,
    pub never_began_testing: bool,
    pub bundle_load_failed: bool,
    pub simulator_boot_timeout: bool,
    pub test_process_crashed: bool,
    pub fatal_error_detected: bool,
    pub runtime_crash: bool,
}

impl CrashIndicators {
    /// Scan with a fresh [`IndicatorScanner`].
    pub fn scan(transcript: &str) -> Self {
        IndicatorScanner::new().scan(transcript)
    }

    pub fn any(&self) -> bool {
        self.test_runner_crashed
            || self.connection_interrupted
            || self.early_exit
            || self.never_began_testing
            || self.bundle_load_failed
            || self.simulator_boot_timeout
            || self.test_process_crashed
            || self.fatal_error_detected
            || self.runtime_crash
    }

    /// Evidence that the test host or runner died rather than a test failing.
    pub fn runner_failure(&self) -> bool {
        self.test_runner_crashed
            || self.test_process_crashed
            || self.bundle_load_failed
            || self.connection_interrupted
            || self.early_exit
            || self.never_began_testing
    }

    fn set(&mut self, indicator: Indicator) {
        let flag = match indicator {
            Indicator::TestRunnerCrashed => &mut self.test_runner_crashed,
            Indicator::ConnectionInterrupted => &mut self.connection_interrupted,
            Indicator::EarlyExit => &mut self.early_exit,
            Indicator::NeverBeganTesting => &mut self.never_began_testing,
            Indicator::BundleLoadFailed => &mut self.bundle_load_failed,
            Indicator::SimulatorBootTimeout => &mut self.simulator_boot_timeout,
            Indicator::TestProcessCrashed => &mut self.test_process_crashed,
            Indicator::FatalErrorDetected => &mut self.fatal_error_detected,
            Indicator::RuntimeCrash => &mut self.runtime_crash,
        };
        *flag = true;
    }
}

#[derive(Debug, Clone, Copy)]
enum Indicator {
    TestRunnerCrashed,
    ConnectionInterrupted,
    EarlyExit,
    NeverBeganTesting,
    BundleLoadFailed,
    SimulatorBootTimeout,
    TestProcessCrashed,
    FatalErrorDetected,
    RuntimeCrash,
}

const PATTERNS: &[(Indicator, &str)] = &[
    (Indicator::TestRunnerCrashed, r"Test runner exited"),
    (Indicator::TestRunnerCrashed, r"(?i)test runner crashed"),
    (
        Indicator::TestRunnerCrashed,
        r"Restarting after unexpected exit, crash, or test timeout",
    ),
    (Indicator::ConnectionInterrupted, r"(?i)connection interrupted"),
    (Indicator::ConnectionInterrupted, r"(?i)lost connection to test manager"),
    (
        Indicator::EarlyExit,
        r"Early unexpected exit, operation never finished bootstrapping",
    ),
    (Indicator::NeverBeganTesting, r"never began (testing|executing tests)"),
    (Indicator::BundleLoadFailed, r"couldn.t be loaded"),
    (Indicator::BundleLoadFailed, r"(?i)failed to load (the )?test bundle"),
    (
        Indicator::SimulatorBootTimeout,
        r"(?i)timed out waiting for (the )?simulator to boot",
    ),
    (Indicator::SimulatorBootTimeout, r"(?i)unable to boot (the )?simulator"),
    (Indicator::SimulatorBootTimeout, r"(?i)simulator boot timed out"),
    (Indicator::TestProcessCrashed, r"Test crashed with signal"),
    (Indicator::TestProcessCrashed, r"\bcrashed in\b"),
    (Indicator::TestProcessCrashed, r"\(crashed\)"),
    // Swift runtime trap; the compiler's `fatal error:` is lowercase
    (Indicator::FatalErrorDetected, r"Fatal error: "),
    (Indicator::RuntimeCrash, r"Precondition failed"),
    (Indicator::RuntimeCrash, r"Assertion failed:"),
    (Indicator::RuntimeCrash, r"Unexpectedly found nil"),
    (Indicator::RuntimeCrash, r"EXC_BAD_(ACCESS|INSTRUCTION)"),
    (Indicator::RuntimeCrash, r"Swift runtime failure"),
    (Indicator::RuntimeCrash, r"Index out of range"),
    (
        Indicator::RuntimeCrash,
        r"Terminating app due to uncaught exception",
    ),
    (Indicator::RuntimeCrash, r"Thread \d+ Crashed"),
];

/// Compiled indicator patterns. Build once and reuse across transcripts.
#[derive(Debug)]
pub struct IndicatorScanner {
    set: RegexSet,
}

impl Default for IndicatorScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorScanner {
    pub fn new() -> Self {
        let set = RegexSet::new(PATTERNS.iter().map(|(_, re)| *re))
            .unwrap_or_else(|e| panic!("invalid crash indicator pattern: {e}"));
        Self { set }
    }

    /// Scan line by line; a pattern never spans lines.
    pub fn scan(&self, transcript: &str) -> CrashIndicators {
        let mut indicators = CrashIndicators::default();
        for line in transcript.lines() {
            for index in self.set.matches(line).iter() {
                indicators.set(PATTERNS[index].0);
            }
        }
        if indicators.any() {
            tracing::debug!(?indicators, "crash indicators found");
        }
        indicators
    }
}
