//! Line classification.
//!
//! A single ordered rule table decides what every line *is*. Modes never
//! re-derive classes; they only decide what to do with them (see
//! [`super::policy`]). The first matching rule wins, so the table order is the
//! priority order: terminal results, errors, warnings, test detail, artifacts,
//! progress/config, noise.

use regex::Regex;

use super::context::FilterContext;
use super::details::DetailExtractor;
use super::types::{Classification, LineClass, LineTraits, LogLine};

/// How a rule recognises a line.
#[derive(Debug)]
enum Matcher {
    /// Case-sensitive substring, any of
    Contains(&'static [&'static str]),
    /// Substring of the lowercased line (patterns must be lowercase)
    ContainsIgnoreCase(&'static [&'static str]),
    /// Prefix of the trimmed line
    Prefix(&'static [&'static str]),
    /// Prefix of the lowercased trimmed line (patterns must be lowercase)
    PrefixIgnoreCase(&'static [&'static str]),
    /// Suffix of the trimmed line
    Suffix(&'static [&'static str]),
    /// Regular expression over the trimmed line
    Pattern(Regex),
    /// Regular expression, only while the most recent suite spans the whole run
    WholeRun(Regex),
    /// Indented shell continuation of a compiler command inside a build phase
    CommandContinuation,
}

impl Matcher {
    /// Compile a rule pattern. All patterns are literals in this file and
    /// covered by `all_patterns_compile`.
    fn pattern(re: &str) -> Self {
        Self::Pattern(compile(re))
    }

    fn whole_run(re: &str) -> Self {
        Self::WholeRun(compile(re))
    }

    fn matches(&self, line: &LogLine, lower: &str, ctx: &FilterContext) -> bool {
        let trimmed = line.trimmed_text.as_str();
        match self {
            Self::Contains(needles) => needles.iter().any(|n| trimmed.contains(n)),
            Self::ContainsIgnoreCase(needles) => needles.iter().any(|n| lower.contains(n)),
            Self::Prefix(prefixes) => prefixes.iter().any(|p| trimmed.starts_with(p)),
            Self::PrefixIgnoreCase(prefixes) => prefixes.iter().any(|p| lower.starts_with(p)),
            Self::Suffix(suffixes) => suffixes.iter().any(|s| trimmed.ends_with(s)),
            Self::Pattern(re) => re.is_match(trimmed),
            Self::WholeRun(re) => ctx.in_whole_run_suite() && re.is_match(trimmed),
            Self::CommandContinuation => {
                ctx.in_build_phase
                    && line.text.starts_with(char::is_whitespace)
                    && ["cd ", "export ", "/", "builtin-"]
                        .iter()
                        .any(|p| trimmed.starts_with(p))
            }
        }
    }
}

fn compile(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid rule pattern {re}: {e}"))
}

/// One row of the classification table.
#[derive(Debug)]
struct Rule {
    name: &'static str,
    class: LineClass,
    traits: LineTraits,
    matcher: Matcher,
}

impl Rule {
    fn new(name: &'static str, class: LineClass, matcher: Matcher) -> Self {
        Self {
            name,
            class,
            traits: LineTraits::default(),
            matcher,
        }
    }

    fn terminal(mut self) -> Self {
        self.traits.terminal = true;
        self
    }

    fn failing(mut self) -> Self {
        self.traits.failing = true;
        self
    }

    fn summary(mut self) -> Self {
        self.traits.suite_summary = true;
        self
    }

    fn internal_flags(mut self) -> Self {
        self.traits.internal_flags = true;
        self
    }
}

/// Classifies transcript lines against an instance-owned rule table.
///
/// Construct once per engine; classification itself is `&self` and never fails.
#[derive(Debug)]
pub struct LineClassifier {
    rules: Vec<Rule>,
    details: DetailExtractor,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier {
    pub fn new() -> Self {
        use LineClass::*;

        let rules = vec![
            // 1. Terminal result markers
            Rule::new(
                "build-succeeded",
                BuildResult,
                Matcher::pattern(r"\*\* (BUILD|ARCHIVE|ANALYZE|INSTALL) SUCCEEDED \*\*"),
            )
            .terminal(),
            Rule::new(
                "build-failed",
                BuildResult,
                Matcher::pattern(r"\*\* (BUILD|ARCHIVE|ANALYZE|INSTALL) FAILED \*\*"),
            )
            .terminal()
            .failing(),
            Rule::new(
                "test-succeeded",
                TestResult,
                Matcher::pattern(r"\*\* TEST (EXECUTE |BUILD )?SUCCEEDED \*\*"),
            )
            .terminal(),
            Rule::new(
                "test-failed",
                TestResult,
                Matcher::pattern(r"\*\* TEST (EXECUTE |BUILD )?FAILED \*\*"),
            )
            .terminal()
            .failing(),
            Rule::new(
                "clean-succeeded",
                CleanResult,
                Matcher::Contains(&["** CLEAN SUCCEEDED **"]),
            )
            .terminal(),
            Rule::new(
                "clean-failed",
                CleanResult,
                Matcher::Contains(&["** CLEAN FAILED **"]),
            )
            .terminal()
            .failing(),
            // 2. Errors
            Rule::new(
                "error-marker",
                Error,
                Matcher::ContainsIgnoreCase(&[
                    ": error:",
                    "fatal error:",
                    "xcodebuild: error:",
                    "compilation error:",
                    "the following build commands failed:",
                ]),
            )
            .failing(),
            Rule::new("error-prefix", Error, Matcher::PrefixIgnoreCase(&["error:"])).failing(),
            // 3. Warnings
            Rule::new(
                "warning-marker",
                Warning,
                Matcher::ContainsIgnoreCase(&[": warning:"]),
            ),
            Rule::new("warning-prefix", Warning, Matcher::PrefixIgnoreCase(&["warning:"])),
            // 4. Test detail
            Rule::new(
                "test-case-failed",
                TestResult,
                Matcher::pattern(r"Test Case '[^']+' failed"),
            )
            .failing(),
            Rule::new(
                "test-case-passed",
                TestResult,
                Matcher::pattern(r"Test Case '[^']+' (passed|skipped)"),
            ),
            Rule::new(
                "test-case-started",
                TestResult,
                Matcher::pattern(r"Test Case '[^']+' started"),
            ),
            Rule::new(
                "test-run-failed",
                TestResult,
                Matcher::pattern(r"Test Suite '(All tests|Selected tests|[^']+\.xctest)' failed"),
            )
            .failing()
            .summary(),
            Rule::new(
                "test-run-passed",
                TestResult,
                Matcher::pattern(r"Test Suite '(All tests|Selected tests|[^']+\.xctest)' passed"),
            )
            .summary(),
            Rule::new(
                "test-suite-failed",
                TestResult,
                Matcher::pattern(r"Test Suite '[^']+' failed"),
            )
            .failing(),
            Rule::new(
                "test-suite-detail",
                TestResult,
                Matcher::pattern(r"Test Suite '[^']+' (started|passed)"),
            ),
            Rule::new(
                "test-run-summary-failures",
                TestResult,
                Matcher::whole_run(r"Executed \d+ tests?, with [1-9]\d* failures?"),
            )
            .failing()
            .summary(),
            Rule::new(
                "test-run-summary",
                TestResult,
                Matcher::whole_run(r"Executed \d+ tests?"),
            )
            .summary(),
            // Per-class counts that follow a single test class
            Rule::new(
                "test-summary-failures",
                TestResult,
                Matcher::pattern(r"Executed \d+ tests?, with [1-9]\d* failures?"),
            )
            .failing(),
            Rule::new(
                "test-summary",
                TestResult,
                Matcher::pattern(r"Executed \d+ tests?"),
            ),
            Rule::new(
                "test-count-failed",
                TestResult,
                Matcher::Contains(&[" tests failed,", " test failed,"]),
            )
            .failing()
            .summary(),
            Rule::new(
                "test-count-passed",
                TestResult,
                Matcher::Contains(&[" tests passed,", " test passed,"]),
            )
            .summary(),
            Rule::new(
                "swift-testing-run-failed",
                TestResult,
                Matcher::pattern(r"^[✘✗] Test run with \d+ tests?.* failed"),
            )
            .failing()
            .summary(),
            Rule::new(
                "swift-testing-run-passed",
                TestResult,
                Matcher::pattern(r"^[✔✓] Test run with \d+ tests?.* passed"),
            )
            .summary(),
            Rule::new(
                "swift-testing-failed",
                TestResult,
                Matcher::pattern(r"^[✘✗] (Test|Suite) .*(failed|recorded an issue)"),
            )
            .failing(),
            Rule::new(
                "swift-testing-detail",
                TestResult,
                Matcher::pattern(r"^[✔✓◇↳] (Test|Suite) "),
            ),
            // 5. Artifacts
            Rule::new(
                "artifact-path",
                ArtifactPath,
                Matcher::Contains(&["Archive path:", "Export path:", "Product Path:", "Exported to:"]),
            ),
            Rule::new(
                "artifact-bundle",
                ArtifactPath,
                Matcher::Suffix(&[".xcarchive", ".ipa"]),
            ),
            // 6. The noisiest compiler internals go first so no later rule keeps them
            Rule::new(
                "compiler-internal-flags",
                CompilationNoise,
                Matcher::Contains(&["-Xfrontend", "-Xcc", "-Xlinker", "ClangStatCache"]),
            )
            .internal_flags(),
            // 7. Progress and configuration
            Rule::new(
                "build-target-banner",
                ProgressIndicator,
                Matcher::pattern(r"^=== BUILD (AGGREGATE )?TARGET "),
            ),
            Rule::new(
                "percent-progress",
                ProgressIndicator,
                Matcher::pattern(r"\[\s*\d{1,3}%\]"),
            ),
            Rule::new(
                "test-progress",
                ProgressIndicator,
                Matcher::Contains(&["Testing target", "Running tests", "Testing started"]),
            ),
            Rule::new(
                "scheme-destination",
                ConfigInfo,
                Matcher::ContainsIgnoreCase(&["scheme:", "destination:"]),
            ),
            Rule::new(
                "package-resolution",
                ConfigInfo,
                Matcher::Contains(&["Resolve Package", "Resolved source packages"]),
            ),
            Rule::new(
                "command-invocation",
                ConfigInfo,
                Matcher::Contains(&["Command line invocation", "/xcodebuild"]),
            ),
            Rule::new(
                "build-configuration",
                ConfigInfo,
                Matcher::Contains(&[
                    "Build settings from command line:",
                    "=== CONFIGURATION:",
                    "SDK:",
                    "PLATFORM:",
                ]),
            ),
            // 8. Noise
            Rule::new(
                "build-system-note",
                FrameworkNoise,
                Matcher::ContainsIgnoreCase(&[
                    "note: using new build system",
                    "note: planning build",
                    "note: build preparation complete",
                    "note: constructing build description",
                    "note: building targets in parallel",
                ]),
            ),
            Rule::new(
                "command-continuation",
                VerboseCompilation,
                Matcher::CommandContinuation,
            ),
            Rule::new(
                "compiler-invocation",
                VerboseCompilation,
                Matcher::Contains(&[
                    "/usr/bin/clang",
                    "-x objective-c",
                    "-fmodules",
                    "-fdiagnostics-color",
                    "-isysroot",
                    "-iframework",
                    "CompileC ",
                    "CompileSwift",
                    "GenerateDSYMFile",
                    "ProcessInfoPlistFile",
                    "CopySwiftLibs",
                ]),
            ),
            Rule::new("link-step", VerboseCompilation, Matcher::Prefix(&["Ld "])),
            Rule::new(
                "compilation-noise",
                CompilationNoise,
                Matcher::Contains(&[
                    "SwiftDriver",
                    "SwiftCompile",
                    "SwiftEmitModule",
                    "SwiftMergeGeneratedHeaders",
                    "ExecuteExternalTool",
                    "CodeSign",
                    "builtin-",
                    "/Applications/Xcode.app/Contents/Developer",
                    "-module-name",
                    "-target arm64",
                    "-target x86_64",
                    "CreateBuildDirectory",
                    "CreateUniversalBinary",
                    "PhaseScriptExecution",
                    "Touch /",
                    "CpResource",
                    "CopyPlistFile",
                    "ProcessProductPackaging",
                    "RegisterExecutionPolicyException",
                    "Validate /",
                    "User defaults from command line:",
                    "Build description signature:",
                    "Build description path:",
                    "note:",
                    "-I/",
                    "-F/",
                    "-L/",
                    ".swiftmodule",
                    ".xctest",
                    ".app/",
                    "-emit-module",
                    "-emit-dependencies",
                    "-emit-objc-header",
                    "-incremental",
                    "-serialize-diagnostics",
                    "-parseable-output",
                    "/usr/bin/swiftc",
                    "/usr/bin/swift",
                    "DerivedData/",
                ]),
            ),
            Rule::new(
                "shell-step",
                CompilationNoise,
                Matcher::Prefix(&["cd /", "export "]),
            ),
        ];

        Self {
            rules,
            details: DetailExtractor::new(),
        }
    }

    /// Classify one line. Unmatched input degrades to `Plain`; whitespace-only
    /// lines are `Blank`.
    pub fn classify(&self, line: &LogLine, ctx: &FilterContext) -> Classification {
        if line.is_blank() {
            return Classification::new(LineClass::Blank, "blank");
        }

        let lower = line.trimmed_text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(line, &lower, ctx))
            .map(|rule| Classification {
                class: rule.class,
                rule: rule.name,
                traits: rule.traits,
            })
            .unwrap_or_else(|| Classification::new(LineClass::Plain, "plain"))
    }

    /// Convenience for one-off lines outside a run.
    pub fn classify_text(&self, text: &str) -> Classification {
        self.classify(&LogLine::new(text, 0), &FilterContext::default())
    }

    /// Capture patterns for diagnostics, test cases and artifacts.
    pub fn details(&self) -> &DetailExtractor {
        &self.details
    }

    /// Names of all rules, in priority order.
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name)
    }
}
