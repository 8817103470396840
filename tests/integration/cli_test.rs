//! Integration tests for the xctriage binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::helpers::{fixtures_dir, ips_report, xctest_run};

/// Command with an isolated config location.
fn xctriage(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("xctriage").unwrap();
    cmd.env("XCTRIAGE_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("XCTRIAGE_FILTER_DEBUG")
        .env_remove("XCTRIAGE_FILTER_DEBUG_DIR")
        .env_remove("XCTRIAGE_LOG");
    cmd
}

// ============================================================================
// Help Output Tests
// ============================================================================

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("filter"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("crashes"));
}

#[test]
fn invalid_mode_is_usage_error() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "--mode", "chatty"])
        .write_stdin("x\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("chatty"));
}

// ============================================================================
// filter
// ============================================================================

#[test]
fn filter_file_prints_digest_and_summary() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "--mode", "minimal", "--exit-code", "65"])
        .arg(fixtures_dir().join("build_failed.log"))
        .assert()
        .success()
        .stdout(predicate::str::contains("** BUILD FAILED **"))
        .stdout(predicate::str::contains("cannot find 'DetailView' in scope"))
        .stdout(predicate::str::contains("note:").not())
        .stderr(predicate::str::contains("build_failure"));
}

#[test]
fn filter_stdin_json_report() {
    let home = TempDir::new().unwrap();
    let output = xctriage(&home)
        .args(["filter", "--json", "--exit-code", "65", "--no-crash-reports"])
        .write_stdin(xctest_run(30, 2))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["crash_type"], "test_failure");
    assert_eq!(json["mode"], "standard");
    assert_eq!(json["silent_failure"], false);
    let stats = &json["stats"];
    assert_eq!(
        stats["total_lines"].as_u64().unwrap(),
        stats["kept_lines"].as_u64().unwrap() + stats["filtered_lines"].as_u64().unwrap()
    );
    assert!(json["digest"].as_str().unwrap().contains("testConflict1]' failed"));
    assert_eq!(json["test_counts"]["passed"], 30);
    assert_eq!(json["failed_tests"].as_array().unwrap().len(), 2);
    assert_eq!(json["diagnostics"][0]["file"], "/Users/dev/App/Tests/SyncTests.swift");
}

#[test]
fn filter_signal_flag_sets_crash_type() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "--json", "--signal", "segv"])
        .write_stdin("Test Case 'A.testB' started.\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"crash_type\": \"seg_fault\""));
}

#[test]
fn filter_uses_mode_from_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[triage]\ndefault_mode = \"verbose\"\n",
    )
    .unwrap();
    xctriage(&home)
        .args(["filter", "--json"])
        .write_stdin("hello\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"verbose\""));
}

#[test]
fn filter_debug_writes_trace_file() {
    let home = TempDir::new().unwrap();
    let traces = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "--debug", "--mode", "minimal"])
        .env("XCTRIAGE_FILTER_DEBUG_DIR", traces.path())
        .write_stdin("** BUILD SUCCEEDED **\n")
        .assert()
        .success()
        .stdout("** BUILD SUCCEEDED **\n");

    let names: Vec<String> = std::fs::read_dir(traces.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("xctriage_filter_minimal_"));
}

#[test]
fn filter_accepts_invalid_utf8() {
    let home = TempDir::new().unwrap();
    let mut transcript = b"app log \xff\xfe binary\n".to_vec();
    transcript.extend_from_slice(b"main.swift:1:1: error: expected expression\n** BUILD FAILED **\n");

    xctriage(&home)
        .args(["filter", "--mode", "minimal", "--exit-code", "65", "--no-crash-reports"])
        .write_stdin(transcript)
        .assert()
        .success()
        .stdout(predicate::str::contains("main.swift:1:1: error: expected expression"))
        .stdout(predicate::str::contains("** BUILD FAILED **"))
        .stderr(predicate::str::contains("build_failure"))
        .stderr(predicate::str::contains("1 errors, 0 warnings, 0 failed tests"));
}

#[test]
fn filter_missing_file_fails() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "/nonexistent/build.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/build.log"));
}

#[test]
fn filter_rejects_bad_since() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["filter", "--since", "last tuesday"])
        .write_stdin("x\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

// ============================================================================
// run
// ============================================================================

#[cfg(unix)]
#[test]
fn run_propagates_exit_code_and_triages() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["run", "--mode", "minimal", "--no-crash-reports", "--", "sh", "-c"])
        .arg("echo 'note: Planning build'; echo 'a.swift:1:1: error: boom'; echo '** BUILD FAILED **'; exit 65")
        .assert()
        .code(65)
        .stdout(predicate::str::contains("a.swift:1:1: error: boom"))
        .stdout(predicate::str::contains("note:").not())
        .stderr(predicate::str::contains("build_failure"));
}

#[cfg(unix)]
#[test]
fn run_timeout_exits_124() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["run", "--timeout", "1", "--json", "--no-crash-reports", "--", "sh", "-c", "exec sleep 30"])
        .assert()
        .code(124)
        .stdout(predicate::str::contains("\"crash_type\": \"timeout\""));
}

#[test]
fn run_requires_a_command() {
    let home = TempDir::new().unwrap();
    xctriage(&home).arg("run").assert().code(2);
}

// ============================================================================
// crashes, config, completions
// ============================================================================

#[test]
fn crashes_lists_reports_from_configured_directory() {
    let home = TempDir::new().unwrap();
    let reports = TempDir::new().unwrap();
    std::fs::write(
        reports.path().join("xctest-2024-01-15-103100.ips"),
        ips_report("xctest", "EXC_BAD_ACCESS", "SIGSEGV"),
    )
    .unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        format!(
            "[crash_reports]\ndirectory = {:?}\n",
            reports.path().to_string_lossy()
        ),
    )
    .unwrap();

    xctriage(&home)
        .arg("crashes")
        .assert()
        .success()
        .stdout(predicate::str::contains("xctest"))
        .stdout(predicate::str::contains("EXC_BAD_ACCESS"));
}

#[test]
fn config_show_prints_defaults() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[triage]"))
        .stdout(predicate::str::contains("default_mode = \"standard\""))
        .stdout(predicate::str::contains("[crash_reports]"));
}

#[test]
fn completions_for_bash() {
    let home = TempDir::new().unwrap();
    xctriage(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("xctriage"));
}
