//! Shared fixtures and transcript builders.

use std::path::PathBuf;

/// Directory holding transcript fixtures.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture transcript by file name.
pub fn load_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to load fixture {}: {}", path.display(), e))
}

/// An XCTest run with `passing` passing and `failing` failing test cases,
/// ending in the usual suite summary and `** TEST FAILED **` / `** TEST SUCCEEDED **`.
pub fn xctest_run(passing: usize, failing: usize) -> String {
    let mut text = String::from(
        "Test Suite 'All tests' started at 2024-01-15 10:30:45.123\n\
         Test Suite 'AppTests.xctest' started at 2024-01-15 10:30:45.124\n",
    );
    for i in 0..passing {
        text.push_str(&format!(
            "Test Case '-[AppTests.StoreTests testPersists{i}]' started.\n\
             Test Case '-[AppTests.StoreTests testPersists{i}]' passed (0.003 seconds).\n"
        ));
    }
    for i in 0..failing {
        text.push_str(&format!(
            "Test Case '-[AppTests.SyncTests testConflict{i}]' started.\n\
             /Users/dev/App/Tests/SyncTests.swift:{}: error: -[AppTests.SyncTests testConflict{i}] : XCTAssertTrue failed\n\
             Test Case '-[AppTests.SyncTests testConflict{i}]' failed (0.021 seconds).\n",
            40 + i
        ));
    }
    let verdict = if failing > 0 { "failed" } else { "passed" };
    text.push_str(&format!(
        "Test Suite 'All tests' {verdict} at 2024-01-15 10:33:02.517.\n\
         \t Executed {} tests, with {failing} failures (0 unexpected) in 137.394 (137.512) seconds\n",
        passing + failing
    ));
    text.push_str(if failing > 0 {
        "** TEST FAILED **\n"
    } else {
        "** TEST SUCCEEDED **\n"
    });
    text
}

/// Minimal IPS crash report (header line + body) for `process`.
pub fn ips_report(process: &str, exception: &str, signal: &str) -> String {
    format!(
        "{{\"app_name\":\"{process}\",\"timestamp\":\"2024-01-15 10:31:00.00 +0000\",\"bug_type\":\"309\"}}\n\
         {{\"procName\":\"{process}\",\"procPath\":\"/usr/bin/{process}\",\
         \"captureTime\":\"2024-01-15 10:31:00.5000 +0000\",\
         \"exception\":{{\"type\":\"{exception}\",\"signal\":\"{signal}\"}}}}\n"
    )
}
