//! Integration tests for `tokenkit validate`.
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::process::Command;

/// Path to the compiled `tokenkit` binary.
fn tokenkit_bin() -> PathBuf {
    let mut path = std::env::current_exe().expect("current exe");
    // current_exe is something like …/deps/cmd_validate-<hash>
    // The binary lives in the parent directory.
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("tokenkit");
    path
}

/// Path to a shared fixture file.
fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../tests/fixtures");
    path.push(name);
    path
}

// ---------------------------------------------------------------------------
// validate: known-good fixture (exit 0)
// ---------------------------------------------------------------------------

#[test]
fn validate_base_exits_0() {
    let out = Command::new(tokenkit_bin())
        .args(["validate", fixture("base.json").to_str().expect("path")])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(
        out.status.code(),
        Some(0),
        "expected exit 0 for base.json; stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn validate_base_produces_no_stdout() {
    let out = Command::new(tokenkit_bin())
        .args(["validate", fixture("base.json").to_str().expect("path")])
        .output()
        .expect("run tokenkit validate");
    assert!(
        out.stdout.is_empty(),
        "validate should not write to stdout; stdout: {}",
        String::from_utf8_lossy(&out.stdout)
    );
}

#[test]
fn validate_base_summary_on_stderr() {
    let out = Command::new(tokenkit_bin())
        .args(["validate", fixture("base.json").to_str().expect("path")])
        .output()
        .expect("run tokenkit validate");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("error(s)"),
        "stderr should contain a summary; stderr: {stderr}"
    );
}

#[test]
fn validate_quiet_suppresses_summary() {
    let out = Command::new(tokenkit_bin())
        .args([
            "validate",
            fixture("base.json").to_str().expect("path"),
            "--quiet",
        ])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(out.status.code(), Some(0));
    assert!(
        out.stderr.is_empty(),
        "quiet clean run should be silent; stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

// ---------------------------------------------------------------------------
// validate: reference problems
// ---------------------------------------------------------------------------

#[test]
fn validate_cycle_warns_but_exits_0_by_default() {
    let out = Command::new(tokenkit_bin())
        .args([
            "validate",
            fixture("tokens-cycle.json").to_str().expect("path"),
        ])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(out.status.code(), Some(0), "cycles are warnings by default");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cycle"), "stderr: {stderr}");
}

#[test]
fn validate_cycle_strict_exits_1() {
    let out = Command::new(tokenkit_bin())
        .args([
            "validate",
            fixture("tokens-cycle.json").to_str().expect("path"),
            "--strict",
        ])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(out.status.code(), Some(1), "strict upgrades cycles to errors");
}

// ---------------------------------------------------------------------------
// validate: unreadable input (exit 1)
// ---------------------------------------------------------------------------

#[test]
fn validate_broken_json_exits_1() {
    let out = Command::new(tokenkit_bin())
        .args(["validate", fixture("broken.json").to_str().expect("path")])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("broken.json"), "stderr: {stderr}");
}

#[test]
fn validate_missing_file_exits_1() {
    let out = Command::new(tokenkit_bin())
        .args(["validate", "does-not-exist.json"])
        .output()
        .expect("run tokenkit validate");
    assert_eq!(out.status.code(), Some(1));
}
