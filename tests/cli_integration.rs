//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Get the binary to test.
fn runmark() -> Command {
    Command::cargo_bin("runmark").unwrap()
}

const SIMPLE_RUNBOOK: &str = "# Demo\n\n```sh\necho hello\n```\n";

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    runmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("markdown runbooks"));
}

#[test]
fn test_version_flag() {
    runmark()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_run_help() {
    runmark()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("document order"));
}

// ============================================================================
// Show Command Tests
// ============================================================================

#[test]
fn test_show_lists_cells() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("Intro prose.\n\n```sh\n# @options {\"id\": \"listing\"}\nls\n```\n").unwrap();

    runmark()
        .args(["show", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("markup"))
        .stdout(predicate::str::contains("code"))
        .stdout(predicate::str::contains("id=listing"));
}

#[test]
fn test_show_json_format() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(SIMPLE_RUNBOOK).unwrap();

    runmark()
        .args(["show", file.path().to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"code\""))
        .stdout(predicate::str::contains("\"language\": \"sh\""));
}

#[test]
fn test_show_missing_file_fails() {
    runmark()
        .args(["show", "no-such-runbook.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_simple_runbook() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(SIMPLE_RUNBOOK).unwrap();

    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello"))
        .stdout(predicate::str::contains("1/1 cells succeeded"));
}

#[test]
fn test_run_saves_outputs_back() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(SIMPLE_RUNBOOK).unwrap();

    runmark().args(["run", file.path().to_str().unwrap()]).assert().success();

    let saved = std::fs::read_to_string(file.path()).unwrap();
    assert!(saved.contains("**Output:**"));
    assert!(saved.contains("hello"));
}

#[test]
fn test_run_no_save_leaves_file_untouched() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(SIMPLE_RUNBOOK).unwrap();

    runmark().args(["run", file.path().to_str().unwrap(), "--no-save"]).assert().success();

    let saved = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(saved, SIMPLE_RUNBOOK);
}

#[test]
fn test_run_var_seeds_the_store() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\necho {{greeting}} world\n```\n").unwrap();

    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save", "--var", "greeting=hi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi world"));
}

#[test]
fn test_run_unresolved_variable_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\necho {{ghost}}\n```\n").unwrap();

    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Variable 'ghost' not found"));
}

#[test]
fn test_run_failing_cell_sets_exit_code() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\nexit 9\n```\n\n```sh\necho survivor\n```\n").unwrap();

    // The failing cell poisons the exit code, but the document still ran.
    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("survivor"));
}

#[test]
fn test_run_single_cell() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\necho first\n```\n\n```sh\necho second\n```\n").unwrap();

    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save", "--cell", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("second"))
        .stdout(predicate::str::contains("first").not());
}

#[test]
fn test_run_cell_index_out_of_range() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(SIMPLE_RUNBOOK).unwrap();

    runmark()
        .args(["run", file.path().to_str().unwrap(), "--no-save", "--cell", "17"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_check_passes_with_table_variable() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(
        "## Variables\n\n| Name | Value |\n| --- | --- |\n| region | eu |\n\n```sh\necho {{region}}\n```\n",
    )
    .unwrap();

    runmark()
        .args(["check", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("All placeholders resolve"));
}

#[test]
fn test_check_accepts_forward_published_ids() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str(
        "```sh\n# @options {\"id\": \"build\"}\necho built\n```\n\n```sh\necho {{build}}\n```\n",
    )
    .unwrap();

    runmark().args(["check", file.path().to_str().unwrap()]).assert().success();
}

#[test]
fn test_check_reports_unresolved_placeholder() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\necho {{nowhere}}\n```\n").unwrap();

    runmark()
        .args(["check", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Variable 'nowhere' not found"))
        .stdout(predicate::str::contains("1 unresolved placeholder"));
}

// ============================================================================
// Clean Command Tests
// ============================================================================

#[test]
fn test_clean_strips_output_sections() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("book.md");
    file.write_str("```sh\necho hi\n```\n\n**Output:**\n```\nhi\n```\n").unwrap();

    runmark()
        .args(["clean", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed output sections"));

    let cleaned = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(cleaned, "```sh\necho hi\n```\n");
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    runmark()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runmark"));
}
