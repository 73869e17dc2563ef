use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> String {
    format!("tests/fixtures/{}", name)
}

/// Helper to create a Command for the etl binary
#[allow(deprecated)]
fn etl() -> Command {
    Command::cargo_bin("etl").expect("Failed to find etl binary")
}

/// `run` command pinned to a processing date and a temporary output root
fn run_cmd(output: &TempDir) -> Command {
    let mut cmd = etl();
    cmd.arg("run")
        .arg("--config")
        .arg(fixture_path("config.yaml"))
        .arg("--output-dir")
        .arg(output.path())
        .arg("--processing-date")
        .arg("2024-06-15");
    cmd
}

// ============================================================================
// run command tests
// ============================================================================

#[test]
fn test_run_single_entity() {
    let output = TempDir::new().unwrap();

    run_cmd(&output)
        .arg("employees")
        .assert()
        .success()
        .stdout(predicate::str::contains("employees"))
        .stdout(predicate::str::contains("Run DONE"))
        .stdout(predicate::str::contains("Total rows processed:       12"))
        .stdout(predicate::str::contains("Rows after deduplication:   9"))
        .stdout(predicate::str::contains("headcount_by_company (table): 4 rows"))
        .stdout(predicate::str::contains("all_employees (view): 9 rows"));

    let export = output.path().join("exports").join("headcount_by_company.csv");
    let content = fs::read_to_string(export).unwrap();
    assert!(content.starts_with("company_id,total"));
    assert!(!output.path().join("exports").join("all_employees.csv").exists());

    let errors = output.path().join("errors");
    assert!(errors.join("employees_schema_validation_errors.csv").exists());
    assert!(errors.join("employees_custom_age_gte_errors.csv").exists());
    assert!(errors.join("employees_duplicates_errors.csv").exists());
}

#[test]
fn test_run_json_output() {
    let output = TempDir::new().unwrap();

    let assert = run_cmd(&output)
        .arg("employees")
        .arg("--format")
        .arg("json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["entity"], "employees");
    assert_eq!(summary["state"], "done");
    assert_eq!(summary["rows_processed"], 12);
    assert_eq!(summary["rows_valid"], 10);
    assert_eq!(summary["duplicates_removed"], 1);
    assert_eq!(summary["rows_deduplicated"], 9);
}

#[test]
fn test_run_stop_mode_exits_with_failure() {
    let output = TempDir::new().unwrap();

    run_cmd(&output)
        .arg("strict_employees")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Run FAILED"))
        .stdout(predicate::str::contains("row 7"));

    let custom = output
        .path()
        .join("errors")
        .join("strict_employees_custom_age_gte_errors.csv");
    assert!(custom.exists());
}

#[test]
fn test_run_all_reports_every_entity() {
    let output = TempDir::new().unwrap();

    let assert = run_cmd(&output)
        .arg("--all")
        .arg("--format")
        .arg("json")
        .assert()
        .failure()
        .code(1);

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let summaries: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summaries[0]["entity"], "employees");
    assert_eq!(summaries[0]["state"], "done");
    assert_eq!(summaries[1]["entity"], "strict_employees");
    assert_eq!(summaries[1]["state"], "failed");
}

#[test]
fn test_run_requires_entity_or_all() {
    etl()
        .arg("run")
        .arg("--config")
        .arg(fixture_path("config.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_run_unknown_entity() {
    let output = TempDir::new().unwrap();

    run_cmd(&output)
        .arg("contractors")
        .assert()
        .failure()
        .stdout(predicate::str::contains("contractors"))
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn test_run_toml_config() {
    let output = TempDir::new().unwrap();

    etl()
        .arg("run")
        .arg("employees")
        .arg("--config")
        .arg(fixture_path("config.toml"))
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("company_10 (table): 3 rows"));

    let export = output.path().join("exports").join("company_10.csv");
    assert_eq!(
        fs::read_to_string(export).unwrap(),
        "employee_id,name\n1,Ana\n2,Ben\n9,Ivy\n"
    );
}

#[test]
fn test_run_missing_config() {
    etl()
        .arg("run")
        .arg("employees")
        .arg("--config")
        .arg(fixture_path("nonexistent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration file"));
}

// ============================================================================
// check command tests
// ============================================================================

#[test]
fn test_check_valid_config() {
    etl()
        .arg("check")
        .arg("--config")
        .arg(fixture_path("config.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Entity 'employees' is valid"))
        .stdout(predicate::str::contains("Entity 'strict_employees' is valid"))
        .stdout(predicate::str::contains("employee_id: int, required"))
        .stdout(predicate::str::contains("age_gte on birthday_on"))
        .stdout(predicate::str::contains("headcount_by_company (table)"));
}

#[test]
fn test_check_single_entity_json() {
    let assert = etl()
        .arg("check")
        .arg("employees")
        .arg("--config")
        .arg(fixture_path("config.yaml"))
        .arg("--format")
        .arg("json")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let reports: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(reports.as_array().unwrap().len(), 1);
    assert_eq!(reports[0]["entity"], "employees");
    assert_eq!(reports[0]["duplicate_resolution"], "last");
    assert_eq!(reports[0]["projections"][1]["type"], "view");
}

#[test]
fn test_check_invalid_config() {
    etl()
        .arg("check")
        .arg("--config")
        .arg(fixture_path("invalid_config.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("newest"));
}

#[test]
fn test_check_does_not_read_sources() {
    let dir = TempDir::new().unwrap();
    let config = fs::read_to_string(fixture_path("config.yaml")).unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, config).unwrap();

    etl()
        .arg("check")
        .arg("--config")
        .arg(&path)
        .assert()
        .success();
}

// ============================================================================
// general CLI tests
// ============================================================================

#[test]
fn test_help() {
    etl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version() {
    etl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("etl"));
}
