use assert_cmd::Command;
use predicates::prelude::*;

fn sccoc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sccoc"))
}

#[test]
fn test_help_command() {
    sccoc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("security context constraint"))
        .stdout(predicate::str::contains("--image"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--admit"));
}

#[test]
fn test_version_command() {
    sccoc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sccoc"));
}

#[test]
fn test_invalid_scc() {
    sccoc()
        .arg("--dry-run")
        .arg("bogus")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "\"bogus\" is not a valid scc. Must choose one of these:",
        ))
        .stdout(predicate::str::contains(" - privileged\n"))
        .stdout(predicate::str::contains(" - restricted\n"))
        .stdout(predicate::str::contains(" - hostnetwork\n"));
}

#[test]
fn test_dry_run_default_restricted() {
    sccoc()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using \"restricted\" scc..."))
        .stdout(predicate::str::contains("1000100000"))
        .stdout(predicate::str::contains("s9:z0,z1"))
        .stdout(predicate::str::contains("MKNOD"));
}

#[test]
fn test_dry_run_last_scc_wins() {
    sccoc()
        .args(["--dry-run", "restricted", "anyuid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using \"anyuid\" scc..."));
}

#[test]
fn test_dry_run_json() {
    let output = sccoc()
        .args(["--dry-run", "--output", "json", "privileged", "--", "id", "-u"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["scc"], "privileged");
    assert_eq!(report["runSpec"]["command"], serde_json::json!(["id", "-u"]));
    assert_eq!(report["runSpec"]["privileged"], false);
    assert!(report.get("exitCode").is_none());
}

#[test]
fn test_dry_run_admission() {
    sccoc()
        .args(["--dry-run", "--admit", "--group", "system:cluster-admins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using \"anyuid\" scc..."));
}

#[test]
fn test_dry_run_admission_prefers_named() {
    sccoc()
        .args(["--dry-run", "--admit", "hostnetwork"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using \"hostnetwork\" scc..."));
}

#[test]
fn test_dry_run_admission_without_anyuid() {
    sccoc()
        .args([
            "--dry-run",
            "--admit",
            "--group",
            "system:cluster-admins",
            "restricted",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using \"privileged\" scc..."));
}

#[test]
fn test_dry_run_admission_unknown_name() {
    sccoc()
        .args(["--dry-run", "--admit", "bogus"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"bogus\" is not a valid scc."));
}

#[test]
fn test_dry_run_export() {
    let dir = tempfile::tempdir().unwrap();
    sccoc()
        .args(["--dry-run", "--export"])
        .arg(dir.path())
        .arg("anyuid")
        .assert()
        .success();

    let manifest = std::fs::read_to_string(dir.path().join("tmp.yaml")).unwrap();
    assert!(manifest.contains("kind: Pod"));
    assert!(manifest.contains("automountServiceAccountToken: false"));
}

#[test]
fn test_invalid_allocation() {
    sccoc()
        .args(["--dry-run", "--uid-range", "bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid namespace allocation"));
}
