//! Integration tests for the AIT CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REGISTER_CSV: &str = "Codigo,Nombre del Bien,Familia,Fecha\n\
abc-1,Silla,Muebles,05/03/2024\n\
ABC-1 ,Mesa,Muebles,\n\
B-2,Lámpara,Iluminación,2024-01-10\n";

/// Helper to get an ait command isolated from the user's config and env
fn ait(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ait").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env_remove("AIT_BACKEND")
        .env_remove("AIT_DATABASE")
        .env_remove("AIT_ACTOR")
        .env_remove("PG_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a workspace in a temp directory
fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    ait(&tmp).arg("init").assert().success();
    tmp
}

/// Helper to create a workspace with the sample register imported
fn setup_with_register() -> TempDir {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("register.csv"), REGISTER_CSV).unwrap();
    ait(&tmp).args(["import", "register.csv"]).assert().success();
    tmp
}

/// Workbook with a summary sheet first and the register on "Bienes"
fn write_register_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let date = Format::new().set_num_format("dd/mm/yyyy");

    let summary = workbook.add_worksheet();
    summary.set_name("Resumen").unwrap();
    summary.write_string(0, 0, "Total").unwrap();
    summary.write_number(0, 1, 2.0).unwrap();

    let register = workbook.add_worksheet();
    register.set_name("Bienes").unwrap();
    for (col, header) in ["Codigo", "Nombre del Bien", "Fecha", "Valor sin iva"]
        .into_iter()
        .enumerate()
    {
        register.write_string(0, col as u16, header).unwrap();
    }
    register.write_string(1, 0, "xl-1").unwrap();
    register.write_string(1, 1, "CAMIÓN GRÚA").unwrap();
    // 2024-03-05 as an Excel serial date
    register.write_number_with_format(1, 2, 45356.0, &date).unwrap();
    register.write_number(1, 3, 1234.5).unwrap();
    register.write_number(2, 0, 4521.0).unwrap();
    register.write_string(2, 1, "Silla").unwrap();

    workbook.save(path).unwrap();
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Basic commands
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    ait(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asset Inventory Toolkit"));

    ait(&tmp)
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asset Inventory Toolkit"));
}

#[test]
fn test_completions_generate() {
    let tmp = TempDir::new().unwrap();
    ait(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ait"));
}

#[test]
fn test_init_creates_workspace_and_registry() {
    let tmp = TempDir::new().unwrap();
    ait(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized inventory workspace"));

    assert!(tmp.path().join(".ait/config.yaml").is_file());
    assert!(tmp.path().join(".ait/inventory.db").is_file());
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup_workspace();
    ait(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    ait(&tmp)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no workspace found"));
}

#[test]
fn test_database_flag_overrides_workspace() {
    let tmp = TempDir::new().unwrap();
    let out = json_output(ait(&tmp).args(["--database", "sqlite:other.db", "stats", "--format", "json"]));
    assert_eq!(out["total"], 0);
    assert!(tmp.path().join("other.db").is_file());
}

// ============================================================================
// Import
// ============================================================================

#[test]
fn test_import_collapses_case_variants() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("register.csv"), REGISTER_CSV).unwrap();

    let report = json_output(ait(&tmp).args(["import", "register.csv", "--format", "json"]));
    assert_eq!(report["rows_read"], 3);
    assert_eq!(report["accepted"], 2);
    assert_eq!(report["dropped_duplicates"], 1);

    let again = json_output(ait(&tmp).args(["import", "register.csv", "--format", "json"]));
    assert_eq!(again["accepted"], 0);
    assert_eq!(again["ignored_existing"], 2);
}

#[test]
fn test_import_prints_summary() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("register.csv"), REGISTER_CSV).unwrap();
    ait(&tmp)
        .args(["import", "register.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Import Summary"))
        .stdout(predicate::str::contains("Duplicate rows"));
}

#[test]
fn test_import_dry_run_writes_nothing() {
    let tmp = setup_workspace();
    fs::write(tmp.path().join("register.csv"), REGISTER_CSV).unwrap();

    let report = json_output(ait(&tmp).args(["import", "register.csv", "--dry-run", "--format", "json"]));
    assert_eq!(report["accepted"], 2);
    assert_eq!(report["dry_run"], true);

    let stats = json_output(ait(&tmp).args(["stats", "--format", "json"]));
    assert_eq!(stats["total"], 0);
}

#[test]
fn test_import_semicolon_file() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("register.csv"),
        "Codigo;Nombre del Bien;Valor sin iva\nq-1;Proyector;1234,5\n",
    )
    .unwrap();
    ait(&tmp).args(["import", "register.csv"]).assert().success();

    let record = json_output(ait(&tmp).args(["show", "q-1", "--format", "json"]));
    assert_eq!(record["name"], "Proyector");
    assert_eq!(record["value_net"], 1234.5);
}

#[test]
fn test_import_missing_identity_column_fails() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("bad.csv"),
        "Nombre del Bien,Familia\nSilla,Muebles\n",
    )
    .unwrap();

    ait(&tmp)
        .args(["import", "bad.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("identity column missing"));

    let stats = json_output(ait(&tmp).args(["stats", "--format", "json"]));
    assert_eq!(stats["total"], 0);
}

#[test]
fn test_import_workbook_sheet() {
    let tmp = setup_workspace();
    write_register_workbook(&tmp.path().join("register.xlsx"));

    let report = json_output(ait(&tmp).args([
        "import",
        "register.xlsx",
        "--sheet",
        "Bienes",
        "--format",
        "json",
    ]));
    assert_eq!(report["accepted"], 2);

    let record = json_output(ait(&tmp).args(["show", "xl-1", "--format", "json"]));
    assert_eq!(record["name"], "CAMIÓN GRÚA");
    assert_eq!(record["acquired_on"], "2024-03-05");
    assert_eq!(record["value_net"], 1234.5);

    let numeric = json_output(ait(&tmp).args(["show", "4521", "--format", "json"]));
    assert_eq!(numeric["name"], "Silla");

    ait(&tmp)
        .args(["list", "--search", "camión", "--format", "id"])
        .assert()
        .success()
        .stdout("XL-1\n");
}

#[test]
fn test_import_workbook_defaults_to_first_sheet() {
    let tmp = setup_workspace();
    write_register_workbook(&tmp.path().join("register.xlsx"));

    // "Resumen" has no Codigo column
    ait(&tmp)
        .args(["import", "register.xlsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Codigo"));
}

#[test]
fn test_import_workbook_unknown_sheet_fails() {
    let tmp = setup_workspace();
    write_register_workbook(&tmp.path().join("register.xlsx"));

    ait(&tmp)
        .args(["import", "register.xlsx", "--sheet", "Hoja9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hoja9"));
}

#[test]
fn test_import_missing_file_fails() {
    let tmp = setup_workspace();
    ait(&tmp)
        .args(["import", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

// ============================================================================
// Lookup and verification
// ============================================================================

#[test]
fn test_show_normalizes_code() {
    let tmp = setup_with_register();
    let record = json_output(ait(&tmp).args(["show", "  abc-1 ", "--format", "json"]));
    assert_eq!(record["code"], "ABC-1");
    assert_eq!(record["name"], "Silla");
    assert_eq!(record["acquired_on"], "2024-03-05");
    assert_eq!(record["verified"], false);
}

#[test]
fn test_show_unknown_code_fails() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));
}

#[test]
fn test_verify_records_actor_and_counts() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["verify", "abc-1", "--by", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Verified"));

    let record = json_output(ait(&tmp).args(["show", "ABC-1", "--format", "json"]));
    assert_eq!(record["verified"], true);
    assert_eq!(record["verified_by"], "ana");
    assert_eq!(record["is_new"], false);
    assert!(record["verified_at"].as_str().is_some_and(|d| d.len() == 10));

    let stats = json_output(ait(&tmp).args(["stats", "--format", "json"]));
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["verified"], 1);
    assert_eq!(stats["pending"], 1);
}

#[test]
fn test_verify_unknown_code_fails() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["verify", "zz-404"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));
}

#[test]
fn test_verify_uses_configured_actor() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["verify", "b-2"])
        .env("AIT_ACTOR", "luis")
        .assert()
        .success();

    let record = json_output(ait(&tmp).args(["show", "b-2", "--format", "json"]));
    assert_eq!(record["verified_by"], "luis");
}

// ============================================================================
// Registering scanned codes and listing
// ============================================================================

#[test]
fn test_add_never_overwrites() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["add", "zz-9", "--name", "Lámpara de pie", "--facility", "Bodega"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered"));

    ait(&tmp)
        .args(["add", "ZZ-9", "--name", "Otra cosa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already registered"));

    ait(&tmp)
        .args(["add", "abc-1", "--name", "Otra cosa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already registered"));

    let record = json_output(ait(&tmp).args(["show", "zz-9", "--format", "json"]));
    assert_eq!(record["name"], "Lámpara de pie");
    assert_eq!(record["is_new"], true);

    let original = json_output(ait(&tmp).args(["show", "abc-1", "--format", "json"]));
    assert_eq!(original["name"], "Silla");
}

#[test]
fn test_list_orders_new_then_verified() {
    let tmp = setup_with_register();
    ait(&tmp).args(["add", "zz-9"]).assert().success();
    ait(&tmp).args(["verify", "b-2"]).assert().success();

    ait(&tmp)
        .args(["list", "--format", "id"])
        .assert()
        .success()
        .stdout("ZZ-9\nB-2\nABC-1\n");

    ait(&tmp)
        .args(["list", "--status", "unverified", "--format", "id"])
        .assert()
        .success()
        .stdout("ZZ-9\nABC-1\n");
}

#[test]
fn test_list_search_matches_name() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["list", "--search", "LÁMP", "--format", "id"])
        .assert()
        .success()
        .stdout("B-2\n");

    ait(&tmp)
        .args(["list", "--search", "%", "--format", "id"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_list_table_output() {
    let tmp = setup_with_register();
    ait(&tmp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ABC-1"))
        .stdout(predicate::str::contains("2 asset(s) found"));
}

// ============================================================================
// Migration
// ============================================================================

#[test]
fn test_migrate_into_another_sqlite_file() {
    let tmp = setup_with_register();
    ait(&tmp).args(["verify", "abc-1", "--by", "ana"]).assert().success();

    let report = json_output(ait(&tmp).args(["migrate", "--to", "sqlite:copy.db", "--yes", "--format", "json"]));
    assert_eq!(report["read"], 2);
    assert_eq!(report["written"], 2);

    let record = json_output(ait(&tmp).args([
        "--database",
        "sqlite:copy.db",
        "show",
        "abc-1",
        "--format",
        "json",
    ]));
    assert_eq!(record["verified"], true);
    assert_eq!(record["verified_by"], "ana");
    assert_eq!(record["name"], "Silla");
}

#[test]
fn test_migrate_dry_run_leaves_target_empty() {
    let tmp = setup_with_register();
    let report = json_output(ait(&tmp).args(["migrate", "--to", "copy.db", "--dry-run", "--format", "json"]));
    assert_eq!(report["written"], 2);
    assert_eq!(report["dry_run"], true);

    let stats = json_output(ait(&tmp).args(["--database", "copy.db", "stats", "--format", "json"]));
    assert_eq!(stats["total"], 0);
}

#[test]
fn test_migrate_from_missing_file_creates_nothing() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["migrate", "--from", "sqlite:typo/typo.db", "--to", "copy.db", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry file not found"));

    assert!(!tmp.path().join("typo").exists());
    assert!(!tmp.path().join("typo").join("typo.db").exists());
}

#[test]
fn test_migrate_without_postgres_settings_fails() {
    let tmp = setup_with_register();
    ait(&tmp)
        .args(["migrate", "--yes"])
        .env_remove("PG_HOST")
        .env_remove("PG_PORT")
        .env_remove("PG_DB")
        .env_remove("PG_USER")
        .env_remove("PG_PASSWORD")
        .env_remove("PG_SSLMODE")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PG_HOST"));
}
