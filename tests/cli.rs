mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::str::contains;
use sheet_capture::{WorkbookCapture, schema::WorkbookSchema};

fn sheet_capture() -> Command {
    Command::cargo_bin("sheet-capture").expect("binary exists")
}

#[test]
fn capture_writes_workbook_json() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("workbook.json");
    let contacts = fixture_path("contacts.csv");
    let ragged = fixture_path("ragged.csv");

    sheet_capture()
        .args([
            "capture",
            "-i",
            contacts.to_str().unwrap(),
            "-i",
            ragged.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--pretty",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&output).expect("read workbook");
    let workbook: WorkbookCapture = serde_json::from_str(&contents).expect("parse workbook");
    assert_eq!(workbook.sheet_names(), vec!["contacts", "ragged"]);
    let contacts = workbook.get("contacts").expect("contacts sheet");
    assert_eq!(contacts.headers, vec!["Name", "Email", "Age"]);
    assert_eq!(contacts.record_count(), 2);
    assert!(contents.contains("\"required\""));
    assert!(contents.contains("\"rowShapeMismatch\""));
}

#[test]
fn capture_to_stdout_with_explicit_headers() {
    let ragged = fixture_path("ragged.csv");
    sheet_capture()
        .args([
            "capture",
            "-i",
            ragged.to_str().unwrap(),
            "--headers",
            "key,who,where",
            "--skip",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("\"headers\":[\"key\",\"who\",\"where\"]"))
        .stdout(contains("\"value\":\"Alice\""));
}

#[test]
fn capture_reads_stdin() {
    sheet_capture()
        .args(["capture", "-i", "-"])
        .write_stdin("code,label\nA1,first\n")
        .assert()
        .success()
        .stdout(contains("\"Sheet1\""))
        .stdout(contains("\"code\",\"label\""));
}

#[test]
fn detect_reports_sub_header_rows() {
    let grouped = fixture_path("grouped_headers.csv");
    sheet_capture()
        .args([
            "detect",
            "-i",
            grouped.to_str().unwrap(),
            "--algorithm",
            "data-row-and-sub-header",
        ])
        .assert()
        .success()
        .stdout(contains("header_rows=[0, 1] skip=2"))
        .stdout(contains("Person"))
        .stdout(contains("Rank"));
}

#[test]
fn detect_flags_ambiguous_documents() {
    let numbers = fixture_path("numbers_only.csv");
    sheet_capture()
        .args(["detect", "-i", numbers.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("(ambiguous)"));
}

#[test]
fn preview_renders_cascaded_rows() {
    let invoices = fixture_path("invoices.csv");
    sheet_capture()
        .args([
            "preview",
            "-i",
            invoices.to_str().unwrap(),
            "--cascade-rows",
            "--rows",
            "3",
        ])
        .assert()
        .success()
        .stdout(contains("== invoices (3 of 5 record(s)) =="))
        .stdout(contains("INV-1    Acme      Paper"));
}

#[test]
fn schema_projection_saves_yaml() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("contacts-schema.yml");
    let contacts = fixture_path("contacts.csv");

    sheet_capture()
        .args([
            "schema",
            "-i",
            contacts.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let schema = WorkbookSchema::load(&output).expect("load schema");
    let sheet = schema.sheet("contacts").expect("contacts schema");
    assert_eq!(sheet.required_keys(), vec!["Email"]);
    assert_eq!(sheet.fields.len(), 3);
}

#[test]
fn options_file_drives_detection() {
    let workspace = TestWorkspace::new();
    let options = workspace.write(
        "options.yml",
        "detection:\n  algorithm: specificRows\n  rows: [0]\ntrackMetadata: true\n",
    );
    let ragged = fixture_path("ragged.csv");
    sheet_capture()
        .args([
            "capture",
            "-i",
            ragged.to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("\"rowHeaders\":[0]"));
}

#[test]
fn strict_mode_fails_on_ragged_rows() {
    let ragged = fixture_path("ragged.csv");
    sheet_capture()
        .args(["capture", "-i", ragged.to_str().unwrap(), "--strict"])
        .assert()
        .failure()
        .stderr(contains("Row 2 has 2 cell(s)"));
}

#[test]
fn reject_ambiguous_fails_on_numeric_documents() {
    let numbers = fixture_path("numbers_only.csv");
    sheet_capture()
        .args(["capture", "-i", numbers.to_str().unwrap(), "--reject-ambiguous"])
        .assert()
        .failure()
        .stderr(contains("No header-like row"));
}

#[test]
fn invalid_configuration_is_reported() {
    let contacts = fixture_path("contacts.csv");
    sheet_capture()
        .args(["capture", "-i", contacts.to_str().unwrap(), "--text-ratio", "1.5"])
        .assert()
        .failure()
        .stderr(contains("Invalid capture configuration"));
}

#[test]
fn rows_to_search_alone_is_validated_and_applied() {
    let contacts = fixture_path("contacts.csv");
    sheet_capture()
        .args(["detect", "-i", contacts.to_str().unwrap(), "--rows-to-search", "0"])
        .assert()
        .failure()
        .stderr(contains("rowsToSearch"));

    sheet_capture()
        .args(["detect", "-i", contacts.to_str().unwrap(), "--rows-to-search", "1"])
        .assert()
        .success()
        .stdout(contains("header_rows=[0] skip=1 scanned=1 (ambiguous)"));
}

#[test]
fn skip_requires_a_label_algorithm() {
    let contacts = fixture_path("contacts.csv");
    sheet_capture()
        .args(["capture", "-i", contacts.to_str().unwrap(), "--skip", "2"])
        .assert()
        .failure()
        .stderr(contains("--skip only applies"));
}

#[test]
fn oversized_input_is_rejected_with_a_hint() {
    let contacts = fixture_path("contacts.csv");
    sheet_capture()
        .args([
            "capture",
            "-i",
            contacts.to_str().unwrap(),
            "--max-input-bytes",
            "10",
        ])
        .assert()
        .failure()
        .stderr(contains("exceeds the maximum supported text length"))
        .stderr(contains("CSV/TSV"));
}

#[test]
fn missing_input_file_fails() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("missing.csv");
    sheet_capture()
        .args(["capture", "-i", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("missing.csv"));
}
