use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn write_rows(rows: &[[&str; 4]]) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(["invoice_id", "supplier_iban", "amount", "supplier_name"])
        .unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    file
}

#[test]
fn test_malformed_csv_handling() {
    let file = write_rows(&[
        // Valid
        ["INV-1", "DE89370400440532013000", "512.40", "Acme Industrial GmbH"],
        // Text in amount field
        ["INV-2", "DE89370400440532013000", "not_a_number", "Acme Industrial GmbH"],
        // Non-positive amount
        ["INV-3", "DE89370400440532013000", "0", "Acme Industrial GmbH"],
        // Valid again
        ["INV-4", "GB82WEST12345698765432", "77.10", "Widget Supplies Ltd"],
    ]);

    let mut cmd = Command::new(cargo_bin!("iban-guard"));
    cmd.arg(file.path()).env_remove("RUST_LOG");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN"))
        .stderr(predicate::str::contains("Error reading request"))
        .stdout(predicate::str::contains("INV-1,"))
        .stdout(predicate::str::contains("INV-4,"))
        .stdout(predicate::str::contains("INV-2,").not())
        .stdout(predicate::str::contains("INV-3,").not());
}

#[test]
fn test_invalid_request_fields_are_rejected() {
    let long_id = "X".repeat(51);
    let file = write_rows(&[
        ["INV-1", "DE89370400440532013000", "512.40", ""],
        [long_id.as_str(), "DE89370400440532013000", "512.40", "Acme Industrial GmbH"],
        ["INV-3", "DE89370400440532013000", "512.40", "Acme Industrial GmbH"],
    ]);

    let mut cmd = Command::new(cargo_bin!("iban-guard"));
    cmd.arg(file.path()).env_remove("RUST_LOG");

    cmd.assert()
        .success()
        .stderr(predicate::str::is_match(r"WARN .*Invalid request invoice_id=INV-1 ").unwrap())
        .stdout(predicate::str::contains("INV-3,"))
        .stdout(predicate::str::contains("INV-1,").not());
}

#[test]
fn test_garbage_iban_yields_block_row() {
    let file = write_rows(&[["INV-1", "not an iban at all", "512.40", "Acme Industrial GmbH"]]);

    let mut cmd = Command::new(cargo_bin!("iban-guard"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("INV-1,BLOCK,CRITICAL,"));
}
