//! E2E tests for the residency CLI

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = run(args);
    assert!(output.status.success(), "Command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

/// Leaver with two ties in the 91-120 band is resident
#[test]
fn srt_sufficient_ties() {
    let output = run(&["srt", "tests/data/srt_leaver.json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("STATUTORY RESIDENCE TEST (2024/25)"));
    assert!(stdout.contains("UK resident (Sufficient ties)"));
    assert!(stdout.contains("family"));
    assert!(stdout.contains("accommodation"));
}

#[test]
fn srt_json_automatic_overseas() {
    let json = run_json(&["srt", "tests/data/srt_arriver.json", "--json"]);

    assert_eq!(json["tax_resident"], false);
    assert_eq!(json["test_result"], "automatic_overseas");
    assert_eq!(json["rule"]["rule"], "arriver_presence");
    assert_eq!(json["tie_count"], 0);
}

#[test]
fn presence_five_year_average() {
    let json = run_json(&["presence", "tests/data/presence.json", "--json"]);

    assert_eq!(json["tax_resident"], true);
    assert_eq!(json["test_result"], "5_year_average");
    let average = json["five_year_average"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok());
    assert_eq!(average, Some(194.0));
    assert_eq!(json["provisional"], false);
}

#[test]
fn presence_without_prior_years_is_provisional() {
    let output = run(&["presence", "tests/data/presence_current_only.json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("SA resident (91 days (current year only))"));
    assert!(stdout.contains("Provisional"));
}

/// Same history as JSON and CSV gives the same answer
#[test]
fn domicile_from_json_and_csv() {
    for history in ["tests/data/history.json", "tests/data/history.csv"] {
        let json = run_json(&[
            "domicile",
            "--history",
            history,
            "--user",
            "u1",
            "--as-of",
            "2025-06-01",
            "--json",
        ]);
        assert_eq!(json["is_deemed_domiciled"], true, "{}", history);
        assert_eq!(json["uk_resident_years"], 16, "{}", history);
        assert_eq!(json["trigger"], "long_term_residence", "{}", history);
    }
}

#[test]
fn domicile_short_residence_not_deemed() {
    let output = run(&[
        "domicile",
        "--history",
        "tests/data/history.json",
        "--user",
        "u2",
        "--as-of",
        "2025-06-01",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Not deemed domiciled"));
    assert!(stdout.contains("UK resident in 7 of the last 20 UK tax years, 15 needed"));
}

#[test]
fn domicile_rejects_overlapping_history() {
    let output = run(&[
        "domicile",
        "--history",
        "tests/data/overlapping_history.json",
        "--user",
        "u1",
        "--as-of",
        "2025-06-01",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("inconsistent"));
}

#[test]
fn relief_dividends_treaty_rate() {
    let json = run_json(&[
        "relief",
        "dividends",
        "--amount",
        "10000",
        "--source",
        "SA",
        "--residence",
        "UK",
        "--json",
    ]);

    assert_eq!(json["taxing_country"], "UK");
    assert_eq!(json["withholding_tax"], "1500.00");
    assert_eq!(json["relief_amount"], "1500.00");
}

#[test]
fn relief_dividends_rules_override() {
    let output = run(&[
        "relief",
        "dividends",
        "--amount",
        "10000",
        "--source",
        "SA",
        "--residence",
        "UK",
        "--rules",
        "tests/data/rules_withholding_20.json",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("2000.00"));
}

#[test]
fn relief_gains_property_needs_location() {
    let output = run(&[
        "relief",
        "gains",
        "--gain",
        "50000",
        "--category",
        "immovable_property",
        "--residence",
        "UK",
    ]);

    assert!(!output.status.success());
}

#[test]
fn tie_breaker_permanent_home() {
    let json = run_json(&[
        "tie-breaker",
        "--sa-home",
        "--nationality",
        "UK",
        "--json",
    ]);

    assert_eq!(json["sole_residence"], "SA");
    assert_eq!(json["test_applied"], "Permanent home");
}

#[test]
fn tie_breaker_mutual_agreement() {
    let output = run(&["tie-breaker", "--nationality", "BOTH"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("Undetermined (Mutual agreement procedure)"));
}

#[test]
fn assess_dual_resident_with_history() {
    let json = run_json(&[
        "assess",
        "tests/data/profile.json",
        "--history",
        "tests/data/history.json",
        "--json",
    ]);

    assert_eq!(json["tax_year"], 2025);
    assert_eq!(json["uk"]["tax_resident"], true);
    assert_eq!(json["sa"]["tax_resident"], true);
    assert_eq!(json["dual_resident"], true);
    assert_eq!(json["tie_breaker"]["sole_residence"], "UK");
    assert_eq!(json["deemed_domicile"]["is_deemed_domiciled"], true);
    assert_eq!(json["uk_domicile_status"], "DEEMED_DOMICILE");
}

#[test]
fn assess_save_upserts() {
    let path = std::env::temp_dir().join(format!("residency-cli-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let save = path.to_str().expect("temp path is UTF-8");

    for expected in ["Saved assessment for u1", "Replaced assessment for u1"] {
        let output = run(&["assess", "tests/data/profile.json", "--save", save]);
        assert!(output.status.success(), "Command failed: {:?}", output);
        assert!(String::from_utf8_lossy(&output.stdout).contains(expected));
    }

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("results file written"))
            .expect("results file is JSON");
    assert_eq!(stored["results"].as_array().map(Vec::len), Some(1));
    assert_eq!(stored["results"][0]["user_id"], "u1");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn schema_history_csv_header() {
    let output = run(&["schema", "history-csv-header"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.starts_with("user_id,effective_from,effective_to"));
}

#[test]
fn rules_prints_defaults() {
    let json = run_json(&["rules"]);

    assert_eq!(json["presence"]["five_year_total_days"], 915);
    assert_eq!(json["domicile"]["qualifying_years"], 15);
}

#[test]
fn rules_file_with_zero_qualifying_years_rejected() {
    let output = run(&[
        "domicile",
        "--history",
        "tests/data/history.json",
        "--user",
        "u1",
        "--as-of",
        "2025-06-01",
        "--rules",
        "tests/data/rules_invalid.json",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("domicile.qualifying_years"));
}

#[test]
fn assess_rejects_mismatched_tax_years() {
    let output = run(&["assess", "tests/data/profile_mismatched_years.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("does not match UK tax year"));
}
