// CLI tests for `stockmatch run`, `validate` and `key`.
//
// Fixtures are shared with the engine crate and staged into a temp dir per
// test so config-relative outputs never land in the source tree.
//
// Run with: cargo test -p stockmatch-cli --test recon_cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn stockmatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_stockmatch"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

/// Copy every fixture into a fresh temp dir.
fn stage() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.path().join(entry.file_name())).unwrap();
    }
    dir
}

fn run(args: &[&str]) -> Output {
    stockmatch().args(args).output().expect("spawn stockmatch")
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(out: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be valid JSON.\nParse error: {e}\nstdout:\n{trimmed}"))
}

// ===========================================================================
// stockmatch run
// ===========================================================================

#[test]
fn run_json_prints_one_report() {
    let dir = stage();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let out = run(&["run", path_str(&config), "--json"]);

    assert!(out.status.success(), "exit: {:?}\nstderr: {}", out.status, stderr(&out));

    let val = assert_single_json(&out);
    assert_eq!(val["meta"]["config_name"], "WooCommerce -> Shopify products");
    assert_eq!(val["summary"]["total"], 6);
    assert_eq!(val["summary"]["matched"], 4);
    assert_eq!(val["summary"]["invalid"], 1);
    assert_eq!(val["results"].as_array().unwrap().len(), 6);
    assert_eq!(val["results"][2]["step"], "handle");

    let err = stderr(&out);
    assert!(
        err.contains("recon 'WooCommerce -> Shopify products': 6 records, 4 matched (3 exact, 1 fuzzy)"),
        "stderr: {err}"
    );
    assert!(err.contains("sku=2"), "stderr: {err}");
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let dir = stage();
    let config = dir.path().join("images.recon.toml");
    let out = run(&["run", path_str(&config)]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(out.stdout.is_empty());
    assert!(stderr(&out).contains("75.0% coverage"));
}

#[test]
fn run_writes_report_and_merged_csv() {
    let dir = stage();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let report = dir.path().join("out/report.json");
    let merged = dir.path().join("merged.csv");
    std::fs::create_dir(dir.path().join("out")).unwrap();

    let out = run(&[
        "run",
        path_str(&config),
        "--output",
        path_str(&report),
        "--merged",
        path_str(&merged),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["summary"]["fuzzy"], 1);

    let text = std::fs::read_to_string(&merged).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("sku,post_title,slug"), "header: {header}");
    assert!(header.ends_with("match_identifier,match_strategy,match_step,match_score"));
    assert_eq!(text.lines().count(), 7);
}

#[test]
fn run_resolves_config_outputs_from_config_dir() {
    let dir = stage();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let mut toml = std::fs::read_to_string(&config).unwrap();
    toml.push_str("json = \"report.json\"\nmerged_csv = \"merged.csv\"\n");
    std::fs::write(&config, toml).unwrap();

    let out = run(&["run", path_str(&config)]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(dir.path().join("report.json").is_file());
    assert!(dir.path().join("merged.csv").is_file());
}

#[test]
fn run_fail_on_unmatched_exits_62() {
    let dir = stage();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let out = run(&["run", path_str(&config), "--json", "--fail-on-unmatched"]);

    assert_eq!(out.status.code(), Some(62), "stderr: {}", stderr(&out));
    // The report is still printed before the exit code is decided.
    let val = assert_single_json(&out);
    assert_eq!(val["summary"]["unmatched"], 1);
    assert!(stderr(&out).contains("error: 2 source record(s) without a match"));
}

#[test]
fn run_missing_input_exits_61() {
    let dir = stage();
    std::fs::remove_file(dir.path().join("shopify_products.csv")).unwrap();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let out = run(&["run", path_str(&config)]);

    assert_eq!(out.status.code(), Some(61));
    assert!(stderr(&out).contains("cannot read"));
    assert!(stderr(&out).contains("shopify_products.csv"));
}

#[test]
fn run_missing_column_exits_61_with_hint() {
    let dir = stage();
    let config = dir.path().join("woo-to-shopify.recon.toml");
    let toml = std::fs::read_to_string(&config)
        .unwrap()
        .replace("\"post_title\"", "\"Post Title\"");
    std::fs::write(&config, toml).unwrap();

    let out = run(&["run", path_str(&config)]);
    assert_eq!(out.status.code(), Some(61));
    let err = stderr(&out);
    assert!(err.contains("error: role 'source': missing column 'Post Title'"), "stderr: {err}");
    assert!(err.contains("hint:"));
}

#[test]
fn run_missing_config_is_usage_error() {
    let out = run(&["run", "does/not/exist.recon.toml"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("config file not found"));
}

// ===========================================================================
// stockmatch validate
// ===========================================================================

#[test]
fn validate_lists_steps() {
    let config = fixtures_dir().join("woo-to-shopify.recon.toml");
    let out = run(&["validate", path_str(&config)]);

    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("valid: recon 'WooCommerce -> Shopify products' with 3 step(s)"), "stderr: {err}");
    assert!(err.contains("sku, handle, title (fuzzy >= 0.5)"));
}

#[test]
fn validate_rejects_fuzzy_before_exact() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.recon.toml");
    std::fs::write(
        &config,
        r#"
name = "bad order"

[source]
file = "woo.csv"
[source.columns]
identifier = "sku"

[candidates]
file = "shopify.csv"
[candidates.columns]
identifier = "Variant SKU"

[[strategy]]
name = "title"
kind = "fuzzy"

[[strategy]]
name = "sku"
kind = "exact"
source_key = "identifier"
candidate_key = "identifier"
"#,
    )
    .unwrap();

    let out = run(&["validate", path_str(&config)]);
    assert_eq!(out.status.code(), Some(60));
    let err = stderr(&out);
    assert!(err.contains("must be the last step"), "stderr: {err}");
    assert!(err.contains("hint:  move the fuzzy [[strategy]] to the end"));
}

#[test]
fn validate_rejects_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("broken.recon.toml");
    std::fs::write(&config, "name = \n").unwrap();

    let out = run(&["validate", path_str(&config)]);
    assert_eq!(out.status.code(), Some(60));
    assert!(stderr(&out).contains("config parse error"));
}

// ===========================================================================
// stockmatch key
// ===========================================================================

#[test]
fn key_prints_one_line_per_input() {
    let out = run(&["key", "HMH-100", "hmh 100", "***"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hmh100\nhmh100\n\n");
}

#[test]
fn key_tokens_are_tab_separated() {
    let out = run(&["key", "--tokens", "The Big Bud Booster"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "thebigbudbooster\tbig booster bud\n");
}

#[test]
fn key_filename_json() {
    let out = run(&["key", "--filename", "--json", "https://cdn.test/coco-bulk-600x600.jpg?v=2"]);
    assert!(out.status.success());
    let val = assert_single_json(&out);
    assert_eq!(val[0]["stem"], "coco-bulk");
    assert_eq!(val[0]["key"], "cocobulk");
    assert!(val[0].get("tokens").is_none());
}

#[test]
fn key_requires_text() {
    let out = run(&["key"]);
    assert_eq!(out.status.code(), Some(2));
}
