//! CLI integration tests: drive the compiled `cdes` binary end-to-end
//! against the bundled dataset.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cdes_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cdes");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));

    let config_content = format!(
        r#"[data]
schema_dir = "{root}/data/schemas/v1"

[data.reference]
terpene = "{root}/data/reference/terpenes"
cannabinoid = "{root}/data/reference/cannabinoids"
color = "{root}/data/reference/colors"

[server]
bind = "127.0.0.1:0"
"#,
        root = root.display()
    );

    let config_path = tmp.path().join("cdes.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cdes(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cdes_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cdes binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_schemas_lists_the_catalogue() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cdes(&config_path, &["schemas"]);
    assert!(success, "schemas failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("7 schema(s) loaded"));
    assert!(stdout.contains("strain"));
    assert!(stdout.contains("Certificate of Analysis"));
}

#[test]
fn test_validate_accepts_a_valid_document() {
    let (tmp, config_path) = setup_test_env();

    let doc = tmp.path().join("blue-dream.json");
    fs::write(
        &doc,
        r#"{"id": "strain-001", "name": "Blue Dream", "type": "hybrid"}"#,
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_cdes(&config_path, &["validate", "strain", doc.to_str().unwrap()]);
    assert!(success, "validate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("is valid against 'strain'"));
}

#[test]
fn test_validate_rejects_an_invalid_document() {
    let (tmp, config_path) = setup_test_env();

    let doc = tmp.path().join("incomplete.json");
    fs::write(&doc, r#"{"id": "strain-001"}"#).unwrap();

    let (stdout, stderr, success) =
        run_cdes(&config_path, &["validate", "strain", doc.to_str().unwrap()]);
    assert!(!success, "invalid document must exit nonzero");
    assert!(
        stdout.contains("required field missing"),
        "expected violations on stdout, got: {}",
        stdout
    );
    assert!(stderr.contains("2 violation(s)"), "stderr: {}", stderr);
}

#[test]
fn test_entities_and_get() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cdes(&config_path, &["entities", "terpene"]);
    assert!(success);
    assert!(stdout.contains("12 terpene entities"));
    assert!(stdout.contains("Myrcene"));

    let (stdout, _, success) = run_cdes(&config_path, &["get", "cannabinoid", "thc"]);
    assert!(success);
    assert!(stdout.contains("Delta-9-Tetrahydrocannabinol"));
}

#[test]
fn test_color_lookup() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cdes(&config_path, &["color", "limonene"]);
    assert!(success);
    assert!(stdout.contains("#F28C28"));
}

#[test]
fn test_search_ranks_reference_data() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cdes(&config_path, &["search", "citrus"]);
    assert!(success);
    assert!(
        stdout.contains("terpene:limonene"),
        "expected limonene in results, got: {}",
        stdout
    );
}

#[test]
fn test_overview_prints_standard_metadata() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_cdes(&config_path, &["overview"]);
    assert!(success);
    assert!(stdout.contains("Cannabis Data Exchange Standard"));
    assert!(stdout.contains("referenceDataSets"));
}

#[test]
fn test_unknown_entity_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_cdes(&config_path, &["get", "terpene", "unobtanium"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}
