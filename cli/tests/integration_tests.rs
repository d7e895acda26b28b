use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn definitions_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("definitions")
}

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

fn nxvalidate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nxvalidate"))
        .args(args)
        .output()
        .expect("failed to run nxvalidate")
}

/// Runs `validate` against the sample corpus.
fn validate(extra: &[&str]) -> Output {
    let definitions = definitions_dir();
    let mut args = vec!["validate", "--definitions", definitions.to_str().unwrap()];
    args.extend_from_slice(extra);
    nxvalidate(&args)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        let dest = to.join(path.file_name().unwrap());
        if path.is_dir() {
            copy_dir(&path, &dest);
        } else {
            fs::copy(&path, &dest).unwrap();
        }
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_clean_file_passes_strict() {
    let output = validate(&[&fixture("scan.json"), "--strict"]);
    let out = stdout(&output);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("Default plot: /entry/data/counts (v3)"));
    assert!(out.contains("Findings (not-ok):\n  none\n"));
    assert!(out.contains("Summary:"));
}

#[test]
fn validate_strict_fails_on_error_findings() {
    let output = validate(&[&fixture("broken.json"), "--strict"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("/entry/alias@target"));
    assert!(stderr(&output).contains("error: 1 ERROR finding(s) recorded"));
}

#[test]
fn validate_reports_errors_without_failing_by_default() {
    let output = validate(&[&fixture("broken.json")]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert!(out.contains("/entry/missing does not exist"));
    assert!(out.contains("valid HDF5 item name, not valid with NeXus"));
    assert!(out.contains("expected one of these:"));
}

#[test]
fn validate_json_output_for_several_files() {
    let output = validate(&[
        &fixture("scan.json"),
        &fixture("broken.json"),
        &fixture("two_entries_v1.yaml"),
        "--format",
        "json",
        "--jobs",
        "2",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let reports: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 3);

    assert!(reports[0]["file"].as_str().unwrap().ends_with("scan.json"));
    assert_eq!(reports[0]["errors"], 0);
    assert_eq!(reports[0]["default_plot"]["outcome"], "unique");

    assert_eq!(reports[1]["errors"], 1);
    for finding in reports[1]["findings"].as_array().unwrap() {
        let status = finding["status"].as_str().unwrap();
        assert!(status == "ERROR" || status == "WARN", "unexpected {status}");
    }

    assert_eq!(reports[2]["default_plot"]["outcome"], "ambiguous");
    assert!(
        reports[2]["findings"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f["test_name"] == "NeXus default plot" && f["address"] == "/")
    );
}

#[test]
fn validate_show_all_with_summary_and_classpaths() {
    let output = validate(&[
        &fixture("scan.json"),
        "--show",
        "all",
        "--format",
        "markdown",
        "--classpath",
    ]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert!(out.contains("## Findings (all)"));
    assert!(out.contains("| OK | `/entry/data/counts@target` | link target exists |"));
    assert!(out.contains("| TODO | `/entry` | NXDL review: NXscan |"));
    assert!(out.contains("## Summary"));
    assert!(out.contains("| `/entry/sample/temperature@units` | /NXentry/NXsample/field@units |"));
}

#[test]
fn validate_no_summary() {
    let output = validate(&[&fixture("scan.json"), "--no-summary"]);
    assert!(output.status.success());
    assert!(!stdout(&output).contains("Summary:"));
}

#[test]
fn validate_missing_file_fails() {
    let output = validate(&["/nonexistent/run.json"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("file not found: /nonexistent/run.json"));
}

#[test]
fn validate_missing_corpus_fails() {
    let output = nxvalidate(&[
        "validate",
        "--definitions",
        "/nonexistent/definitions",
        &fixture("scan.json"),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Failed to load definitions"));
}

#[test]
fn validate_reads_config_file() {
    let scratch = tempfile::tempdir().unwrap();
    copy_dir(&definitions_dir(), &scratch.path().join("corpus"));
    let config = scratch.path().join("nxvalidate.yml");
    fs::write(
        &config,
        "version: \"1.0\"\ncorpus:\n  dir: corpus\n  verify_manifest: true\nreport:\n  show: errors\n  format: yaml\n  summary: false\n",
    )
    .unwrap();

    let output = nxvalidate(&[
        "validate",
        "--config",
        config.to_str().unwrap(),
        &fixture("broken.json"),
    ]);
    let out = stdout(&output);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("show: errors"));
    assert!(out.contains("status: TODO"));
    assert!(!out.contains("summary:"));

    // flags override the configuration
    let output = nxvalidate(&[
        "validate",
        "--config",
        config.to_str().unwrap(),
        "--format",
        "table",
        &fixture("broken.json"),
    ]);
    assert!(stdout(&output).contains("Findings (errors):"));
}

// ---------------------------------------------------------------------------
// structure
// ---------------------------------------------------------------------------

#[test]
fn structure_prints_tree() {
    let output = nxvalidate(&["structure", &fixture("two_entries_v1.yaml")]);
    let out = stdout(&output);

    assert!(output.status.success());
    assert!(out.starts_with("/\n  scan_1:NXentry\n    @NX_class = NXentry\n    data:NXdata\n"));
    assert!(out.contains("        @signal = 1\n"));

    let output = nxvalidate(&["structure", "--no-attributes", &fixture("scan.json")]);
    let out = stdout(&output);
    assert!(out.contains("      counts -> /entry/instrument/detector/data\n"));
    assert!(!out.contains("@"));
}

#[test]
fn structure_rejects_malformed_document() {
    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join("bad.json");
    fs::write(&path, "{ not json").unwrap();

    let output = nxvalidate(&["structure", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: Failed to read"));
}

// ---------------------------------------------------------------------------
// manifest
// ---------------------------------------------------------------------------

#[test]
fn manifest_build_then_verify() {
    let scratch = tempfile::tempdir().unwrap();
    let corpus = scratch.path().join("corpus");
    copy_dir(&definitions_dir(), &corpus);
    fs::remove_file(corpus.join("manifest.json")).unwrap();
    let dir = corpus.to_str().unwrap();

    let output = nxvalidate(&["manifest", "build", dir]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("Recorded 11 file(s)"));

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(corpus.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["version"], "v2024.02");

    let output = nxvalidate(&["manifest", "verify", dir]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Verified 11 file(s)"));

    fs::write(corpus.join("base_classes/NXdata.yaml"), "name: NXdata\n").unwrap();
    let output = nxvalidate(&["manifest", "verify", dir]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does not match its manifest"));
    assert!(stderr(&output).contains("base_classes/NXdata.yaml"));
}

#[test]
fn validate_verify_manifest_rejects_tampered_corpus() {
    let scratch = tempfile::tempdir().unwrap();
    let corpus = scratch.path().join("corpus");
    copy_dir(&definitions_dir(), &corpus);
    fs::write(corpus.join("corpus.yaml"), "version: tampered\n").unwrap();

    let output = nxvalidate(&[
        "validate",
        "--definitions",
        corpus.to_str().unwrap(),
        "--verify-manifest",
        &fixture("scan.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no definition sources available"));
}
