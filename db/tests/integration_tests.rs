use std::path::{Path, PathBuf};

use serde_json::json;

use nxvalidate_core::{
    ClassCategory, MaxOccurs, MemoryTree, PlotResolution, PlotVersion, SchemaProvider, StatusKind,
    Validator,
};
use nxvalidate_db::{
    CorpusError, CorpusManifest, CorpusSource, DefinitionCorpus, MANIFEST_FILE, ReportFormat,
    ShowPreset, ValidatorConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sample_corpus_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("definitions")
}

/// Copies the sample corpus into a scratch directory that tests may edit.
fn copy_corpus(target: &Path) {
    fn copy(from: &Path, to: &Path) {
        std::fs::create_dir_all(to).unwrap();
        for entry in std::fs::read_dir(from).unwrap() {
            let path = entry.unwrap().path();
            let dest = to.join(path.file_name().unwrap());
            if path.is_dir() {
                copy(&path, &dest);
            } else {
                std::fs::copy(&path, &dest).unwrap();
            }
        }
    }
    copy(&sample_corpus_dir(), target);
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_sample_corpus_loads() {
    let corpus = DefinitionCorpus::from_dir(sample_corpus_dir()).unwrap();

    assert_eq!(corpus.version(), "v2024.02");
    assert!(corpus.len() >= 10);
    for class in ["NXroot", "NXentry", "NXdata", "NXcollection", "NXsample", "NXscan"] {
        assert!(corpus.contains(class), "missing {class}");
    }
    assert_eq!(corpus.get("NXscan").unwrap().category, ClassCategory::Application);
    assert_eq!(
        corpus.get("NXroot").unwrap().groups["entry"].max_occurs,
        MaxOccurs::Unbounded
    );
    assert!(corpus.is_opaque_container("NXcollection"));
    assert_eq!(
        corpus.field_attribute("interpretation").unwrap().enumeration.len(),
        8
    );
}

#[test]
fn test_sample_corpus_matches_its_manifest() {
    let dir = sample_corpus_dir();
    let manifest = CorpusManifest::load(dir.join(MANIFEST_FILE)).unwrap();
    manifest.verify(&dir).unwrap();

    let corpus = DefinitionCorpus::from_dir_verified(&dir).unwrap();
    assert_eq!(corpus.version(), manifest.version);
}

#[test]
fn test_verified_load_rejects_tampering() {
    let scratch = tempfile::tempdir().unwrap();
    copy_corpus(scratch.path());
    std::fs::write(
        scratch.path().join("base_classes/NXuser.yaml"),
        "name: NXuser\nfields:\n  password: {}\n",
    )
    .unwrap();

    let err = DefinitionCorpus::from_dir_verified(scratch.path()).unwrap_err();
    assert!(matches!(err, CorpusError::InvalidChecksum(_)));

    // unverified loads still accept the edit
    let corpus = DefinitionCorpus::from_dir(scratch.path()).unwrap();
    assert!(corpus.get("NXuser").unwrap().fields.contains_key("password"));

    // the builder skips the tampered directory and falls back to the bundle
    let bundle_dir = tempfile::tempdir().unwrap();
    let bundle = bundle_dir.path().join("definitions.json");
    DefinitionCorpus::from_dir(sample_corpus_dir())
        .unwrap()
        .write_bundle(&bundle)
        .unwrap();
    let corpus = DefinitionCorpus::builder()
        .from_dir(scratch.path())
        .from_bundle(&bundle)
        .verify_manifest(true)
        .build()
        .unwrap();
    assert!(!corpus.get("NXuser").unwrap().fields.contains_key("password"));
}

// ---------------------------------------------------------------------------
// Bundle loading
// ---------------------------------------------------------------------------

#[test]
fn test_bundle_formats_agree() {
    let scratch = tempfile::tempdir().unwrap();
    let corpus = DefinitionCorpus::from_dir(sample_corpus_dir()).unwrap();

    let json_path = scratch.path().join("definitions.json");
    let gz_path = scratch.path().join("definitions.json.gz");
    let yaml_path = scratch.path().join("definitions.yaml");
    corpus.write_bundle(&json_path).unwrap();
    corpus.write_bundle(&gz_path).unwrap();
    std::fs::write(
        &yaml_path,
        serde_yaml::to_string(&corpus.to_package()).unwrap(),
    )
    .unwrap();

    for path in [&json_path, &gz_path, &yaml_path] {
        let loaded = DefinitionCorpus::from_bundle(path).unwrap();
        assert_eq!(loaded.class_names(), corpus.class_names());
        assert_eq!(loaded.source(), &CorpusSource::Bundle(path.clone()));
    }
    assert!(std::fs::metadata(&gz_path).unwrap().len() < std::fs::metadata(&json_path).unwrap().len());
}

#[test]
fn test_corrupt_gzip_bundle() {
    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join("broken.json.gz");
    std::fs::write(&path, b"definitely not gzip").unwrap();

    let err = DefinitionCorpus::from_bundle(&path).unwrap_err();
    assert!(matches!(err, CorpusError::Compression(_)));
}

// ---------------------------------------------------------------------------
// Validation against the loaded corpus
// ---------------------------------------------------------------------------

#[test]
fn test_validate_scan_file_with_loaded_corpus() {
    let corpus = DefinitionCorpus::from_dir(sample_corpus_dir()).unwrap();
    let tree = MemoryTree::from_json(json!({
        "attributes": { "default": "entry" },
        "children": {
            "entry": {
                "kind": "group",
                "attributes": { "NX_class": "NXentry", "default": "data" },
                "children": {
                    "title": { "kind": "dataset", "value": "calibration scan" },
                    "start_time": { "kind": "dataset", "value": "2024-02-01T10:00:00Z" },
                    "definition": { "kind": "dataset", "value": "NXscan" },
                    "instrument": {
                        "kind": "group",
                        "attributes": { "NX_class": "NXinstrument" }
                    },
                    "data": {
                        "kind": "group",
                        "attributes": { "NX_class": "NXdata", "signal": "counts" },
                        "children": {
                            "counts": {
                                "kind": "dataset",
                                "value": [3, 9, 4],
                                "attributes": { "units": "counts", "interpretation": "spectrum" }
                            }
                        }
                    }
                }
            }
        }
    }))
    .unwrap();

    let mut validator = Validator::new(tree, &corpus).unwrap();
    let plot = validator.validate();
    assert_eq!(
        plot,
        PlotResolution::Unique {
            version: PlotVersion::V3,
            address: "/entry/data/counts".into()
        }
    );

    let findings = validator.findings();
    let status_of = |test: &str, address: &str| {
        findings
            .iter()
            .find(|f| f.test_name == test && f.address == address)
            .map(|f| f.status)
    };
    assert_eq!(status_of("NXDL review: NXscan", "/entry"), Some(StatusKind::Todo));
    assert_eq!(
        status_of("NXscan required field", "/entry/end_time"),
        Some(StatusKind::Warn)
    );
    assert_eq!(
        status_of("NXscan required group", "/entry/sample"),
        Some(StatusKind::Warn)
    );
    assert_eq!(
        status_of("NXscan required group", "/entry/instrument"),
        Some(StatusKind::Ok)
    );
    assert_eq!(
        status_of("enumeration: @interpretation", "/entry/data/counts@interpretation"),
        Some(StatusKind::Ok)
    );
    assert_eq!(
        status_of("NXdata@ignoreExtraFields", "/entry/data"),
        Some(StatusKind::Todo)
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_workflow() {
    let scratch = tempfile::tempdir().unwrap();
    let path = scratch.path().join("nxvalidate.yml");
    std::fs::write(
        &path,
        "version: \"1.0\"\ncorpus:\n  dir: definitions\n  verify_manifest: true\nreport:\n  show: all\n  format: json\n",
    )
    .unwrap();

    let mut config = ValidatorConfig::load(&path).unwrap();
    config.resolve_paths(scratch.path());
    assert_eq!(config.corpus.dir, Some(scratch.path().join("definitions")));
    assert!(config.corpus.verify_manifest);
    assert_eq!(config.report.show, ShowPreset::All);
    assert_eq!(config.report.format, ReportFormat::Json);
    assert!(config.report.summary);

    let missing = ValidatorConfig::load(scratch.path().join("absent.yml"));
    assert!(matches!(missing, Err(CorpusError::Io(_))));
}
