use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{debug, info};

use nxvalidate_core::{MemoryTree, OpenTree, Validator};
use nxvalidate_db::{
    CorpusConfig, CorpusManifest, DefinitionCorpus, MANIFEST_FILE, ReportFormat, ShowPreset,
    ValidatorConfig,
};

mod output;
mod structure;

use output::{FileReport, ReportOptions, format_reports};

/// Corpus directory used when neither flags nor configuration name one.
const DEFAULT_DEFINITIONS_DIR: &str = "definitions";

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliReportFormat {
    Table,
    Markdown,
    Json,
    Yaml,
}

impl From<CliReportFormat> for ReportFormat {
    fn from(fmt: CliReportFormat) -> Self {
        match fmt {
            CliReportFormat::Table => Self::Table,
            CliReportFormat::Markdown => Self::Markdown,
            CliReportFormat::Json => Self::Json,
            CliReportFormat::Yaml => Self::Yaml,
        }
    }
}

/// Status filter presets for the findings table.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliShowPreset {
    /// Every finding.
    All,
    /// ERROR and WARN only.
    NotOk,
    /// WARN, ERROR, TODO and UNUSED.
    Errors,
}

impl From<CliShowPreset> for ShowPreset {
    fn from(show: CliShowPreset) -> Self {
        match show {
            CliShowPreset::All => Self::All,
            CliShowPreset::NotOk => Self::NotOk,
            CliShowPreset::Errors => Self::Errors,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "nxvalidate", version)]
#[command(about = "Validate NeXus data files against a definition corpus")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate one or more data files.
    Validate(ValidateArgs),
    /// Print the node tree of a data file.
    Structure(StructureArgs),
    /// Build or verify the checksum manifest of a corpus directory.
    Manifest(ManifestArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Data files (tree documents in JSON or YAML).
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Definition corpus directory.
    #[arg(long)]
    definitions: Option<PathBuf>,
    /// Definition bundle (.json, .yaml or .json.gz), tried after --definitions.
    #[arg(long)]
    bundle: Option<PathBuf>,
    /// Validator configuration file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Check the corpus directory against its manifest before use.
    #[arg(long)]
    verify_manifest: bool,
    /// Which findings to list.
    #[arg(long)]
    show: Option<CliShowPreset>,
    /// Output format.
    #[arg(long)]
    format: Option<CliReportFormat>,
    /// Omit the per-status summary.
    #[arg(long)]
    no_summary: bool,
    /// Append the address to classpath table.
    #[arg(long)]
    classpath: bool,
    /// Number of files validated in parallel (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Exit with status 1 when any ERROR finding is recorded.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct StructureArgs {
    /// Data file (tree document in JSON or YAML).
    file: PathBuf,
    /// Do not list attributes.
    #[arg(long)]
    no_attributes: bool,
}

#[derive(Debug, Args)]
struct ManifestArgs {
    #[command(subcommand)]
    operation: ManifestOperation,
}

#[derive(Debug, Subcommand)]
enum ManifestOperation {
    /// Checksum every file of a corpus directory.
    Build(ManifestBuildArgs),
    /// Check a corpus directory against its manifest.
    Verify(ManifestVerifyArgs),
}

#[derive(Debug, Args)]
struct ManifestBuildArgs {
    /// Corpus directory.
    dir: PathBuf,
    /// Definitions version to record (default: the corpus header's).
    #[arg(long = "corpus-version")]
    corpus_version: Option<String>,
    /// Manifest path (default: <DIR>/manifest.json).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ManifestVerifyArgs {
    /// Corpus directory.
    dir: PathBuf,
    /// Manifest path (default: <DIR>/manifest.json).
    #[arg(long)]
    manifest: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Structure(args) => run_structure(args),
        Command::Manifest(args) => run_manifest(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("nxvalidate=warn,nxvalidate_core=warn,nxvalidate_db=warn"),
        1 => EnvFilter::new("nxvalidate=info,nxvalidate_core=info,nxvalidate_db=info"),
        _ => EnvFilter::new("nxvalidate=debug,nxvalidate_core=debug,nxvalidate_db=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// validate command
// ---------------------------------------------------------------------------

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = ValidatorConfig::load(path)
                .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?;
            if let Some(base) = path.parent() {
                config.resolve_paths(base);
            }
            config
        }
        None => ValidatorConfig::default(),
    };

    if args.definitions.is_some() || args.bundle.is_some() {
        config.corpus.dir = args.definitions;
        config.corpus.bundle = args.bundle;
    }
    if args.verify_manifest {
        config.corpus.verify_manifest = true;
    }
    if let Some(show) = args.show {
        config.report.show = show.into();
    }
    if let Some(format) = args.format {
        config.report.format = format.into();
    }
    if args.no_summary {
        config.report.summary = false;
    }
    if args.classpath {
        config.report.classpath = true;
    }

    let corpus = load_corpus(&config.corpus)?;
    let options = ReportOptions {
        show: config.report.show,
        summary: config.report.summary,
        classpath: config.report.classpath,
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("Failed to start worker pool: {e}"))?;

    let results: Vec<Result<FileReport, String>> = pool.install(|| {
        args.files
            .par_iter()
            .map(|path| validate_file(path, &corpus, options))
            .collect()
    });

    let mut reports = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => failures.push(err),
        }
    }

    if !reports.is_empty() {
        println!("{}", format_reports(&reports, config.report.format)?);
    }

    if !failures.is_empty() {
        return Err(failures.join("; "));
    }

    let errors: usize = reports.iter().map(|r| r.errors).sum();
    if args.strict && errors > 0 {
        return Err(format!("{errors} ERROR finding(s) recorded"));
    }
    Ok(())
}

fn load_corpus(config: &CorpusConfig) -> Result<DefinitionCorpus, String> {
    let mut builder = DefinitionCorpus::builder().verify_manifest(config.verify_manifest);
    if let Some(dir) = &config.dir {
        builder = builder.from_dir(dir);
    }
    if let Some(bundle) = &config.bundle {
        builder = builder.from_bundle(bundle);
    }
    if config.dir.is_none() && config.bundle.is_none() {
        builder = builder.from_dir(DEFAULT_DEFINITIONS_DIR);
    }

    let corpus = builder
        .build()
        .map_err(|e| format!("Failed to load definitions: {e}"))?;
    info!(
        version = %corpus.version(),
        classes = corpus.len(),
        "definition corpus ready"
    );
    Ok(corpus)
}

fn validate_file(
    path: &Path,
    corpus: &DefinitionCorpus,
    options: ReportOptions,
) -> Result<FileReport, String> {
    debug!(file = %path.display(), "validating");
    let mut validator = Validator::<MemoryTree, _>::open(path, corpus)
        .map_err(|e| format!("'{}': {e}", path.display()))?;
    let default_plot = validator.validate();
    Ok(FileReport::new(
        path.display().to_string(),
        validator.ledger(),
        default_plot,
        options,
    ))
}

// ---------------------------------------------------------------------------
// structure command
// ---------------------------------------------------------------------------

fn run_structure(args: StructureArgs) -> Result<(), String> {
    let tree = MemoryTree::open(&args.file)
        .map_err(|e| format!("Failed to read '{}': {e}", args.file.display()))?;
    print!("{}", structure::render_structure(&tree, !args.no_attributes));
    Ok(())
}

// ---------------------------------------------------------------------------
// manifest command
// ---------------------------------------------------------------------------

fn run_manifest(args: ManifestArgs) -> Result<(), String> {
    match args.operation {
        ManifestOperation::Build(args) => run_manifest_build(args),
        ManifestOperation::Verify(args) => run_manifest_verify(args),
    }
}

fn run_manifest_build(args: ManifestBuildArgs) -> Result<(), String> {
    let version = match args.corpus_version {
        Some(version) => version,
        None => DefinitionCorpus::from_dir(&args.dir)
            .map_err(|e| format!("Failed to load corpus '{}': {e}", args.dir.display()))?
            .version()
            .to_string(),
    };

    let manifest = CorpusManifest::build(&args.dir, version)
        .map_err(|e| format!("Failed to checksum '{}': {e}", args.dir.display()))?;
    let output = args.output.unwrap_or_else(|| args.dir.join(MANIFEST_FILE));
    manifest
        .save(&output)
        .map_err(|e| format!("Failed to write '{}': {e}", output.display()))?;

    println!(
        "Recorded {} file(s) in '{}'.",
        manifest.files.len(),
        output.display()
    );
    Ok(())
}

fn run_manifest_verify(args: ManifestVerifyArgs) -> Result<(), String> {
    let path = args.manifest.unwrap_or_else(|| args.dir.join(MANIFEST_FILE));
    let manifest = CorpusManifest::load(&path)
        .map_err(|e| format!("Failed to load manifest '{}': {e}", path.display()))?;
    manifest
        .verify(&args.dir)
        .map_err(|e| format!("Corpus '{}' does not match its manifest: {e}", args.dir.display()))?;

    println!(
        "Verified {} file(s) against '{}'.",
        manifest.files.len(),
        path.display()
    );
    Ok(())
}
