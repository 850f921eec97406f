//! YouTube Success Intelligence Core
//!
//! The main entry point for yts-core, handling:
//! - Serving the prediction, clustering and drift API over HTTP
//! - Readiness probes over the trained artifacts
//! - Post-training registration (reports, baseline, manifest, registry)
//! - One-off predictions and drift checks from the command line
//! - JSON Schema export of the request/response contracts

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use yts_common::config::paths::{
    ENV_ARTIFACT_DIR, ENV_DATA_PATH, ENV_MLOPS_DIR, ENV_MODEL_DIR, ENV_PROJECT_ROOT,
    ENV_REPORT_DIR,
};
use yts_common::config::{env_lookup, TrackingConfig, TrainingConfig};
use yts_common::error::{format_error_human, StructuredError};
use yts_common::{ArtifactPaths, Error, OutputFormat, Result, RunId, SCHEMA_VERSION};
use yts_core::api::{ApiServer, Router, ServerConfig};
use yts_core::dataset;
use yts_core::exit_codes::ExitCode;
use yts_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use yts_core::mlops::drift::{build_baseline, load_baseline, save_baseline};
use yts_core::mlops::ArtifactRegistry;
use yts_core::pipeline::{register_run, RegistrationOptions};
use yts_core::schema;
use yts_core::service::{DriftCheckRequest, PredictionRequest, Validate};
use yts_core::{IntelligenceService, ServiceHandle};

/// YouTube Success Intelligence - channel predictions, archetypes and drift
#[derive(Parser)]
#[command(name = "yts-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Project root (artifacts and data default beneath it)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Artifact directory
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    /// Model bundle directory
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Report directory
    #[arg(long, global = true)]
    report_dir: Option<PathBuf>,

    /// Manifest, registry and tracking directory
    #[arg(long, global = true)]
    mlops_dir: Option<PathBuf>,

    /// Processed dataset (JSON Lines)
    #[arg(long, global = true)]
    data_path: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Check that every expected artifact exists
    Ready,

    /// Register a finished training run
    Register(RegisterArgs),

    /// Build or inspect the drift baseline
    Baseline(BaselineArgs),

    /// Predict for one channel
    Predict(PredictArgs),

    /// Score a JSON array of channels against the drift baseline
    DriftCheck(DriftCheckArgs),

    /// Print the training manifest
    Manifest,

    /// Print the model registry
    Registry,

    /// Print JSON Schemas for the API contracts
    Schema(SchemaArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "YTS_BIND", default_value = yts_core::api::server::DEFAULT_BIND)]
    bind: String,

    /// Port
    #[arg(long, env = "YTS_PORT", default_value_t = yts_core::api::server::DEFAULT_PORT)]
    port: u16,

    /// Worker threads
    #[arg(long, env = "YTS_WORKERS", default_value_t = yts_core::api::server::DEFAULT_WORKERS)]
    workers: usize,

    /// Load the bundles before accepting requests
    #[arg(long)]
    preload: bool,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    /// Use this run id instead of generating one
    #[arg(long)]
    run_id: Option<String>,
}

#[derive(Args, Debug)]
struct BaselineArgs {
    #[command(subcommand)]
    command: BaselineCommands,
}

#[derive(Subcommand, Debug)]
enum BaselineCommands {
    /// Build the baseline from the processed dataset
    Build,
    /// Print the stored baseline
    Show,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    uploads: i64,
    #[arg(long)]
    category: String,
    #[arg(long)]
    country: String,
    #[arg(long)]
    age: i64,

    /// Include cluster, risk level and advice
    #[arg(long)]
    recommend: bool,
}

#[derive(Args, Debug)]
struct DriftCheckArgs {
    /// JSON file holding an array of prediction items
    input: PathBuf,

    #[arg(long, default_value_t = yts_core::service::DEFAULT_Z_THRESHOLD)]
    z_threshold: f64,

    #[arg(long, default_value_t = yts_core::service::DEFAULT_MIN_CATEGORY_FREQUENCY)]
    min_category_frequency: f64,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name; all schemas when omitted
    name: Option<String>,

    /// List available type names
    #[arg(long)]
    list: bool,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let global = &cli.global;
    let result = match &cli.command {
        Commands::Serve(args) => run_serve(global, args),
        Commands::Ready => run_ready(global),
        Commands::Register(args) => run_register(global, args),
        Commands::Baseline(args) => match args.command {
            BaselineCommands::Build => run_baseline_build(global),
            BaselineCommands::Show => run_baseline_show(global),
        },
        Commands::Predict(args) => run_predict(global, args),
        Commands::DriftCheck(args) => run_drift_check(global, args),
        Commands::Manifest => run_manifest(global),
        Commands::Registry => run_registry(global),
        Commands::Schema(args) => run_schema(global, args),
        Commands::Version => {
            print_version(global);
            Ok(ExitCode::Ok)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            report_error(global, &err);
            ExitCode::from(&err)
        }
    };
    std::process::exit(exit_code.as_i32());
}

/// Artifact paths with CLI flags taking precedence over `YTS_*` variables.
fn resolve_paths(global: &GlobalOpts) -> ArtifactPaths {
    let mut overrides: HashMap<&str, String> = HashMap::new();
    let flags = [
        (ENV_PROJECT_ROOT, &global.project_root),
        (ENV_ARTIFACT_DIR, &global.artifact_dir),
        (ENV_MODEL_DIR, &global.model_dir),
        (ENV_REPORT_DIR, &global.report_dir),
        (ENV_MLOPS_DIR, &global.mlops_dir),
        (ENV_DATA_PATH, &global.data_path),
    ];
    for (name, value) in flags {
        if let Some(path) = value {
            overrides.insert(name, path.display().to_string());
        }
    }
    ArtifactPaths::from_lookup(|name| overrides.get(name).cloned().or_else(|| env_lookup(name)))
}

fn report_error(global: &GlobalOpts, err: &Error) {
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json()),
        _ => eprintln!(
            "{}",
            format_error_human(err, std::io::stderr().is_terminal())
        ),
    }
}

/// Print a command payload: pretty JSON, a one-line summary, or nothing.
fn emit<T: Serialize>(global: &GlobalOpts, value: &T, summary: impl FnOnce() -> String) -> Result<()> {
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Summary => println!("{}", summary()),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

fn run_serve(global: &GlobalOpts, args: &ServeArgs) -> Result<ExitCode> {
    let paths = resolve_paths(global);
    let handle = Arc::new(ServiceHandle::new(paths));
    if args.preload {
        handle.get()?;
    }
    let router = Router::new(handle, TrackingConfig::from_env()?)?;
    let config = ServerConfig {
        bind: args.bind.clone(),
        port: args.port,
        workers: args.workers,
    };
    let server = ApiServer::start(&config, router)?;
    if !matches!(global.format, OutputFormat::Exitcode) {
        eprintln!("yts-core listening on http://{}", server.addr());
    }
    server.join();
    Ok(ExitCode::Ok)
}

fn run_ready(global: &GlobalOpts) -> Result<ExitCode> {
    let report = ArtifactRegistry::new(resolve_paths(global)).check_ready();
    emit(global, &report, || {
        if report.ready {
            "ready".to_string()
        } else {
            format!("not_ready missing={}", report.missing.join(","))
        }
    })?;
    Ok(if report.ready {
        ExitCode::Ok
    } else {
        ExitCode::NotReady
    })
}

fn run_register(global: &GlobalOpts, args: &RegisterArgs) -> Result<ExitCode> {
    let run_id = match &args.run_id {
        None => None,
        Some(raw) => Some(RunId::parse(raw).ok_or_else(|| Error::InvalidSetting {
            name: "run-id".to_string(),
            reason: format!("'{}' is not YYYYMMDDTHHMMSSZ-xxxxxxxx", raw),
        })?),
    };
    let options = RegistrationOptions {
        training: TrainingConfig::from_env()?,
        tracking: TrackingConfig::from_env()?,
        run_id,
    };
    let paths = resolve_paths(global);
    let outcome = register_run(&paths, &options)?;

    let written: Vec<serde_json::Value> = outcome
        .written
        .iter()
        .map(|(name, path)| serde_json::json!({"artifact": name, "path": path.display().to_string()}))
        .collect();
    let payload = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "run_id": outcome.run_id,
        "rows": outcome.rows,
        "manifest_path": outcome.manifest_path.display().to_string(),
        "active_run_id": outcome.registry.active_run_id,
        "runs": outcome.registry.runs.len(),
        "written": written,
    });
    emit(global, &payload, || {
        format!(
            "[{}] registered: {} rows, {} artifacts",
            outcome.run_id,
            outcome.rows,
            outcome.written.len()
        )
    })?;
    Ok(ExitCode::Ok)
}

fn run_baseline_build(global: &GlobalOpts) -> Result<ExitCode> {
    let paths = resolve_paths(global);
    let rows = dataset::load_jsonl(&paths.data_path)?;
    let baseline = build_baseline(&rows);
    let path = paths.training_baseline();
    save_baseline(&baseline, &path)?;

    let payload = serde_json::json!({
        "path": path.display().to_string(),
        "rows": rows.len(),
        "features": baseline.features,
    });
    emit(global, &payload, || {
        format!("baseline: {} rows -> {}", rows.len(), path.display())
    })?;
    Ok(ExitCode::Ok)
}

fn run_baseline_show(global: &GlobalOpts) -> Result<ExitCode> {
    let paths = resolve_paths(global);
    let baseline = load_baseline(&paths.training_baseline())?.ok_or(Error::BaselineMissing)?;
    emit(global, &baseline, || {
        format!(
            "baseline: {} numeric, {} categorical",
            baseline.numeric.len(),
            baseline.categorical.len()
        )
    })?;
    Ok(ExitCode::Ok)
}

fn run_predict(global: &GlobalOpts, args: &PredictArgs) -> Result<ExitCode> {
    let request = PredictionRequest {
        uploads: args.uploads,
        category: args.category.clone(),
        country: args.country.clone(),
        age: args.age,
    }
    .validate()?;
    let service = IntelligenceService::from_artifacts(&resolve_paths(global))?;

    if args.recommend {
        let response = service.recommendation(request)?;
        emit(global, &response, || {
            format!(
                "cluster {} ({}), risk {:?}",
                response.cluster.cluster_id, response.cluster.archetype, response.risk_level
            )
        })?;
    } else {
        let prediction = service.predict(request)?;
        emit(global, &prediction, || {
            format!(
                "subscribers={:.0} earnings={:.0} growth={:.0}",
                prediction.predicted_subscribers,
                prediction.predicted_earnings,
                prediction.predicted_growth
            )
        })?;
    }
    Ok(ExitCode::Ok)
}

fn run_drift_check(global: &GlobalOpts, args: &DriftCheckArgs) -> Result<ExitCode> {
    let items: Vec<PredictionRequest> = serde_json::from_slice(&std::fs::read(&args.input)?)?;
    let request = DriftCheckRequest {
        items,
        z_threshold: args.z_threshold,
        min_category_frequency: args.min_category_frequency,
    };
    let service = IntelligenceService::from_artifacts(&resolve_paths(global))?;
    let report = service.drift_check(request)?;
    emit(global, &report, || {
        format!(
            "drift: {}/{} high severity, risk={}",
            report.summary.high_severity_records,
            report.summary.total_records,
            report.summary.is_drift_risk
        )
    })?;
    Ok(ExitCode::Ok)
}

fn run_manifest(global: &GlobalOpts) -> Result<ExitCode> {
    let registry = ArtifactRegistry::new(resolve_paths(global));
    match registry.load_manifest()? {
        Some(manifest) => {
            emit(global, &manifest, || {
                format!("manifest: run {} at {}", manifest.run_id, manifest.timestamp_utc)
            })?;
            Ok(ExitCode::Ok)
        }
        None => {
            emit(global, &serde_json::json!({"detail": "Manifest not found"}), || {
                "manifest: not found".to_string()
            })?;
            Ok(ExitCode::NotReady)
        }
    }
}

fn run_registry(global: &GlobalOpts) -> Result<ExitCode> {
    let registry = ArtifactRegistry::new(resolve_paths(global));
    match registry.load_registry()? {
        Some(doc) => {
            emit(global, &doc, || {
                format!(
                    "registry: {} runs, active {}",
                    doc.runs.len(),
                    doc.active_run_id.as_deref().unwrap_or("-")
                )
            })?;
            Ok(ExitCode::Ok)
        }
        None => {
            emit(global, &serde_json::json!({"detail": "Registry not found"}), || {
                "registry: not found".to_string()
            })?;
            Ok(ExitCode::NotReady)
        }
    }
}

fn run_schema(global: &GlobalOpts, args: &SchemaArgs) -> Result<ExitCode> {
    if args.list {
        for (name, description) in schema::available_schemas() {
            println!("{:<28} {}", name, description);
        }
        return Ok(ExitCode::Ok);
    }
    match &args.name {
        None => emit(global, &schema::generate_all_schemas(), || {
            format!("{} schemas", schema::available_schemas().len())
        })?,
        Some(name) => {
            let doc = schema::generate_schema(name).ok_or_else(|| Error::InvalidSetting {
                name: "schema".to_string(),
                reason: format!("unknown type '{}'; see 'yts-core schema --list'", name),
            })?;
            emit(global, &doc, || name.clone())?;
        }
    }
    Ok(ExitCode::Ok)
}

fn print_version(global: &GlobalOpts) {
    let version = env!("CARGO_PKG_VERSION");
    match global.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "version": version,
                "schema_version": SCHEMA_VERSION,
            })
        ),
        OutputFormat::Summary => println!("yts-core {}", version),
        OutputFormat::Exitcode => {}
    }
}
