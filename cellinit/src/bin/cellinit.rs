//! `cellinit` - resolve a cell's boot configuration and hand it off.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use cellinit::addons::{AddonRegistry, AddonRunner};
use cellinit::collaborators::{FileSpec, hand_off};
use cellinit::datasource::{FileDatasource, default_datasources};
use cellinit::logging::init_logging;
use cellinit::parameters::{ParameterPath, ParameterStore};
use cellinit::{CellinitError, CellinitResult, ResolveOptions, Resolver, SharedDatasource};

#[derive(Parser, Debug)]
#[command(name = "cellinit")]
#[command(version)]
#[command(about = "Resolve boot configuration from cloud datasources or a parameter store")]
struct Cli {
    /// JSON file with resolution options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Override the datasource deadline, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Materialize a key as a file: KEY=PATH[:MODE]
    #[arg(long = "file", value_name = "SPEC")]
    files: Vec<String>,

    /// Read user-data from a local file (repeatable)
    #[arg(long = "source-file", value_name = "PATH")]
    source_files: Vec<PathBuf>,

    /// Skip the cloud metadata datasources
    #[arg(long)]
    no_cloud: bool,

    /// JSON object of parameter name to value used as the fallback store
    #[arg(long, requires = "instance_id")]
    parameters: Option<PathBuf>,

    /// Namespace prefix of the parameter store
    #[arg(long, default_value = "/cells")]
    parameter_prefix: String,

    /// Instance whose parameters are read
    #[arg(long)]
    instance_id: Option<String>,

    /// Print flag arguments for keys with this prefix, one per line
    #[arg(long)]
    flag_prefix: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cellinit: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Boot configuration failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CellinitResult<()> {
    let options = load_options(&cli)?;

    let mut sources: Vec<SharedDatasource> = Vec::new();
    for path in &cli.source_files {
        sources.push(Arc::new(FileDatasource::new(path)));
    }
    if !cli.no_cloud {
        sources.extend(default_datasources()?);
    }

    let mut resolver = Resolver::new(sources, &options)?;
    if let (Some(file), Some(instance_id)) = (&cli.parameters, &cli.instance_id) {
        let store = load_parameters(file)?;
        resolver =
            resolver.with_parameter_store(store, ParameterPath::new(&cli.parameter_prefix, instance_id));
    }

    let config = resolver.resolve().await?;
    tracing::info!(keys = config.len(), "Boot configuration resolved");

    let registry = AddonRegistry::new();
    hand_off(&config, &options.files, &registry, AddonRunner::default()).await?;

    if let Some(prefix) = &cli.flag_prefix {
        for arg in config.flag_args(prefix) {
            println!("{}", arg);
        }
    }

    Ok(())
}

fn load_options(cli: &Cli) -> CellinitResult<ResolveOptions> {
    let mut options = match &cli.options {
        Some(path) => ResolveOptions::from_file(path)?,
        None => ResolveOptions::default(),
    };

    if let Some(timeout_ms) = cli.timeout_ms {
        options.datasource_timeout_ms = timeout_ms;
    }
    for spec in &cli.files {
        options.files.push(FileSpec::parse(spec)?);
    }

    options.sanitize()?;
    Ok(options)
}

fn load_parameters(path: &Path) -> CellinitResult<Arc<dyn ParameterStore>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CellinitError::Config(format!("Failed to read parameters {}: {}", path.display(), e))
    })?;
    let store: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
        CellinitError::Config(format!("Failed to parse parameters {}: {}", path.display(), e))
    })?;
    Ok(Arc::new(store))
}
