//! argcast - Main Entry Point
//!
//! Loads a pipeline file, compiles the pipeline of one argument and casts
//! JSON-encoded values through it, printing the result or the raised error.

use anyhow::{bail, Context, Result};
use argcast::{
    config::{ArgcastConfig, PipelineFile},
    pipeline::ArgumentCast,
    types::Value,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Cast values through a declared argument pipeline
#[derive(Parser)]
#[command(name = "argcast")]
#[command(about = "Compile and run argument validation/coercion pipelines", long_about = None)]
struct Cli {
    /// Pipeline file (JSON) declaring the arguments
    #[arg(short, long)]
    pipeline: PathBuf,

    /// Argument to cast; defaults to the first one in the file
    #[arg(short, long)]
    argument: Option<String>,

    /// Config file; defaults to argcast.toml in the platform config dir
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the forwarding analysis and fast-path descriptor
    #[arg(long)]
    explain: bool,

    /// Disable the forwarding bypass
    #[arg(long)]
    no_forwarding: bool,

    /// Disable the single-scalar fast path
    #[arg(long)]
    no_fast_path: bool,

    /// Values to cast, each a JSON-encoded value such as '{"double": 3.5}' or '"null"'
    values: Vec<String>,
}

fn explain(cast: &ArgumentCast) -> Result<()> {
    let stats = &cast.pipeline().stats;
    println!(
        "argument '{}': {} steps, {} units ({} conditional)",
        cast.name(),
        cast.chain().len(),
        stats.units,
        stats.conditionals
    );
    let analysis = serde_json::to_string_pretty(cast.analysis())
        .context("Failed to serialize forwarding analysis")?;
    println!("forwarding: {}", analysis);
    match cast.fast_path() {
        Some(descriptor) => println!(
            "fast path: {} scalars, default {}, {} units after find_first",
            descriptor.target,
            descriptor
                .find_first_default
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string()),
            descriptor.after_find_first.units().len()
        ),
        None => println!("fast path: none"),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,argcast=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ArgcastConfig::default_path);
    let config = ArgcastConfig::load_or_default(&config_path);

    let file = PipelineFile::load(&cli.pipeline)
        .with_context(|| format!("Failed to load {}", cli.pipeline.display()))?;

    let mut declarations = file.declarations(&config);
    let index = match &cli.argument {
        Some(name) => declarations
            .iter()
            .position(|d| &d.name == name)
            .with_context(|| format!("No argument '{}' in {}", name, cli.pipeline.display()))?,
        None if declarations.is_empty() => bail!("{} declares no arguments", cli.pipeline.display()),
        None => 0,
    };
    let mut declaration = declarations.swap_remove(index);
    if cli.no_forwarding {
        declaration.settings.forwarding = false;
    }
    if cli.no_fast_path {
        declaration.settings.fast_path = false;
    }

    let name = declaration.name.clone();
    let cast = declaration
        .into_cast()
        .with_context(|| format!("Failed to compile argument '{}'", name))?;
    tracing::info!("Loaded argument '{}' from {}", name, cli.pipeline.display());

    if cli.explain {
        explain(&cast)?;
    }

    let mut failures = 0;
    for raw in &cli.values {
        let value: Value =
            serde_json::from_str(raw).with_context(|| format!("Invalid value: {}", raw))?;
        match cast.cast(value.clone()) {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    println!("Warning: {}", warning);
                }
                println!("{} -> {} ({:?})", value, outcome.value, outcome.route);
            }
            Err(e) => {
                failures += 1;
                println!("{} -> Error: {}", value, e);
            }
        }
    }

    if failures > 0 {
        tracing::debug!("{} of {} casts failed", failures, cli.values.len());
        std::process::exit(1);
    }
    Ok(())
}
