use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use chorale_meta::constants::BCT_URL;
use chorale_meta::logging;
use chorale_meta::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "chorale_meta")]
#[command(about = "Build cross-reference tables for the Bach chorale datasets")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory that inputs and outputs are resolved against
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Optional TOML file overriding source and output locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build krn_metadata.csv, mapping_table.csv and riemenschneider.csv
    Run {
        /// Fetch the BCT table over HTTP instead of reading the cached copy
        #[arg(long)]
        fetch: bool,
        /// Fetch the BCT table from this URL; implies --fetch
        #[arg(long)]
        bct_url: Option<String>,
    },
    /// List the DCML score files by corrected Riemenschneider number
    Discover {
        /// Directory to scan instead of the configured one
        #[arg(long)]
        dir: Option<String>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    Ok(config)
}

/// Point the BCT source at a URL when fetching is requested.
///
/// An explicit `--bct-url` always fetches; a bare `--fetch` uses the
/// configured URL or the public table.
fn apply_run_args(config: &mut PipelineConfig, fetch: bool, bct_url: Option<String>) {
    match bct_url {
        Some(url) => config.sources.bct_url = Some(url),
        None if fetch && config.sources.bct_url.is_none() => {
            config.sources.bct_url = Some(BCT_URL.to_string());
        }
        None => {}
    }
}

fn apply_discover_args(config: &mut PipelineConfig, dir: Option<String>) {
    if let Some(dir) = dir {
        config.sources.cap_dir = dir;
    }
}

fn run(config: PipelineConfig) -> anyhow::Result<()> {
    println!("🔄 Building chorale metadata in {}", config.base_dir.display());
    let pipeline = Pipeline::new(config);
    let result = pipeline.run().context("metadata pipeline failed")?;

    println!("\n📊 Pipeline Results:");
    println!("   Humdrum index rows: {}", result.krn_rows);
    println!("   DCML score files: {}", result.cap_files);
    println!("   Wiki catalog rows: {}", result.wiki_rows);
    println!("   Reference chorales: {}", result.reference_rows);
    println!("   Mapping table rows: {}", result.mapping_rows);
    for path in &result.output_files {
        println!("   Output file: {}", path.display());
    }
    Ok(())
}

fn discover(config: PipelineConfig) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config);
    let listing = pipeline
        .discover_cap_files()
        .context("discovering DCML files")?;
    for file in listing.iter() {
        println!("{:>3}  {}", file.number, file.file_name);
    }
    let missing = listing.missing();
    if !missing.is_empty() {
        println!("\n⚠️  No file for: {:?}", missing);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let guard = logging::init_logging(&config.resolve(&config.log_dir))
        .context("initializing logging")?;

    let outcome = match cli.command {
        Some(Commands::Discover { dir }) => {
            apply_discover_args(&mut config, dir);
            discover(config)
        }
        Some(Commands::Run { fetch, bct_url }) => {
            apply_run_args(&mut config, fetch, bct_url);
            run(config)
        }
        None => run(config),
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
