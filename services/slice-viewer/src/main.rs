//! Slice viewer command line.
//!
//! Renders one month of a partitioned raster record as a PNG overlay with a
//! placement sidecar, or reads selections interactively from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dataset::JsonDatasetSource;
use slice_common::SliceRequest;
use slice_viewer::config::{default_viewer_config, load_viewer_config};
use slice_viewer::{Orchestrator, PngFileSurface, UpdateOutcome, ViewerConfig};

#[derive(Parser, Debug)]
#[command(name = "slice-viewer")]
#[command(about = "Render monthly raster slices as map overlays")]
struct Args {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, env = "SLICE_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving the overlay PNG and its sidecar
    #[arg(long, default_value = "overlay")]
    out_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single selection
    Render {
        #[arg(long)]
        variable: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Print the selectable variables, years and months
    List,
    /// Read `variable year month` lines from stdin, one update per line
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_json)?;

    let config = match &args.config {
        Some(path) => load_viewer_config(path)?,
        None => default_viewer_config()?,
    };
    info!(
        partitions = config.dataset.partitions.len(),
        variables = ?config.variable_names(),
        "Loaded configuration"
    );

    match args.command {
        Command::List => list(&config),
        Command::Render {
            variable,
            year,
            month,
        } => {
            let orchestrator = build_orchestrator(&config, &args.out_dir)?;
            let outcome = orchestrator
                .update(SliceRequest::new(variable, year, month))
                .await?;
            if let UpdateOutcome::Rendered(summary) = outcome {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(())
        }
        Command::Interactive => {
            let orchestrator = Arc::new(build_orchestrator(&config, &args.out_dir)?);
            interactive(orchestrator, config.initial_request()).await
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays machine-readable.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn build_orchestrator(
    config: &ViewerConfig,
    out_dir: &Path,
) -> Result<Orchestrator<PngFileSurface>> {
    let source = Arc::new(JsonDatasetSource::new(config.dataset.axes.clone()));
    let surface = PngFileSurface::new(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;
    Orchestrator::from_config(config, source, surface).context("Invalid color scheme")
}

fn list(config: &ViewerConfig) -> Result<()> {
    let listing = json!({
        "variables": config.variable_names(),
        "years": config.dataset.partition_index().years(),
        "months": (1..=12).collect::<Vec<u32>>(),
    });
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

/// Spawn one update per stdin line; a later line supersedes earlier ones
/// that have not finished yet.
async fn interactive(
    orchestrator: Arc<Orchestrator<PngFileSurface>>,
    initial: Option<SliceRequest>,
) -> Result<()> {
    let mut tasks = Vec::new();
    if let Some(request) = initial {
        tasks.push(spawn_update(Arc::clone(&orchestrator), request));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_request_line(line) {
            Ok(request) => tasks.push(spawn_update(Arc::clone(&orchestrator), request)),
            Err(e) => warn!(line, error = %e, "Ignoring malformed selection"),
        }
    }

    for joined in join_all(tasks).await {
        joined.context("pipeline task panicked")?;
    }

    let stats = orchestrator.cache_stats();
    info!(
        loads = stats.loads,
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "Session finished"
    );
    Ok(())
}

fn spawn_update(
    orchestrator: Arc<Orchestrator<PngFileSurface>>,
    request: SliceRequest,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match orchestrator.update(request).await {
            Ok(UpdateOutcome::Rendered(summary)) => match serde_json::to_string(&summary) {
                Ok(line) => println!("{}", line),
                Err(e) => error!(error = %e, "Failed to serialize overlay summary"),
            },
            Ok(UpdateOutcome::Superseded) => {}
            Err(e) => eprintln!("{}", e),
        }
    })
}

/// Parse `variable year month`, separated by whitespace.
fn parse_request_line(line: &str) -> Result<SliceRequest> {
    let mut parts = line.split_whitespace();
    let (Some(variable), Some(year), Some(month), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("expected `variable year month`");
    };
    let year = year.parse().with_context(|| format!("invalid year {:?}", year))?;
    let month = month.parse().with_context(|| format!("invalid month {:?}", month))?;
    Ok(SliceRequest::new(variable, year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line() {
        let request = parse_request_line("suitability_index 1969  7").unwrap();
        assert_eq!(request, SliceRequest::new("suitability_index", 1969, 7));

        assert!(parse_request_line("suitability_index 1969").is_err());
        assert!(parse_request_line("suitability_index 1969 7 extra").is_err());
        assert!(parse_request_line("suitability_index year 7").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "slice-viewer",
            "--out-dir",
            "/tmp/overlay",
            "render",
            "--variable",
            "suitability_class",
            "--year",
            "2007",
            "--month",
            "12",
        ])
        .unwrap();
        assert_eq!(args.out_dir, PathBuf::from("/tmp/overlay"));
        assert!(matches!(
            args.command,
            Command::Render { year: 2007, month: 12, .. }
        ));
    }
}
