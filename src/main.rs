use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skill_roadmap::app::RoadmapApp;
use skill_roadmap::client::{HttpBackend, RoadmapBackend};
use skill_roadmap::config::EngineConfig;
use skill_roadmap::server::LocalBackend;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Roadmap server to talk to
    #[arg(long, conflicts_with = "data")]
    server: Option<String>,

    /// Roadmap definition JSON; runs without a server
    #[arg(long)]
    data: Option<PathBuf>,

    /// Progress file used together with --data
    #[arg(long, requires = "data")]
    progress: Option<PathBuf>,

    #[arg(long, default_value = "x")]
    graph: String,

    /// Engine settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides RUST_LOG, e.g. "debug" or "skill_roadmap=trace"
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level {level}"))?
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("skill_roadmap=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn open_backend(args: &Args, config: &EngineConfig) -> Result<(Arc<dyn RoadmapBackend>, String)> {
    if let Some(data) = &args.data {
        let progress = args
            .progress
            .clone()
            .unwrap_or_else(|| data.with_extension("progress.json"));
        let backend = LocalBackend::open(data, &progress, config)?;
        let source = format!("{} ({})", data.display(), progress.display());
        return Ok((Arc::new(backend), source));
    }

    let server = args.server.as_deref().unwrap_or(DEFAULT_SERVER);
    let backend =
        HttpBackend::new(server).with_context(|| format!("failed to create client for {server}"))?;
    Ok((Arc::new(backend), server.to_owned()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).context("failed to load engine config")?,
        None => EngineConfig::default(),
    };
    let (backend, source) = open_backend(&args, &config)?;
    info!(%source, graph = %args.graph, "starting roadmap viewer");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let graph = args.graph.clone();
    eframe::run_native(
        "skill-roadmap",
        options,
        Box::new(move |cc| {
            Ok(Box::new(RoadmapApp::new(
                cc,
                config,
                graph,
                backend,
                source,
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
