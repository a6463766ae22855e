use std::{
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use glint_core::{
    FileStorage, MemoryStorage, PageSession, Storage, SystemClock, TrackerBuilder, TrackerConfig,
    Transport, enrich::PageEnvironment, probe_transport,
};
use reqwest::Url;
use tracing_subscriber::EnvFilter;

use crate::{
    dry_run::PrintTransport,
    format::{format_duration, format_stats},
};

mod dry_run;
mod format;
mod replay;

#[derive(Parser)]
#[command(name = "glint")]
#[command(about = "Replay recorded page signals through the glint analytics pipeline")]
struct Cli {
    /// JSON-lines file of page signals
    signals: PathBuf,

    /// Ingestion endpoint (defaults to GLINT_ENDPOINT or the local functions server)
    #[arg(short, long)]
    endpoint: Option<Url>,

    /// Page URL the session starts on
    #[arg(long, default_value = "https://glint-detailing.example/")]
    url: Url,

    /// Referrer reported for the session
    #[arg(long)]
    referrer: Option<String>,

    /// User agent used for device classification
    #[arg(long)]
    user_agent: Option<String>,

    /// Initial viewport, WIDTHxHEIGHT
    #[arg(long, default_value = "1440x900", value_parser = parse_viewport)]
    viewport: (u32, u32),

    /// Touch points reported by the device
    #[arg(long, default_value_t = 0)]
    touch_points: u32,

    /// Session storage file (defaults to the user data dir)
    #[arg(long, conflicts_with = "ephemeral")]
    storage: Option<PathBuf>,

    /// Keep session state in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Print batches instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, also print each batch body
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Replay speed multiplier for recorded delays; 0 replays instantly
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_viewport(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let w = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Ok((w, h))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "glint=debug,glint_core=debug" } else { "glint=info,glint_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_storage(cli: &Cli) -> Result<Arc<dyn Storage>> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStorage::new()));
    }
    let path = cli.storage.clone().unwrap_or_else(FileStorage::default_path);
    let storage = FileStorage::open(&path)
        .with_context(|| format!("opening session storage {}", path.display()))?;
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = TrackerConfig::from_env();
    if let Some(endpoint) = cli.endpoint.clone() {
        config = config.with_endpoint(endpoint);
    }

    let mut env = PageEnvironment::new(cli.url.clone())
        .with_viewport(cli.viewport.0, cli.viewport.1)
        .with_touch_points(cli.touch_points);
    if let Some(referrer) = &cli.referrer {
        env = env.with_referrer(referrer.clone());
    }
    if let Some(ua) = &cli.user_agent {
        env = env.with_user_agent(ua.clone());
    }
    let env = Arc::new(env);

    let transport: Arc<dyn Transport> = if cli.dry_run {
        Arc::new(PrintTransport::new(cli.json))
    } else {
        probe_transport(config.endpoint.clone())
    };

    let clock = Arc::new(SystemClock);
    let tracker = TrackerBuilder::new(config.clone())
        .storage(open_storage(&cli)?)
        .environment(env.clone())
        .clock(clock.clone())
        .transport(transport.clone())
        .build()?;

    let lines = replay::load(&cli.signals).await?;

    println!(
        "\n{}  {}\n",
        style("glint").cyan().bold(),
        style("Analytics Replay").dim()
    );
    println!(
        "{} {} signals via {} → {}",
        style("✓").green().bold(),
        lines.len(),
        style(transport.name()).yellow(),
        style(&config.endpoint).dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let started = Instant::now();
    let mut page = PageSession::start(tracker.clone(), env, clock, &config);
    replay::run(&mut page, lines, cli.speed).await?;
    // Also waits for detached beacon requests to finish.
    tracker.shutdown().await;

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{} {} {}",
        style("✓").green().bold(),
        format_stats(&tracker.stats()),
        style(format!("[{}]", format_duration(started.elapsed()))).dim()
    );

    Ok(())
}
