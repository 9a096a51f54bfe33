//! discover-replay - feed a recorded server event sequence through the
//! discovery engine and print the resulting node set as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use audio_discover::scenario::Replay;
use audio_discover::{LocalAudioManager, PriorityRouter, Scenario};
use clap::Parser;
use discoverconf::DiscoverConf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "discover-replay")]
#[command(about = "Replay audio server events through the node discovery engine")]
#[command(version)]
struct Args {
    /// JSON file holding the list of server events
    scenario: PathBuf,

    /// Config file replacing ./audio-discover.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured one
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, sources) = DiscoverConf::load_with_sources_from(args.config.as_deref())
        .context("Failed to load configuration")?;

    let filter = args
        .log_level
        .as_deref()
        .unwrap_or(&config.telemetry.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).context("Invalid log filter")?)
        .with_writer(std::io::stderr)
        .init();

    for file in &sources.files {
        info!("loaded config from {}", file.display());
    }
    for var in &sources.env_overrides {
        info!("config overridden by {}", var);
    }

    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    info!("replaying {} events", scenario.events.len());

    let mut replay = Replay::new(
        config.discover,
        Box::new(LocalAudioManager::new()),
        Box::new(PriorityRouter::new()),
    );
    replay.run(&scenario);

    let nodes = replay.engine.nodes();
    println!("{}", serde_json::to_string_pretty(&nodes)?);

    Ok(())
}
