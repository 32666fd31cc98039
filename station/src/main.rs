//! Station daemon: registers with the directory, listens for peer
//! connections, and relays mesh radio traffic across the federation.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod app;
mod config;
mod peer_resolver;
mod radio;

use bth_common::StationId;
use config::StationConfig;

/// bth-station - federation bridge daemon
#[derive(Parser, Debug)]
#[command(name = "bth-station")]
#[command(about = "Relay station daemon for the mesh bridge federation")]
struct Args {
    /// Path to the station configuration file, created on first run.
    #[arg(short, long, default_value = "station.toml")]
    config: PathBuf,

    /// Directory holding the registry database and other runtime state.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// This station's identifier, required only when `config` does not yet
    /// exist.
    #[arg(long)]
    station_id: Option<String>,

    /// Display name advertised in STATION_INFO, required only on first run.
    #[arg(long, default_value = "bth-station")]
    display_name: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Generate (or regenerate) the configuration file and exit without
    /// starting the daemon.
    #[arg(long)]
    init_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("bth-station starting");

    let station_id = args
        .station_id
        .map(StationId::new)
        .transpose()?;

    let station_config = StationConfig::load_or_init(&args.config, station_id, args.display_name)?;
    info!(station_id = %station_config.identity.station_id, "configuration ready");

    if args.init_only {
        info!(path = %args.config.display(), "configuration written, exiting");
        return Ok(());
    }

    std::fs::create_dir_all(&args.data_dir)?;
    app::run(station_config, &args.data_dir).await
}
