use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use orientation_host_lib::{
    store::OrientationStore, AppPaths, FileStore, SessionConfig, SystemClock,
};
use tokio_serial::available_ports;

mod create_source;
mod export;
mod history;
mod live;

#[derive(Parser)]
#[command(name = "Orientation Logger")]
#[command(bin_name = "orientation-cli")]
struct Cli {
    /// Where the record log and CSV export live, defaults to the user data dir
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the serial ports connected to the host")]
    Detect,
    Live(LiveArgs),
    History(HistoryArgs),
    Export(ExportArgs),
    #[command(about = "Delete every stored record")]
    Reset,
}

#[derive(clap::Args)]
#[command(about = "Sample, persist and display orientation until quit")]
struct LiveArgs {
    /// Read sensors from this serial port instead of the simulator
    #[arg(long)]
    serial: Option<String>,

    #[arg(long, default_value_t = 115200)]
    baud: u32,

    /// Simulate a device without magnetometer
    #[arg(long, action)]
    no_mag: bool,

    /// Save interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

#[derive(clap::Args)]
#[command(about = "Print the newest stored records")]
struct HistoryArgs {
    #[arg(long, short, default_value_t = orientation_host_lib::config::HISTORY_LIMIT)]
    limit: usize,
}

#[derive(clap::Args)]
#[command(about = "Export the full history to CSV")]
struct ExportArgs {
    /// Defaults to orientation_data.csv in the data dir
    #[arg(long, short)]
    output: Option<PathBuf>,
}

async fn open_store(data_dir: Option<PathBuf>) -> Result<(AppPaths, Arc<dyn OrientationStore>)> {
    let paths = AppPaths::resolve(data_dir)?;
    let store: Arc<dyn OrientationStore> = Arc::new(FileStore::open(&paths.database).await?);
    Ok((paths, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let args = Cli::parse();

    match args.command {
        Commands::Detect => {
            for port in available_ports()? {
                println!("{:?}", port);
            }
        }
        Commands::Live(live_args) => {
            let (paths, store) = open_store(args.data_dir).await?;
            let clock = Arc::new(SystemClock);
            let config = SessionConfig {
                save_interval: Duration::from_millis(live_args.interval_ms.max(1)),
                ..SessionConfig::default()
            };
            let source = create_source::create_source(
                live_args.serial,
                live_args.baud,
                !live_args.no_mag,
                &config,
                clock.clone(),
            )?;
            live::live(&config, &paths, source, store, clock).await?;
        }
        Commands::History(history_args) => {
            let (_, store) = open_store(args.data_dir).await?;
            history::history(store, history_args.limit).await?;
        }
        Commands::Export(export_args) => {
            let (paths, store) = open_store(args.data_dir).await?;
            let output = export_args.output.unwrap_or(paths.csv_export);
            export::export(store, output).await?;
        }
        Commands::Reset => {
            let (_, store) = open_store(args.data_dir).await?;
            let count = store.count().await?;
            store.clear().await?;
            println!("Deleted {} records", count);
        }
    }
    Ok(())
}
