//! GifCap CLI: record a screen region to an animated GIF.
//!
//! Usage:
//!   gifcap daemon              Wait for the shortcut, select, record, save
//!   gifcap record [OPTIONS]    Record once until Ctrl+C
//!   gifcap transcode <INPUT>   Convert an existing video to GIF
//!   gifcap serve               Host protocol over stdin/stdout
//!   gifcap list                List saved recordings
//!   gifcap delete <PATH>       Delete a saved recording
//!   gifcap reveal <PATH>       Show a recording in the file browser
//!   gifcap config <ACTION>     Read or change settings
//!   gifcap check               Check system capabilities

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gifcap_common::config::{ConfigStore, LoggingConfig};
use gifcap_model::Region;

mod commands;

#[derive(Parser)]
#[command(
    name = "gifcap",
    about = "Record a screen region to an animated GIF",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the shortcut and record on demand
    Daemon {
        /// Always record this region (x,y,width,height) instead of asking
        #[arg(long)]
        region: Option<Region>,
    },

    /// Record once, stopping on Ctrl+C
    Record {
        /// Region to record as x,y,width,height in screen coordinates
        #[arg(long, conflicts_with = "select")]
        region: Option<Region>,

        /// Pick the region interactively
        #[arg(long)]
        select: bool,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Convert an existing video to GIF
    Transcode {
        /// Input video
        input: PathBuf,

        /// Crop rectangle as x,y,width,height in video pixels
        #[arg(long)]
        region: Option<Region>,

        /// Output frame rate (defaults to the configured value)
        #[arg(long)]
        fps: Option<u32>,

        /// Maximum output width, 0 keeps the source width
        #[arg(long)]
        max_width: Option<u32>,

        /// Output file (defaults to the input with a .gif extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve the host protocol as JSON lines on stdin/stdout
    Serve,

    /// List saved recordings, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved recording
    Delete {
        /// File name or path inside the save folder
        path: PathBuf,
    },

    /// Show a saved recording in the file browser
    Reveal {
        /// File name or path inside the save folder
        path: PathBuf,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check system capabilities
    Check,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the current settings
    Get,

    /// Print the config file location
    Path,

    /// Change one or more settings
    Set {
        /// Folder recordings are saved to
        #[arg(long)]
        save_path: Option<String>,

        /// Global shortcut, e.g. Ctrl+Shift+G
        #[arg(long)]
        shortcut: Option<String>,

        #[arg(long)]
        fps: Option<u32>,

        /// Maximum output width, 0 keeps the source width
        #[arg(long)]
        max_width: Option<u32>,

        /// Encoder binary; an empty value restores the automatic search
        #[arg(long)]
        encoder_path: Option<PathBuf>,

        /// Encoder time limit in seconds, 0 disables it
        #[arg(long)]
        encoder_timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = Arc::new(match &cli.config {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    });

    let configured = store.get().logging;
    gifcap_common::logging::init_logging(&LoggingConfig {
        level: if cli.verbose {
            "debug".to_string()
        } else {
            configured.level.clone()
        },
        ..configured
    });

    match cli.command {
        Commands::Daemon { region } => commands::daemon::run(store, region).await,
        Commands::Record {
            region,
            select,
            duration,
        } => commands::record::run(store, region, select, duration).await,
        Commands::Transcode {
            input,
            region,
            fps,
            max_width,
            output,
        } => commands::transcode::run(store, input, region, fps, max_width, output).await,
        Commands::Serve => commands::serve::run(store).await,
        Commands::List { json } => commands::artifacts::list(store, json).await,
        Commands::Delete { path } => commands::artifacts::delete(store, path).await,
        Commands::Reveal { path } => commands::artifacts::reveal(store, path),
        Commands::Config { action } => commands::config::run(store, action),
        Commands::Check => commands::check::run(store),
    }
}
