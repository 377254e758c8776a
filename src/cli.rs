use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::settings::SettingsOverrides;

#[derive(Debug, Parser)]
#[command(name = "qrscan", version, about = "Record QR scans and browse the scan history")]
pub struct Cli {
    /// JSON settings file
    #[arg(long, env = "QRSCAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "QRSCAN_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Default log filter (RUST_LOG still wins)
    #[arg(long, env = "QRSCAN_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the scan routes over HTTP
    Serve {
        #[arg(long, env = "QRSCAN_LISTEN")]
        listen: Option<SocketAddr>,
    },
    /// Record decoded payloads read from stdin, one per line
    Capture(CaptureArgs),
    /// Print stored scans, newest first
    History,
    /// Delete one scan by id
    Delete { id: i64 },
}

#[derive(Debug, Clone, Args)]
pub struct CaptureArgs {
    #[arg(long, allow_negative_numbers = true, requires = "longitude")]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true, requires = "latitude")]
    pub longitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters
    #[arg(long)]
    pub accuracy: Option<f64>,
}

impl Cli {
    pub fn overrides(&self) -> SettingsOverrides {
        let listen_addr = match &self.command {
            Command::Serve { listen } => *listen,
            _ => None,
        };

        SettingsOverrides {
            database_path: self.db_path.clone(),
            listen_addr,
            log_level: self.log_level.clone(),
        }
    }
}
