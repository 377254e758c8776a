pub mod capture;
pub mod cli;
pub mod db;
pub mod history;
pub mod http;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use capture::{
    CaptureController, CaptureNotice, DecodeEvent, FixedLocation, Location, LocationProvider,
    NoLocation,
};
use cli::{CaptureArgs, Cli, Command};
use db::Database;
use settings::Settings;
use utils::logging::init_logging;

/// Shared handles passed to route handlers and in-app commands.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?.with_overrides(cli.overrides());
    init_logging(&settings.log_level);

    info!("qrscan starting up...");

    let database = Database::new(settings.database_path.clone())?;
    let state = AppState::new(database);

    match cli.command {
        Command::Serve { .. } => run_server(state, &settings).await,
        Command::Capture(args) => run_capture(state, args).await,
        Command::History => print_history(&state).await,
        Command::Delete { id } => delete_one(&state, id).await,
    }
}

async fn run_server(state: AppState, settings: &Settings) -> Result<()> {
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        signal_token.cancel();
    });

    http::serve(state, settings.listen_addr, shutdown).await
}

fn location_provider(args: &CaptureArgs) -> Arc<dyn LocationProvider> {
    match (args.latitude, args.longitude) {
        (Some(latitude), Some(longitude)) => Arc::new(FixedLocation(Location {
            latitude,
            longitude,
            altitude: args.altitude,
            accuracy: args.accuracy,
        })),
        _ => Arc::new(NoLocation),
    }
}

async fn run_capture(state: AppState, args: CaptureArgs) -> Result<()> {
    let mut controller = CaptureController::new();
    let mut notices = controller.start_capture(state.db.clone(), location_provider(&args))?;

    let reporter = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice {
                CaptureNotice::Saved(scan) => println!("saved {}", scan.summary()),
                CaptureNotice::LocationUnavailable(err) => eprintln!("note: {err}"),
                CaptureNotice::SaveFailed(message) => eprintln!("error: {message}"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break false;
                };
                if line.is_empty() {
                    continue;
                }
                controller.submit(DecodeEvent::now(line)).await?;
            }
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    if interrupted {
        warn!("Capture interrupted; pending decodes dropped");
        controller.cancel_capture().await?;
    } else {
        controller.stop_capture().await?;
    }

    reporter
        .await
        .map_err(|err| anyhow!("notice reporter failed: {err}"))
}

async fn print_history(state: &AppState) -> Result<()> {
    let scans = history::commands::list_scans(state)
        .await
        .map_err(anyhow::Error::msg)?;

    if scans.is_empty() {
        println!("No scans recorded yet.");
    }
    for scan in scans {
        println!("{}", scan.summary());
    }
    Ok(())
}

async fn delete_one(state: &AppState, scan_id: i64) -> Result<()> {
    let removed = history::commands::delete_scan(state, scan_id)
        .await
        .map_err(anyhow::Error::msg)?;

    if removed {
        println!("Deleted scan {scan_id}");
    } else {
        println!("Scan {scan_id} not found");
    }
    Ok(())
}
