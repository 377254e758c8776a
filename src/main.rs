use clap::Parser;

use qrscan_lib::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    qrscan_lib::run(Cli::parse()).await
}
