use clap::Parser;
use cuy_farm::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Api => cli::api::run().await,
        Command::Alerts(args) => cli::alerts::run(args).await,
    }
}
