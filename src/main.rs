use anyhow::Result;
use clap::Parser;

use arkcom_chat::app::run_repl_mode;
use arkcom_chat::cli::Cli;
use arkcom_chat::config::ClientConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.plain {
        colored::control::set_override(false);
    }

    let config = ClientConfig::from_cli(&cli)?;
    run_repl_mode(config).await
}
