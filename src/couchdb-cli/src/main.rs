//! `couchdb` - command line client for CouchDB servers

use anyhow::Result;
use clap::Parser;
use couchdb_rs::Server;

mod cli;
mod telemetry;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = telemetry::init_telemetry(cli.log_dir.as_deref())?;

    let config = cli.client_config()?;
    let server = Server::from_config(&config)?;
    tracing::debug!(url = %server.url(), auth_method = %config.auth_method, "Connecting");

    let output = cli::run(&cli.command, &server).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
