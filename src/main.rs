use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod cli;
mod config;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG and DATABASE_URL from it take effect
    let env_file = dotenvy::dotenv().ok();
    model::init_tracing(config::DEFAULT_LOG_DIRECTIVES);
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    cli.run().await?;

    Ok(())
}
