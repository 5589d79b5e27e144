//! `shelf` command line.
//!
//! ```bash
//! shelf serve      # apply migrations, then run the API
//! shelf migrate    # apply pending migrations and exit
//! shelf config     # print the effective settings, secrets redacted
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Personal book-tracking API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and serve the HTTP API
    Serve,

    /// Apply pending migrations and exit
    Migrate,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry);

    match cli.command {
        Commands::Serve => shelf_app::serve(settings).await,
        Commands::Migrate => {
            let applied = shelf_app::migrate(&settings).await?;
            tracing::info!(applied, "migrations complete");
            Ok(())
        }
        Commands::Config => {
            println!("{settings:#?}");
            Ok(())
        }
    }
}
