mod cmd;
mod config;
mod error;

use clap::Parser;
use config::{Cli, Commands};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping");
                interrupt.cancel();
            }
            Err(e) => tracing::error!(error = %e, "unable to listen for ctrl-c"),
        }
    });

    let result = match cli.command {
        Commands::Read(args) => cmd::read::run(&args, &token).await,
        Commands::Write(args) => cmd::write::run(&args, &token).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
