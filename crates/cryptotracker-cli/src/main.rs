//! cryptotracker - track cryptocurrency prices from the terminal.
//!
//! Accounts, the session and the biometric unlock choice are kept on this
//! machine; prices come from the CoinGecko API.

mod app;
mod cli;

use std::io;

use anyhow::Result;
use clap::Parser;
use cryptotracker_core::config::APP_NAME;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::{Cli, Command};

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "cryptotracker.log";

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match dirs::cache_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join(APP_NAME), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let guard = init_tracing();
    info!("cryptotracker starting");

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        // Flush the file log before exiting
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut app = App::new(cli.biometrics, cli.currency)?;

    match cli.command {
        Command::Register { email } => app.register(email),
        Command::Login { email } => app.login(email),
        Command::GoogleSignIn { token } => app.google_sign_in(&token).await,
        Command::Logout { forget_biometrics } => app.logout(forget_biometrics),
        Command::Whoami => {
            app.whoami();
            Ok(())
        }
        Command::Biometric { action } => app.biometric(action),
        Command::Coins {
            filter,
            limit,
            refresh,
        } => app.coins(filter.as_deref(), limit, refresh).await,
        Command::Coin { id, days } => app.coin(&id, days).await,
        Command::Search { query } => app.search(&query).await,
    }
}
