use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dept_checkout::{AppState, Config};

mod cli;
#[cfg(feature = "tui-support")]
mod tui;

use crate::cli::{Cli, Commands};

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "dept_checkout=debug,info" } else { "info" })
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::init().context("Failed to load configuration")?;

    // The dashboard owns the terminal, so its logs go to a daily file instead.
    #[cfg(feature = "tui-support")]
    let _guard = if is_tui(&cli.command) {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create {}", config.log_dir.display()))?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "dept-checkout.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(true))
            .with_target(true)
            .with_ansi(false)
            .with_writer(non_blocking)
            .init();
        Some(guard)
    } else {
        None
    };

    if !is_tui(&cli.command) {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter(cli.verbose))
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    let mut state = AppState::new(config)?;
    cli::run(cli.command, &mut state).await
}

#[cfg(feature = "tui-support")]
fn is_tui(command: &Commands) -> bool {
    matches!(command, Commands::Tui)
}

#[cfg(not(feature = "tui-support"))]
fn is_tui(_command: &Commands) -> bool {
    false
}
