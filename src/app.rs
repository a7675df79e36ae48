use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose,
        command,
    } = cli;

    init_tracing(verbose);
    let ctx = AppContext::bootstrap(profile, json, verbose)?;

    match command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(args) => commands::run::run(&ctx, args).await,
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::Prompts(args) => commands::prompts::run(&ctx, args.command).await,
    }
}

pub fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Diagnostics go to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
