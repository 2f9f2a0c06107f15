//! fingerfx CLI
//!
//! Command-line interface for replaying hand tracks through the effect engine.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use fingerfx::cli::commands;
use fingerfx::cli::{Cli, Commands};
use fingerfx::FxError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    info!("fingerfx v{}", env!("CARGO_PKG_VERSION"));

    let settings = commands::load_settings(cli.settings.as_deref())
        .map_err(report)
        .context("loading settings")?;

    match cli.command {
        Commands::Process {
            track,
            input,
            output,
            mode,
            no_record,
        } => commands::process(
            settings,
            &track,
            input.as_deref(),
            &output,
            mode.map(Into::into),
            !no_record,
        )
        .await
        .map_err(report)
        .with_context(|| format!("processing {}", track.display())),
        Commands::Classify { track, json } => commands::classify(&settings, &track, json)
            .map_err(report)
            .with_context(|| format!("classifying {}", track.display())),
        Commands::Settings { output } => {
            commands::settings(&settings, output.as_deref()).map_err(report)
        }
    }
}

/// Print recovery hints before handing the error to anyhow
fn report(err: FxError) -> anyhow::Error {
    for hint in err.recovery_suggestions() {
        eprintln!("hint: {}", hint);
    }
    anyhow::Error::new(err)
}
