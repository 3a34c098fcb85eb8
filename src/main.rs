//! eSim installer - main entry point

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use esim_installer::cli::Cli;
use esim_installer::{
    InstallLayout, Orchestrator, PipelineMode, RunOutcome, SystemRunner, TerminalPrompt,
    process_guard, sanity,
};

/// Initialize tracing on stderr; `RUST_LOG` overrides the default level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    // Usage errors exit before anything else is touched
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    init_logger();
    info!("eSim installer starting up");

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    match run(cli.mode()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(mode: PipelineMode) -> anyhow::Result<u8> {
    let layout = InstallLayout::discover().context("failed to determine install layout")?;
    debug!("layout: {:?}", layout);

    if mode == PipelineMode::Install && !sanity::run_preflight_checks(layout.escalation) {
        return Ok(1);
    }

    let mut runner = SystemRunner::new();
    let mut prompt = TerminalPrompt;
    let mut orchestrator = Orchestrator::new(layout, &mut runner, &mut prompt);

    let outcome = orchestrator.run(mode);
    if let RunOutcome::Failed { step, error, .. } = &outcome {
        debug!("failed at {:?}: {}", step, error);
    }
    Ok(outcome.exit_code())
}
