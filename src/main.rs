use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use provision::config_manager::{SettingsOverrides, load_settings};
use provision::context::ProvisionContext;
use provision::prompt::DialoguerPrompter;
use provision::{Cli, commands};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout belongs to the prompts and progress output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let overrides = SettingsOverrides {
        resources: cli.resources,
        repo_root: cli.repo_root.clone(),
    };
    let settings = load_settings(&overrides).context("Failed to load settings")?;

    let mut ctx = ProvisionContext::new(settings)?;
    let mut prompter = DialoguerPrompter::new();
    let result = commands::handle_command(&ctx, &mut prompter, &cli.command);

    if let Err(err) = ctx.teardown() {
        warn!(error = %format!("{:#}", err), "failed to remove extracted resources");
    }
    result
}

/// Help and version exit 0; any usage error exits 1 like every other failure.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    }
}

fn main() {
    let cli = parse_cli();
    init_tracing(cli.verbose);

    // The context is dropped inside run, before the process exits
    if let Err(err) = run(&cli) {
        eprintln!("{}: {:#}", commands::failure_message(&cli.command), err);
        std::process::exit(1);
    }
}
