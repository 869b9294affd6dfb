mod cli;

use anyhow::Context as _;
use clap::Parser as _;
use cli::{Cli, Command, RunArgs};
use monotonic_core::{ClockId, Seconds, Snapshot, Tester};
use std::{io, thread};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose());

    match cli.command() {
        Command::Clocks => print_clocks(),
        Command::Run(args) => run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_clocks() -> anyhow::Result<()> {
    let snapshot = Snapshot::take()?;
    for clock in ClockId::ALL {
        println!("{clock:<9} {}", Seconds(snapshot.get(clock)));
    }
    Ok(())
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let folder = args.folder();
    let config = args
        .config(&folder)
        .context("failed to build the tester config")?;

    let mut tester = Tester::start(&folder, config)
        .with_context(|| format!("failed to start the tester in {}", folder.display()))?;
    info!("logging to {}", tester.journal_path().display());

    if let Some(duration) = args.duration() {
        thread::sleep(duration);
    } else {
        info!("press Enter to stop");
        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .context("failed to read from stdin")?;
    }

    info!("stopping, this can take up to one tick period");
    let stats = tester.stop()?;

    if args.json() {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{stats}");
    }

    Ok(())
}
