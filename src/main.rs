use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::sync::Mutex;
use tasker::config::{Cli, LogTarget};
use tasker::password::Pbkdf2Hasher;
use tasker::shell::Shell;
use tasker::storage::{FileBackend, StorageBackend};
use tasker::ui::Console;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match cli.log_target() {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let stdin = io::stdin();
    let interactive = stdin.is_terminal() && io::stdout().is_terminal();
    if cli.log_target().mixes_with_ui(interactive) {
        warn!("logging to stdout on a terminal; use --log 2 or a file to keep the menus readable");
    }

    let backend = FileBackend::new(&cli.data_dir);
    info!(data_dir = %backend.location(), "starting tasker");

    let console = Console::new(stdin.lock(), io::stdout()).interactive(interactive);
    let hasher = Pbkdf2Hasher::with_iterations(cli.pbkdf2_iterations);

    let mut shell = Shell::new(console, Box::new(backend), Box::new(hasher));
    shell.run().context("terminal I/O failed")?;
    Ok(())
}
