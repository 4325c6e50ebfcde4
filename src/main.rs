//! Entry point for `audit-translations`.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use rule_audit::cli::{
    Cli,
    run,
};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_root = std::env::current_dir().ok();

    let mut stdout = std::io::stdout().lock();
    match run(&cli, config_root, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = stdout.flush();
            let _ = writeln!(std::io::stderr().lock(), "Error: {err}");
            ExitCode::FAILURE
        }
    }
}
