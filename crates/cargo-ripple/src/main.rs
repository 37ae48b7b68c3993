mod commands;
mod error;
mod logging;
mod output;
mod signal;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "cargo-ripple")]
#[command(bin_name = "cargo-ripple")]
#[command(version = env!("CARGO_RIPPLE_VERSION"))]
#[command(about = "Publish Cargo workspace crates in dependency order", long_about = None)]
struct Cli {
    /// Path to start project discovery from (default: current directory)
    #[arg(long = "path", short = 'C', global = true)]
    path: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug); RIPPLE_LOG overrides
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(subcommand_args(std::env::args_os()));
    logging::init(cli.verbose);

    let start_path = match resolve_start_path(cli.path) {
        Ok(path) => path,
        Err(e) => {
            print_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            print_error(&CliError::Runtime(e));
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime.block_on(cli.command.execute(&start_path)) {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Drops the `ripple` argument Cargo inserts when invoked as `cargo ripple`.
fn subcommand_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    if args.get(1).is_some_and(|arg| arg == "ripple") {
        args.remove(1);
    }
    args
}

fn resolve_start_path(path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match path {
        Some(p) => Ok(p),
        None => std::env::current_dir().map_err(CliError::CurrentDir),
    }
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn cargo_prefix_is_removed() {
        let parsed = subcommand_args(args(&["cargo-ripple", "ripple", "plan"]));

        assert_eq!(parsed, args(&["cargo-ripple", "plan"]));
    }

    #[test]
    fn direct_invocation_is_untouched() {
        let parsed = subcommand_args(args(&["cargo-ripple", "plan", "ripple"]));

        assert_eq!(parsed, args(&["cargo-ripple", "plan", "ripple"]));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;

        Cli::command().debug_assert();
    }
}
