//! restash command-line interface

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod tracing;

use crate::cli::{Cli, CliError, Commands, EXIT_OK, exit_code_for, render_error};
use crate::tracing::{Level, TracingConfig};
use std::time::Duration;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: Level::from(cli.level),
        ..Default::default()
    };
    // Ignore error if tracing already initialized
    let _ = crate::tracing::init_tracing(tracing_config);

    let exit_code = match run(cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Key { values } => {
            println!("{}", commands::key::execute_key(&values));
        }
        Commands::Prepare { outputs } => {
            let count = commands::outputs::execute_prepare(outputs)?;
            println!("prepared {count} outputs");
        }
        Commands::Pack {
            key,
            task,
            execution_time_ms,
            outputs,
        } => {
            let config = commands::outputs::resolve_config(cli.cache_dir)?;
            let entries = commands::outputs::execute_pack(
                &config,
                &key,
                &task,
                Duration::from_millis(execution_time_ms),
                outputs,
            )?;
            println!("stored {key} ({entries} entries)");
        }
        Commands::Unpack { key, outputs } => {
            let config = commands::outputs::resolve_config(cli.cache_dir)?;
            match commands::outputs::execute_unpack(&config, &key, outputs)? {
                None => println!("miss"),
                Some(restored) => match restored.origin {
                    Some(origin) => println!(
                        "restored {} entries (from {} in {}ms)",
                        restored.entries, origin.task_path, origin.execution_time_ms
                    ),
                    None => println!("restored {} entries", restored.entries),
                },
            }
        }
    }
    Ok(())
}
