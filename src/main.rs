mod cli;
mod commands;
mod paths;
mod progress;
mod schema;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
    };

    match cli.command {
        Command::Status(args) => commands::status::run(&ctx, args.target.as_deref()),
        Command::Diff(args) => commands::diff::run(&ctx, args.target.as_deref(), args.json),
        Command::Apply(args) => {
            commands::apply::run(&ctx, args.target.as_deref(), args.dry_run, args.yes)
        }
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hvconverge", &mut io::stdout());
            Ok(())
        }
    }
}
