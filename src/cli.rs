use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hvconverge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge Hyper-V hosts to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Document to load (default: hosts.toml in the config directory)
    #[arg(short, long, global = true, env = "HVCONVERGE_FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show whether each declared resource exists and is in sync
    Status(TargetArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Create missing resources and correct drift
    Apply(ApplyArgs),

    /// Check the document without contacting any host
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Limit to a resource kind or id (e.g. "switch", "VirtualMachine.web01")
    pub target: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Limit to a resource kind or id
    pub target: Option<String>,

    /// Print changes as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Limit to a resource kind or id
    pub target: Option<String>,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli =
            Cli::try_parse_from(["hvconverge", "-vv", "apply", "switch", "--dry-run", "-f", "lab.toml"])
                .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, Some(PathBuf::from("lab.toml")));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("switch"));
        assert!(args.dry_run);
        assert!(!args.yes);
    }
}
