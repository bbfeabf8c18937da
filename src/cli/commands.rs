//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: schedule watchers until stopped (Ctrl-C)
//! - check: run every watcher once and report
//! - validate: load and build the configuration only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tickwatch - periodic watchers with hooks and remote control
#[derive(Parser, Debug)]
#[command(name = "tickwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run watchers on their intervals until interrupted
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },

    /// Run every watcher once and exit non-zero if any is invalid
    Check,

    /// Validate the configuration without running anything
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["tickwatch", "run"]);
        assert_eq!(cli.command, Commands::Run { once: false });
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_parse_run_once_with_globals() {
        let cli = Cli::parse_from(["tickwatch", "run", "--once", "-v", "--config", "/tmp/tw.yml"]);
        assert_eq!(cli.command, Commands::Run { once: true });
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tw.yml")));
    }

    #[test]
    fn test_parse_check_and_validate() {
        assert_eq!(Cli::parse_from(["tickwatch", "check"]).command, Commands::Check);
        assert_eq!(Cli::parse_from(["tickwatch", "validate"]).command, Commands::Validate);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["tickwatch"]).is_err());
    }
}
