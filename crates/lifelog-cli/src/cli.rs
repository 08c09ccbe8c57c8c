//! CLI argument parsing and command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Build and query a semantic index over your personal data.
#[derive(Parser, Debug)]
#[command(name = "lifelog", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "LIFELOG_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the data directory and rebuild the index.
    Build {
        /// Data directory (overrides `ingest.data_dir`).
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Retrieve the snippets closest to a query.
    Search(SearchArgs),

    /// Show index state and per-collection counts.
    Status,

    /// Configuration operations.
    Config(ConfigCommand),
}

/// Arguments for `lifelog search`.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Natural-language query.
    pub query: String,

    /// Number of candidates to rank (defaults to `index.default_top_k`).
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Keep only hits from this collection (repeatable).
    #[arg(long = "collection")]
    pub collections: Vec<String>,

    /// Show the L2 distance of each hit.
    #[arg(long)]
    pub scores: bool,

    /// Widen the candidate window until `top_k` filtered hits are found.
    #[arg(long)]
    pub expand: bool,

    /// Print hits as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the effective configuration as TOML.
    Show,

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command() {
        let args = CliArgs::try_parse_from(["lifelog"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_build_with_data_dir() {
        let args = CliArgs::try_parse_from(["lifelog", "build", "--data", "/tmp/data"]).unwrap();
        match args.command {
            Some(Command::Build { data }) => assert_eq!(data, Some(PathBuf::from("/tmp/data"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_flags() {
        let args = CliArgs::try_parse_from([
            "lifelog",
            "-v",
            "search",
            "how did I sleep",
            "-k",
            "3",
            "--collection",
            "wearable",
            "--collection",
            "chat_history",
            "--scores",
            "--expand",
            "--json",
        ])
        .unwrap();
        assert!(args.verbose);
        let Some(Command::Search(search)) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.query, "how did I sleep");
        assert_eq!(search.top_k, Some(3));
        assert_eq!(search.collections, vec!["wearable", "chat_history"]);
        assert!(search.scores && search.expand && search.json);
    }

    #[test]
    fn test_search_defaults() {
        let args = CliArgs::try_parse_from(["lifelog", "search", "steps"]).unwrap();
        let Some(Command::Search(search)) = args.command else {
            panic!("expected search");
        };
        assert!(search.top_k.is_none());
        assert!(search.collections.is_empty());
        assert!(!search.scores && !search.expand && !search.json);
    }

    #[test]
    fn test_search_requires_query() {
        assert!(CliArgs::try_parse_from(["lifelog", "search"]).is_err());
    }

    #[test]
    fn test_config_init() {
        let args =
            CliArgs::try_parse_from(["lifelog", "config", "init", "--file", "c.toml", "--force"])
                .unwrap();
        let Some(Command::Config(cmd)) = args.command else {
            panic!("expected config");
        };
        match cmd.command {
            ConfigAction::Init { file, force } => {
                assert_eq!(file.as_deref(), Some("c.toml"));
                assert!(force);
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
