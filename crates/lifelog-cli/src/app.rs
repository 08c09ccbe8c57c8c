//! The Lifelog CLI application.

use lifelog_core::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command};
use crate::config::LifelogConfig;
use crate::{config_handlers, index_handlers};

// ============================================================================
// LifelogApp
// ============================================================================

/// CLI application holding the resolved configuration.
#[derive(Debug, Clone)]
pub struct LifelogApp {
    config: LifelogConfig,
    version: String,
}

impl LifelogApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = LifelogConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create an application with an explicit configuration.
    pub fn new(config: LifelogConfig) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &LifelogConfig {
        &self.config
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        match args.command {
            Some(Command::Build { data }) => index_handlers::handle_build(&self.config, data).await,
            Some(Command::Search(search)) => {
                index_handlers::handle_search(&self.config, search).await
            }
            Some(Command::Status) => index_handlers::handle_status(&self.config).await,
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!("lifelog {}: use --help for usage", self.version);
                Ok(())
            }
        }
    }
}

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
/// `log` records from the library crates are forwarded to the subscriber.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// Tests
// ============================================================================
