//! Configuration for the Lifelog CLI.
//!
//! Provides the [`LifelogConfig`] struct that loads from TOML files,
//! environment variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `LIFELOG_CONFIG` environment variable
//! 3. XDG default: `~/.config/lifelog/config.toml`
//! 4. Built-in defaults
//!
//! Environment overrides use the `LIFELOG_` prefix with one section per
//! table, e.g. `LIFELOG_EMBEDDER_PROVIDER=mock`. confyg passes env values
//! as strings, so only string fields can be overridden this way.

use std::path::PathBuf;

use confyg::{Confygery, env};
use lifelog_core::{Error, Result};
use lifelog_ingest::IngestConfig;
use lifelog_vector::{EmbedderConfig, RetrieverConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LIFELOG_CONFIG";

const ENV_PREFIX: &str = "LIFELOG";

/// Main configuration for the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifelogConfig {
    /// Snapshot locations and search defaults.
    pub index: RetrieverConfig,

    /// Embedding provider selection.
    pub embedder: EmbedderConfig,

    /// Data directory and chunking.
    pub ingest: IngestConfig,
}

impl LifelogConfig {
    /// Load configuration from file, environment, and defaults.
    ///
    /// A config path that does not exist is not an error; defaults apply.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level(ENV_PREFIX);
        env_opts.add_section("index");
        env_opts.add_section("embedder");
        env_opts.add_section("ingest");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        resolve_config_path_from(explicit, std::env::var(CONFIG_ENV_VAR).ok())
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("lifelog").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

fn resolve_config_path_from(explicit: Option<&str>, from_env: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    if let Some(path) = from_env.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    LifelogConfig::default_config_path()
}

// ============================================================================
// Tests
// ============================================================================
