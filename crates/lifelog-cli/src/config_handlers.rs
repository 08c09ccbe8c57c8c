//! Handler functions for config CLI commands.
//!
//! Implements `lifelog config {path,show,init}`.

use std::path::PathBuf;

use lifelog_core::{Error, Result, write_atomic};

use crate::cli::ConfigAction;
use crate::config::LifelogConfig;

// ============================================================================
// Command dispatch
// ============================================================================

/// Handle a config subcommand.
///
/// Receives the raw `--config` path (not a loaded config) because `path`
/// and `init` work before a config file exists.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(config_path),
        ConfigAction::Show => {
            let config = LifelogConfig::load(config_path)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        ConfigAction::Init { file, force } => {
            let path = init_config_file(file.as_deref(), force)?;
            println!("Config file created at {}", path.display());
            Ok(())
        }
    }
}

// ============================================================================
// Command handlers
// ============================================================================

/// Show the resolved config file path.
fn cmd_config_path(config_path: Option<&str>) -> Result<()> {
    match LifelogConfig::resolve_config_path(config_path) {
        Some(path) => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!("(file does not exist; run `lifelog config init` to create it)");
            }
            Ok(())
        }
        None => Err(Error::config(
            "Could not determine config directory for this platform",
        )),
    }
}

/// Write a default configuration file, returning its path.
pub fn init_config_file(file: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => LifelogConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }

    let toml_str = LifelogConfig::default().to_toml_string()?;
    write_atomic(&path, toml_str.as_bytes())?;
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================
