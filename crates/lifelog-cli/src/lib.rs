//! Command-line interface for Lifelog.
//!
//! `lifelog build` turns a directory of personal data exports into a
//! semantic index; `lifelog search` retrieves the stored snippets closest to
//! a question.
//!
//! # Modules
//!
//! - [`cli`]: Argument parsing
//! - [`config`]: [`LifelogConfig`] loading (file, env, defaults)
//! - [`app`]: Command dispatch and logging setup
//! - [`index_handlers`]: `build`, `search`, `status`
//! - [`config_handlers`]: `config path|show|init`

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;
pub mod index_handlers;

pub use app::{LifelogApp, init_logging};
pub use cli::{CliArgs, Command, ConfigAction, SearchArgs};
pub use config::LifelogConfig;
