//! Configuration types for a backup run.
//!
//! This module contains all configuration structures assembled at startup:
//! - `ServerConfig`: one database server and its table selection
//! - `BackupConfig`: the JSON server list
//! - `Settings`: values taken from the process environment
//!
//! # Security
//! Database passwords and the encryption secret are redacted from `Debug`
//! output and zeroized when dropped.

mod server;
mod settings;

pub use server::{BackupConfig, ServerConfig, TableSelection};
pub use settings::{BackupPaths, DEFAULT_DUMP_COMMAND, Settings, WebhookSettings, env_vars};
