//! Core library for dbbackup.
//!
//! Runs scheduled MySQL backups: each configured server is dumped with an
//! external tool, the dump is sealed with AES-256-GCM, the plaintext is
//! removed and the per-server results are posted to a webhook.
//!
//! # Security Guarantees
//! - Passwords and the encryption secret never appear in logs or errors
//! - Every encryption uses a fresh random nonce
//! - Plaintext dumps are created owner-only and removed once sealed
//! - Decryption writes nothing unless the authentication tag verifies
//!
//! # Layout
//! - [`config`]: server list and environment settings
//! - [`security`]: key derivation and the encrypted file format
//! - [`backup`]: dump tool execution and the per-server pipeline
//! - [`report`]: webhook notification of run results

pub mod backup;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod security;

// Re-export commonly used types
pub use backup::{BackupOrchestrator, CommandDumpTool, DumpTool};
pub use config::{BackupConfig, ServerConfig, Settings};
pub use error::{DbBackupError, Result};
pub use models::{BackupResult, BackupStage};
pub use report::{Notifier, ResultReporter, WebhookNotifier, WebhookPayload};
pub use security::{SymmetricKey, derive_key};
