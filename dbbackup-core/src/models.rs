//! Core data models for backup runs.
//!
//! A run produces exactly one [`BackupResult`] per configured server, in
//! configuration order. Results are serializable so they can be handed to
//! any notification sink.

use serde::{Deserialize, Serialize};

/// Lifecycle of one server's backup.
///
/// `Pending → Dumping → Encrypting → Cleaning → Done`, with `Failed`
/// reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupStage {
    /// Not started
    Pending,
    /// Dump tool is writing the plaintext file
    Dumping,
    /// Plaintext is being sealed
    Encrypting,
    /// Plaintext is being removed
    Cleaning,
    /// Encrypted backup is in place
    Done,
    /// Backup was abandoned
    Failed,
}

impl BackupStage {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for BackupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupStage::Pending => write!(f, "pending"),
            BackupStage::Dumping => write!(f, "dumping"),
            BackupStage::Encrypting => write!(f, "encrypting"),
            BackupStage::Cleaning => write!(f, "cleaning"),
            BackupStage::Done => write!(f, "done"),
            BackupStage::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one server's backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupResult {
    /// Server the result belongs to
    pub server_name: String,
    /// Whether the encrypted backup was written
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

impl BackupResult {
    /// Creates a successful result.
    pub fn success(server_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            success: true,
            message: message.into(),
        }
    }

    /// Creates a failed result.
    pub fn failure(server_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            success: false,
            message: message.into(),
        }
    }
}
