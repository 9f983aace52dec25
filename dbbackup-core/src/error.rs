//! Error types with credential sanitization.
//!
//! Error messages never carry the encryption secret, derived key material or
//! database passwords. Dump tool failures are reported by exit status, never
//! by echoing the command line.

use thiserror::Error;

/// Main error type for dbbackup operations.
///
/// # Security
/// All error messages are sanitized to prevent credential leakage.
#[derive(Debug, Error)]
pub enum DbBackupError {
    /// Missing or malformed configuration or environment
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// External dump tool could not be spawned or exited unsuccessfully
    #[error("Dump process failed: {context}")]
    Process {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Cipher could not be initialized (malformed key)
    #[error("Cipher setup failed: {context}")]
    CryptoSetup { context: String },

    /// Ciphertext blob is structurally invalid
    #[error("Invalid ciphertext format: {context}")]
    Format { context: String },

    /// Authentication tag did not verify
    #[error("Decryption failed (wrong key or corrupted data)")]
    Authentication,

    /// Result notification could not be delivered
    #[error("Notification delivery failed: {context}")]
    Notification {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results with DbBackupError
pub type Result<T> = std::result::Result<T, DbBackupError>;

impl DbBackupError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a process error for a dump tool that could not be started
    pub fn spawn_failed(program: &str, source: std::io::Error) -> Self {
        Self::Process {
            context: format!("failed to start '{}'", program),
            source: Some(source),
        }
    }

    /// Creates a process error for a dump tool that exited unsuccessfully
    ///
    /// Only the program name, exit status and the tool's own stderr are
    /// included; the argument list carries the database password.
    pub fn process_exited(program: &str, status: std::process::ExitStatus, stderr: &str) -> Self {
        let context = if stderr.is_empty() {
            format!("'{}' exited with {}", program, status)
        } else {
            format!("'{}' exited with {}: {}", program, status, stderr)
        };
        Self::Process {
            context,
            source: None,
        }
    }

    /// Creates a cipher setup error
    pub fn crypto_setup(context: impl Into<String>) -> Self {
        Self::CryptoSetup {
            context: context.into(),
        }
    }

    /// Creates a ciphertext format error
    pub fn format(context: impl Into<String>) -> Self {
        Self::Format {
            context: context.into(),
        }
    }

    /// Creates a notification delivery error
    pub fn notification<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Notification {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a notification error without an underlying cause
    pub fn notification_rejected(context: impl Into<String>) -> Self {
        Self::Notification {
            context: context.into(),
            source: None,
        }
    }
}
