//! Per-server backup pipeline: dump, encrypt, remove plaintext, record.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, error, info, warn};

use super::dump::DumpTool;
use crate::config::ServerConfig;
use crate::error::{DbBackupError, Result};
use crate::models::{BackupResult, BackupStage};
use crate::security::SymmetricKey;
use crate::security::encryption::{ENCRYPTED_EXTENSION, append_extension, encrypt_file};

/// Timestamp format used in backup and log file names.
///
/// `YYYYMMDD_HHMMSS`, the naming the legacy backup tool used.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Formats `now` for use in artifact file names.
pub fn file_timestamp(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// File locations for one server's backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFiles {
    /// `<output>/<server>`
    pub directory: PathBuf,
    /// `<output>/<server>/db_<server>_backup_<ts>.sql`
    pub plaintext: PathBuf,
    /// `<output>/<server>/db_<server>_backup_<ts>.sql.enc`
    pub encrypted: PathBuf,
}

impl BackupFiles {
    /// Computes the file layout for `server_name` at `timestamp`.
    pub fn new(output_dir: &Path, server_name: &str, timestamp: &str) -> Self {
        let directory = output_dir.join(server_name);
        let plaintext = directory.join(format!("db_{}_backup_{}.sql", server_name, timestamp));
        let encrypted = append_extension(&plaintext, ENCRYPTED_EXTENSION);
        Self {
            directory,
            plaintext,
            encrypted,
        }
    }
}

/// Runs the dump → encrypt → cleanup pipeline for each server.
///
/// Servers are processed one at a time, in order. A failure is recorded in
/// that server's [`BackupResult`] and the run moves on to the next server.
pub struct BackupOrchestrator<D> {
    dump_tool: D,
    key: SymmetricKey,
    output_dir: PathBuf,
}

impl<D: DumpTool> BackupOrchestrator<D> {
    /// Creates an orchestrator writing under `output_dir`.
    pub fn new(dump_tool: D, key: SymmetricKey, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            dump_tool,
            key,
            output_dir: output_dir.into(),
        }
    }

    /// Backs up every server and returns one result per server, in order.
    pub async fn run_all(&self, servers: &[ServerConfig]) -> Vec<BackupResult> {
        let mut results = Vec::with_capacity(servers.len());
        for server in servers {
            results.push(self.run_server(server).await);
        }
        results
    }

    /// Backs up one server. Never fails; errors become a failed result.
    pub async fn run_server(&self, server: &ServerConfig) -> BackupResult {
        info!("Starting backup for server: {}", server.name);

        let files = BackupFiles::new(&self.output_dir, &server.name, &file_timestamp(Local::now()));
        let mut stage = BackupStage::Pending;

        match self.backup_server(server, &files, &mut stage).await {
            Ok(plaintext_removed) => {
                info!("Encrypted backup saved as: {}", files.encrypted.display());
                success_result(&server.name, &files, plaintext_removed)
            }
            Err(e) => {
                let failed_during = stage;
                transition(&server.name, &mut stage, BackupStage::Failed);
                error!(
                    "Error backing up server '{}' during {}: {}",
                    server.name, failed_during, e
                );
                BackupResult::failure(
                    &server.name,
                    format!(
                        "Backup failed for server '{}' during {}: {}",
                        server.name, failed_during, e
                    ),
                )
            }
        }
    }

    /// Returns whether the plaintext dump was removed.
    async fn backup_server(
        &self,
        server: &ServerConfig,
        files: &BackupFiles,
        stage: &mut BackupStage,
    ) -> Result<bool> {
        tokio::fs::create_dir_all(&files.directory)
            .await
            .map_err(|e| {
                DbBackupError::io(
                    format!("Failed to create output folder {}", files.directory.display()),
                    e,
                )
            })?;

        transition(&server.name, stage, BackupStage::Dumping);
        log_table_selection(server);
        if let Err(e) = self.dump_tool.dump(server, &files.plaintext).await {
            // A partial dump is still plaintext
            remove_if_present(&files.plaintext).await;
            return Err(e);
        }
        info!(
            "Backup successful for server '{}'. File: {}",
            server.name,
            files.plaintext.display()
        );

        transition(&server.name, stage, BackupStage::Encrypting);
        if let Err(e) = encrypt_file(&files.plaintext, &files.encrypted, &self.key).await {
            remove_if_present(&files.plaintext).await;
            remove_if_present(&files.encrypted).await;
            return Err(e);
        }

        transition(&server.name, stage, BackupStage::Cleaning);
        let removed = remove_plaintext(&files.plaintext).await;

        transition(&server.name, stage, BackupStage::Done);
        Ok(removed)
    }
}

/// A leftover plaintext copy does not fail the backup, it only adds a warning.
fn success_result(server_name: &str, files: &BackupFiles, plaintext_removed: bool) -> BackupResult {
    let mut message = format!("Encrypted backup saved as: {}", files.encrypted.display());
    if !plaintext_removed {
        message.push_str(&format!(
            " (warning: plaintext copy left at {})",
            files.plaintext.display()
        ));
    }
    BackupResult::success(server_name, message)
}

async fn remove_plaintext(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!("Deleting unencrypted backup file successful");
            true
        }
        Err(e) => {
            warn!("Warning: Unable to delete unencrypted backup file: {}", e);
            false
        }
    }
}

fn transition(server: &str, stage: &mut BackupStage, next: BackupStage) {
    debug!("Server '{}': {} -> {}", server, stage, next);
    *stage = next;
}

fn log_table_selection(server: &ServerConfig) {
    use crate::config::TableSelection;

    match server.table_selection() {
        TableSelection::Include(tables) => {
            for table in tables {
                info!("--tables: {}", table);
            }
        }
        TableSelection::Exclude(tables) => {
            for table in tables {
                info!("--ignore-table: {}", table);
            }
        }
        TableSelection::All => {}
    }
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Unable to remove {}: {}", path.display(), e),
    }
}
