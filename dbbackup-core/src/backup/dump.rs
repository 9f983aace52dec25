//! External dump tool invocation.
//!
//! The dump tool (`mysqldump` or a compatible program) writes the database
//! to stdout. Stdout is handed the plaintext file directly, so the dump is
//! never buffered in this process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{ServerConfig, TableSelection};
use crate::error::{DbBackupError, Result};

/// Longest stderr excerpt carried into a process error.
const STDERR_EXCERPT_LIMIT: usize = 512;

/// Produces a plaintext dump of one server.
#[async_trait]
pub trait DumpTool: Send + Sync {
    /// Writes a dump of `server` to `destination`.
    ///
    /// # Errors
    /// - [`DbBackupError::Io`] if the destination cannot be created
    /// - [`DbBackupError::Process`] if the tool cannot be started or exits
    ///   unsuccessfully
    async fn dump(&self, server: &ServerConfig, destination: &Path) -> Result<()>;
}

/// Builds the dump tool argument list for `server`.
///
/// Credentials and connection flags come first, then the table selection:
/// - include list: `--tables <db> <t1> <t2> ...`
/// - exclude list: `<db> --ignore-table=<db>.<t> ...`
/// - neither: `<db>`
///
/// # Example
/// ```rust
/// use dbbackup_core::backup::dump_arguments;
/// use dbbackup_core::config::ServerConfig;
///
/// let server = ServerConfig::new("main", "root", "pw", "localhost", 3306, "app");
/// assert_eq!(
///     dump_arguments(&server),
///     ["-uroot", "-ppw", "-hlocalhost", "-P3306", "app"]
/// );
/// ```
pub fn dump_arguments(server: &ServerConfig) -> Vec<String> {
    let mut args = vec![
        format!("-u{}", server.user),
        format!("-p{}", server.password),
        format!("-h{}", server.host),
        format!("-P{}", server.port),
    ];

    match server.table_selection() {
        TableSelection::Include(tables) => {
            args.push("--tables".to_string());
            args.push(server.database.clone());
            args.extend(tables.iter().cloned());
        }
        TableSelection::Exclude(tables) => {
            args.push(server.database.clone());
            args.extend(tables.iter().map(|table| {
                // mysqldump only accepts the db.table form here
                if table.contains('.') {
                    format!("--ignore-table={}", table)
                } else {
                    format!("--ignore-table={}.{}", server.database, table)
                }
            }));
        }
        TableSelection::All => args.push(server.database.clone()),
    }

    args
}

/// Masks the password argument for logging.
pub fn redact_arguments(args: &[String]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if arg.starts_with("-p") && arg != "-p" {
                "-p****".to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// Runs an external dump program as a child process.
#[derive(Debug, Clone)]
pub struct CommandDumpTool {
    program: String,
}

impl CommandDumpTool {
    /// Creates a dump tool that runs `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this tool runs.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl DumpTool for CommandDumpTool {
    async fn dump(&self, server: &ServerConfig, destination: &Path) -> Result<()> {
        let file = create_owner_only(destination)?;
        let args = dump_arguments(server);

        debug!(
            "Running {} {}",
            self.program,
            redact_arguments(&args).join(" ")
        );

        // `Command::output` would replace stdout with a pipe
        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DbBackupError::spawn_failed(&self.program, e))?;

        let output = child.wait_with_output().await.map_err(|e| {
            DbBackupError::io(format!("Failed to wait for '{}'", self.program), e)
        })?;

        if !output.status.success() {
            return Err(DbBackupError::process_exited(
                &self.program,
                output.status,
                &stderr_excerpt(&output.stderr),
            ));
        }

        Ok(())
    }
}

fn create_owner_only(path: &Path) -> Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .map_err(|e| DbBackupError::io(format!("Failed to create {}", path.display()), e))
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    match text.char_indices().nth(STDERR_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
