//! Library module for the dbbackup binary.
//!
//! Holds the CLI definition and the two run modes so they can be tested
//! without spawning the binary. `main.rs` only wires logging and exit codes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Args, Parser};
use dbbackup_core::{
    BackupConfig, BackupOrchestrator, BackupResult, CommandDumpTool, DbBackupError,
    ResultReporter, Result, Settings,
    config::BackupPaths,
    security::encryption::{decrypt_file, decrypted_output_path},
};
use tracing::{info, warn};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "dbbackup")]
#[command(about = "Scheduled, encrypted MySQL backups with webhook reporting")]
#[command(version)]
#[command(long_about = "
dbbackup - encrypted database backups

Backs up every server listed in CONFIG_FILE with mysqldump, seals each dump
with AES-256-GCM and removes the plaintext. Results are posted to
DISCORD_WEBHOOK when it is set.

ENVIRONMENT:
  KEY                 encryption secret (required)
  LOG_FOLDER          log directory (backup)
  OUTPUT_FOLDER       encrypted backup root (backup)
  CONFIG_FILE         JSON server list (backup)
  DISCORD_WEBHOOK     result webhook URL (optional)
  DISCORD_BOT_NAME    webhook sender name (optional)
  DISCORD_BOT_AVATAR  webhook sender avatar (optional)
  DUMP_COMMAND        dump program, default mysqldump (optional)

EXAMPLES:
  dbbackup --backup
  dbbackup --decrypt --file backups/main/db_main_backup_20250101_020000.sql.enc
")]
pub struct Cli {
    /// Logging flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Run a backup of every configured server
    #[arg(long, conflicts_with = "decrypt")]
    pub backup: bool,

    /// Decrypt the file given with --file
    #[arg(long, requires = "file")]
    pub decrypt: bool,

    /// Encrypted backup to decrypt
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Verbosity flags shared by both modes.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// What the invocation asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Back up all configured servers
    Backup,
    /// Decrypt one file
    Decrypt(PathBuf),
    /// No mode flag given
    Usage,
}

impl Cli {
    /// Parses `args` after rewriting single-dash long flags.
    pub fn parse_normalized<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(normalize_legacy_args(args))
    }

    /// Resolves the run mode.
    pub fn mode(&self) -> Mode {
        if self.backup {
            Mode::Backup
        } else if self.decrypt {
            match &self.file {
                Some(file) => Mode::Decrypt(file.clone()),
                None => Mode::Usage,
            }
        } else {
            Mode::Usage
        }
    }
}

const LEGACY_FLAGS: [&str; 3] = ["backup", "decrypt", "file"];

/// Rewrites `-backup`, `-decrypt` and `-file` (also `-file=x`) to their
/// double-dash forms. Everything else passes through untouched.
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(flag) = text.strip_prefix('-') else {
                return arg;
            };
            if flag.starts_with('-') {
                return arg;
            }
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if LEGACY_FLAGS.contains(&name) {
                OsString::from(format!("--{}", flag))
            } else {
                arg
            }
        })
        .collect()
}

/// Backs up every server in the config file and reports the results.
///
/// Returns the per-server results. Individual server failures are part of
/// the results, not errors; only startup problems are returned as `Err`.
pub async fn run_backup(settings: &Settings, paths: &BackupPaths) -> Result<Vec<BackupResult>> {
    tokio::fs::create_dir_all(&paths.output_dir)
        .await
        .map_err(|e| {
            DbBackupError::io(
                format!(
                    "Failed to create output folder {}",
                    paths.output_dir.display()
                ),
                e,
            )
        })?;

    let config = BackupConfig::load(&paths.config_file)?;
    info!(
        "Loaded {} server(s) from {}",
        config.servers.len(),
        paths.config_file.display()
    );

    let reporter = ResultReporter::from_settings(settings.webhook.as_ref())?;
    let orchestrator = BackupOrchestrator::new(
        CommandDumpTool::new(settings.dump_command.clone()),
        settings.key(),
        paths.output_dir.clone(),
    );

    let results = orchestrator.run_all(&config.servers).await;
    for result in &results {
        if result.success {
            info!("✓ {}: {}", result.server_name, result.message);
        } else {
            warn!("✗ {}: {}", result.server_name, result.message);
        }
    }

    reporter.report(&results).await;
    Ok(results)
}

/// Decrypts `file` next to itself and returns the output path.
pub async fn run_decrypt(settings: &Settings, file: &Path) -> Result<PathBuf> {
    let output = decrypted_output_path(file);
    info!("Decrypting {} to {}", file.display(), output.display());

    decrypt_file(file, &output, &settings.key()).await?;

    info!("✓ Decrypted backup saved as: {}", output.display());
    Ok(output)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use dbbackup_core::config::env_vars;

    fn settings_with(vars: &[(&'static str, String)]) -> Settings {
        let vars = vars.to_vec();
        Settings::from_lookup(move |name: &str| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_legacy_flags_are_normalized() {
        let args = normalize_legacy_args(["dbbackup", "-decrypt", "-file", "x.sql.enc", "-v"]);
        assert_eq!(args, ["dbbackup", "--decrypt", "--file", "x.sql.enc", "-v"]);

        let args = normalize_legacy_args(["dbbackup", "-file=x.enc", "--backup", "-backupx"]);
        assert_eq!(args, ["dbbackup", "--file=x.enc", "--backup", "-backupx"]);
    }

    #[test]
    fn test_mode_resolution() {
        let cli = Cli::parse_normalized(["dbbackup", "-backup"]);
        assert_eq!(cli.mode(), Mode::Backup);

        let cli = Cli::parse_normalized(["dbbackup", "-decrypt", "-file", "a.enc"]);
        assert_eq!(cli.mode(), Mode::Decrypt(PathBuf::from("a.enc")));

        let cli = Cli::parse_normalized(["dbbackup", "-vv"]);
        assert_eq!(cli.mode(), Mode::Usage);
        assert_eq!(cli.global.verbose, 2);
    }

    #[test]
    fn test_conflicting_and_incomplete_flags_rejected() {
        let conflict = Cli::try_parse_from(normalize_legacy_args([
            "dbbackup", "-backup", "-decrypt", "-file", "a.enc",
        ]));
        assert!(conflict.is_err());

        let missing_file = Cli::try_parse_from(["dbbackup", "--decrypt"]);
        assert!(missing_file.is_err());
    }

    #[tokio::test]
    async fn test_decrypt_roundtrip_and_wrong_key() {
        use dbbackup_core::security::encryption::encrypt_file;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("dump.sql");
        let sealed = dir.path().join("dump.sql.enc");
        std::fs::write(&plain, b"CREATE TABLE t (id INT);").unwrap();

        let settings = settings_with(&[(env_vars::KEY, "decrypt-secret".to_string())]);
        encrypt_file(&plain, &sealed, &settings.key()).await.unwrap();
        std::fs::remove_file(&plain).unwrap();

        let wrong = settings_with(&[(env_vars::KEY, "another-secret".to_string())]);
        let result = run_decrypt(&wrong, &sealed).await;
        assert!(matches!(result, Err(DbBackupError::Authentication)));
        assert!(!plain.exists());

        let output = run_decrypt(&settings, &sealed).await.unwrap();
        assert_eq!(output, plain);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "CREATE TABLE t (id INT);"
        );
    }

    #[tokio::test]
    async fn test_backup_with_missing_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with(&[
            (env_vars::KEY, "k".to_string()),
            (env_vars::LOG_FOLDER, dir.path().join("logs").display().to_string()),
            (env_vars::OUTPUT_FOLDER, dir.path().join("out").display().to_string()),
            (env_vars::CONFIG_FILE, dir.path().join("none.json").display().to_string()),
        ]);
        let paths = settings.backup_paths().unwrap();

        let result = run_backup(&settings, &paths).await;
        assert!(matches!(result, Err(DbBackupError::Configuration { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_backup_with_echo_dump_tool() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("servers.json");
        std::fs::write(
            &config_file,
            r#"{"servers":[
                {"name":"main","user":"root","password":"pw","host":"localhost","port":3306,"database":"app"},
                {"name":"replica","user":"root","password":"pw","host":"localhost","port":3306,"database":"app"}
            ]}"#,
        )
        .unwrap();

        let output_dir = dir.path().join("out");
        let settings = settings_with(&[
            (env_vars::KEY, "echo-secret".to_string()),
            (env_vars::LOG_FOLDER, dir.path().join("logs").display().to_string()),
            (env_vars::OUTPUT_FOLDER, output_dir.display().to_string()),
            (env_vars::CONFIG_FILE, config_file.display().to_string()),
            (env_vars::DUMP_COMMAND, "echo".to_string()),
        ]);
        let paths = settings.backup_paths().unwrap();

        let results = run_backup(&settings, &paths).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success), "{:?}", results);

        for server in ["main", "replica"] {
            let files: Vec<PathBuf> = std::fs::read_dir(output_dir.join(server))
                .unwrap()
                .map(|entry| entry.unwrap().path())
                .collect();
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].extension().unwrap(), "enc");
        }
    }
}
