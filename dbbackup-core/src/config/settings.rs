//! Runtime settings assembled once from the process environment.
//!
//! Components never read the environment themselves; `main` builds a
//! [`Settings`] at startup and passes it down.

use std::path::PathBuf;

use url::Url;
use zeroize::Zeroizing;

use crate::error::{DbBackupError, Result};
use crate::security::{SymmetricKey, derive_key};

/// Environment variable names.
pub mod env_vars {
    /// Secret the encryption key is derived from
    pub const KEY: &str = "KEY";
    /// Directory for per-run log files
    pub const LOG_FOLDER: &str = "LOG_FOLDER";
    /// Root directory for encrypted backups
    pub const OUTPUT_FOLDER: &str = "OUTPUT_FOLDER";
    /// Path to the JSON server list
    pub const CONFIG_FILE: &str = "CONFIG_FILE";
    /// Webhook endpoint for run results
    pub const DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK";
    /// Display name for the notification
    pub const DISCORD_BOT_NAME: &str = "DISCORD_BOT_NAME";
    /// Avatar URL for the notification
    pub const DISCORD_BOT_AVATAR: &str = "DISCORD_BOT_AVATAR";
    /// Dump tool program
    pub const DUMP_COMMAND: &str = "DUMP_COMMAND";
}

/// Dump tool used when `DUMP_COMMAND` is not set.
pub const DEFAULT_DUMP_COMMAND: &str = "mysqldump";

/// Where to deliver run results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    /// Endpoint receiving the JSON POST
    pub url: Url,
    /// Display name of the sender
    pub username: Option<String>,
    /// Avatar shown next to the message
    pub avatar_url: Option<String>,
}

/// Directories and files required by a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    /// Directory for `backup_log_<ts>.log`
    pub log_dir: PathBuf,
    /// Root of the per-server backup directories
    pub output_dir: PathBuf,
    /// JSON server list
    pub config_file: PathBuf,
}

/// Process-wide settings.
///
/// # Security
/// The secret is held in a zeroizing container and omitted from `Debug`.
#[derive(Clone)]
pub struct Settings {
    secret: Zeroizing<String>,
    /// Log directory, required for backups
    pub log_dir: Option<PathBuf>,
    /// Output directory, required for backups
    pub output_dir: Option<PathBuf>,
    /// Server list, required for backups
    pub config_file: Option<PathBuf>,
    /// Optional result notification target
    pub webhook: Option<WebhookSettings>,
    /// Dump tool program
    pub dump_command: String,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Load a `.env` file into the environment before calling this if one is
    /// used.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns a configuration error if `KEY` is missing or the webhook URL
    /// is not an http(s) URL
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secret = get(env_vars::KEY).ok_or_else(|| {
            DbBackupError::configuration(format!(
                "{} environment variable is not set",
                env_vars::KEY
            ))
        })?;

        let webhook = match get(env_vars::DISCORD_WEBHOOK) {
            Some(raw) => Some(WebhookSettings {
                url: parse_webhook_url(&raw)?,
                username: get(env_vars::DISCORD_BOT_NAME),
                avatar_url: get(env_vars::DISCORD_BOT_AVATAR),
            }),
            None => None,
        };

        Ok(Self {
            secret: Zeroizing::new(secret),
            log_dir: get(env_vars::LOG_FOLDER).map(PathBuf::from),
            output_dir: get(env_vars::OUTPUT_FOLDER).map(PathBuf::from),
            config_file: get(env_vars::CONFIG_FILE).map(PathBuf::from),
            webhook,
            dump_command: get(env_vars::DUMP_COMMAND)
                .unwrap_or_else(|| DEFAULT_DUMP_COMMAND.to_string()),
        })
    }

    /// Derives the encryption key from the configured secret.
    pub fn key(&self) -> SymmetricKey {
        derive_key(&self.secret)
    }

    /// Returns the paths a backup run needs.
    ///
    /// # Errors
    /// Returns a configuration error listing every missing variable
    pub fn backup_paths(&self) -> Result<BackupPaths> {
        match (&self.log_dir, &self.output_dir, &self.config_file) {
            (Some(log_dir), Some(output_dir), Some(config_file)) => Ok(BackupPaths {
                log_dir: log_dir.clone(),
                output_dir: output_dir.clone(),
                config_file: config_file.clone(),
            }),
            _ => {
                let missing: Vec<&str> = [
                    (env_vars::LOG_FOLDER, self.log_dir.is_none()),
                    (env_vars::OUTPUT_FOLDER, self.output_dir.is_none()),
                    (env_vars::CONFIG_FILE, self.config_file.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();

                Err(DbBackupError::configuration(format!(
                    "backup requires {} to be set",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("secret", &"<redacted>")
            .field("log_dir", &self.log_dir)
            .field("output_dir", &self.output_dir)
            .field("config_file", &self.config_file)
            .field("webhook", &self.webhook)
            .field("dump_command", &self.dump_command)
            .finish()
    }
}

fn parse_webhook_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        DbBackupError::configuration(format!(
            "{} is not a valid URL: {}",
            env_vars::DISCORD_WEBHOOK,
            e
        ))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DbBackupError::configuration(format!(
            "{} must use http or https, got '{}'",
            env_vars::DISCORD_WEBHOOK,
            other
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let result = Settings::from_lookup(lookup_from(&[("LOG_FOLDER", "/tmp/logs")]));
        let error = result.unwrap_err();
        assert!(error.to_string().contains("KEY"));
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let result = Settings::from_lookup(lookup_from(&[("KEY", "  ")]));
        assert!(matches!(result, Err(DbBackupError::Configuration { .. })));
    }

    #[test]
    fn test_full_settings() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("KEY", "abc"),
            ("LOG_FOLDER", "/var/log/dbbackup"),
            ("OUTPUT_FOLDER", "/srv/backups"),
            ("CONFIG_FILE", "/etc/dbbackup/servers.json"),
            ("DISCORD_WEBHOOK", "https://discord.example.com/api/webhooks/1/t"),
            ("DISCORD_BOT_NAME", "Backup Bot"),
            ("DISCORD_BOT_AVATAR", "https://cdn.example.com/bot.png"),
        ]))
        .unwrap();

        let paths = settings.backup_paths().unwrap();
        assert_eq!(paths.log_dir, PathBuf::from("/var/log/dbbackup"));
        assert_eq!(paths.output_dir, PathBuf::from("/srv/backups"));
        assert_eq!(paths.config_file, PathBuf::from("/etc/dbbackup/servers.json"));

        let webhook = settings.webhook.as_ref().unwrap();
        assert_eq!(webhook.url.host_str(), Some("discord.example.com"));
        assert_eq!(webhook.username.as_deref(), Some("Backup Bot"));
        assert_eq!(settings.dump_command, DEFAULT_DUMP_COMMAND);

        assert_eq!(&settings.key().as_bytes()[..3], b"abc");
    }

    #[test]
    fn test_backup_paths_lists_missing_variables() {
        let settings =
            Settings::from_lookup(lookup_from(&[("KEY", "abc"), ("LOG_FOLDER", "/logs")]))
                .unwrap();

        let message = settings.backup_paths().unwrap_err().to_string();
        assert!(message.contains("OUTPUT_FOLDER"));
        assert!(message.contains("CONFIG_FILE"));
        assert!(!message.contains("LOG_FOLDER"));
    }

    #[test]
    fn test_decrypt_only_needs_key() {
        let settings = Settings::from_lookup(lookup_from(&[("KEY", "abc")])).unwrap();
        assert!(settings.webhook.is_none());
        assert!(settings.backup_paths().is_err());
    }

    #[test]
    fn test_invalid_webhook_rejected() {
        let result = Settings::from_lookup(lookup_from(&[
            ("KEY", "abc"),
            ("DISCORD_WEBHOOK", "not a url"),
        ]));
        assert!(matches!(result, Err(DbBackupError::Configuration { .. })));

        let result = Settings::from_lookup(lookup_from(&[
            ("KEY", "abc"),
            ("DISCORD_WEBHOOK", "ftp://example.com/hook"),
        ]));
        assert!(result.unwrap_err().to_string().contains("http or https"));
    }

    #[test]
    fn test_dump_command_override() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("KEY", "abc"),
            ("DUMP_COMMAND", "/usr/local/bin/mariadb-dump"),
        ]))
        .unwrap();
        assert_eq!(settings.dump_command, "/usr/local/bin/mariadb-dump");
    }

    #[test]
    fn test_settings_debug_redacts_secret() {
        let settings =
            Settings::from_lookup(lookup_from(&[("KEY", "super_secret_value")])).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super_secret_value"));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("KEY", Some("env-secret")),
                ("LOG_FOLDER", Some("/tmp/dbbackup/logs")),
                ("OUTPUT_FOLDER", Some("/tmp/dbbackup/out")),
                ("CONFIG_FILE", Some("/tmp/dbbackup/servers.json")),
                ("DISCORD_WEBHOOK", None),
                ("DUMP_COMMAND", None),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert!(settings.backup_paths().is_ok());
                assert!(settings.webhook.is_none());
                assert_eq!(&settings.key().as_bytes()[..10], b"env-secret");
            },
        );
    }

    #[test]
    fn test_from_env_without_key() {
        temp_env::with_vars([("KEY", None::<&str>)], || {
            assert!(Settings::from_env().is_err());
        });
    }
}
