//! Server list loaded from the JSON config file.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{DbBackupError, Result};

/// Connection and table selection for one database server.
///
/// The `name` doubles as the output subdirectory and appears in backup file
/// names, so it is restricted to a single path component.
///
/// # Example
/// ```rust
/// use dbbackup_core::config::{ServerConfig, TableSelection};
///
/// let server = ServerConfig::new("primary", "backup", "secret", "db.internal", 3306, "shop")
///     .with_tables(vec!["orders".to_string()]);
///
/// assert!(server.validate().is_ok());
/// assert!(matches!(server.table_selection(), TableSelection::Include(_)));
/// assert!(!format!("{:?}", server).contains("secret"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name, output subdirectory and file name component
    pub name: String,
    /// Database user
    pub user: String,
    /// Database password (never logged)
    pub password: String,
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database to dump
    pub database: String,
    /// Only dump these tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
    /// Dump everything except these tables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_tables: Option<Vec<String>>,
}

/// Which tables of the database end up in the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSelection<'a> {
    /// Whole database
    All,
    /// Only the listed tables
    Include(&'a [String]),
    /// Everything except the listed tables
    Exclude(&'a [String]),
}

impl ServerConfig {
    /// Creates a server entry that dumps the whole database.
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            user: user.into(),
            password: password.into(),
            host: host.into(),
            port,
            database: database.into(),
            tables: None,
            ignored_tables: None,
        }
    }

    /// Builder method to restrict the dump to `tables`.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Builder method to leave `tables` out of the dump.
    pub fn with_ignored_tables(mut self, tables: Vec<String>) -> Self {
        self.ignored_tables = Some(tables);
        self
    }

    /// Resolves the table selection.
    ///
    /// An include list wins over an exclude list when both are set. Empty
    /// lists count as absent.
    pub fn table_selection(&self) -> TableSelection<'_> {
        match (self.tables.as_deref(), self.ignored_tables.as_deref()) {
            (Some(tables), _) if !tables.is_empty() => TableSelection::Include(tables),
            (_, Some(ignored)) if !ignored.is_empty() => TableSelection::Exclude(ignored),
            _ => TableSelection::All,
        }
    }

    /// Validates a single server entry.
    ///
    /// # Errors
    /// Returns a configuration error naming the offending server and field
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DbBackupError::configuration("server name cannot be empty"));
        }

        if self.name == "." || self.name == ".." || self.name.contains(['/', '\\']) {
            return Err(DbBackupError::configuration(format!(
                "server name '{}' must be a single path component",
                self.name
            )));
        }

        if self.host.trim().is_empty() {
            return Err(DbBackupError::configuration(format!(
                "server '{}': host cannot be empty",
                self.name
            )));
        }

        if self.port == 0 {
            return Err(DbBackupError::configuration(format!(
                "server '{}': port must be greater than 0",
                self.name
            )));
        }

        if self.database.trim().is_empty() {
            return Err(DbBackupError::configuration(format!(
                "server '{}': database cannot be empty",
                self.name
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("tables", &self.tables)
            .field("ignored_tables", &self.ignored_tables)
            .finish()
    }
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Contents of the JSON config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Servers in the order they are backed up
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl BackupConfig {
    /// Reads, parses and validates the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DbBackupError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&raw).map_err(|e| match e {
            DbBackupError::Configuration { message } => DbBackupError::configuration(format!(
                "{}: {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    /// Parses and validates a config document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| DbBackupError::configuration(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every server and rejects duplicate names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(DbBackupError::configuration(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
        }
        Ok(())
    }
}
