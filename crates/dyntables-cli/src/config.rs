//! Configuration file support for the CLI.
//!
//! Loads CLI configuration from TOML files with a `[connection]` and a
//! `[layout]` table.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dyntables::{ColumnSet, ConnectionConfig, LayoutConfig};
use serde::Deserialize;

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Database connection.
    #[serde(default)]
    pub connection: ConnectionSection,

    /// Table layout.
    #[serde(default)]
    pub layout: LayoutSection,
}

/// `[connection]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSection {
    /// Server hostname.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: Option<String>,

    /// Username.
    #[serde(default)]
    pub user: Option<String>,

    /// Password (stored only in config file, not logged).
    #[serde(default)]
    pub password: Option<String>,

    /// Schema searched by catalog queries.
    #[serde(default = "default_schema")]
    pub schema: String,
}

/// `[layout]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutSection {
    /// Table prefix.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Column list, e.g. `"domain VARCHAR(100), keyword VARCHAR(100)"`.
    #[serde(default)]
    pub columns: Option<String>,

    /// Column whose value picks the table.
    #[serde(default)]
    pub dynamic_column: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_schema() -> String {
    "public".to_string()
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: None,
            user: None,
            password: None,
            schema: default_schema(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/dyntables/config.toml
    /// 2. ~/.dyntables/config.toml
    /// 3. Returns default if not found
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".dyntables").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("dyntables").join("config.toml"))
    }

    /// Builds the connection settings.
    ///
    /// Without a database and user in the file or on the command line, the
    /// `DTABLES_ENVS_PGSQL_*` variables are consulted.
    pub fn connection_config(&self) -> Result<ConnectionConfig> {
        let section = &self.connection;
        let (Some(database), Some(user)) = (&section.database, &section.user) else {
            return ConnectionConfig::from_env()
                .context("no database and user configured (use --database/--user or a config file)");
        };

        let mut config = ConnectionConfig::new(database.as_str(), user.as_str())
            .host(section.host.as_str())
            .port(section.port)
            .schema(section.schema.as_str());
        if let Some(password) = &section.password {
            config = config.password(password.as_str());
        }
        Ok(config)
    }

    /// Builds the table layout. Column lists are parsed strictly.
    pub fn layout_config(&self) -> Result<LayoutConfig> {
        let section = &self.layout;
        let mut layout = LayoutConfig::new();
        if let Some(prefix) = &section.prefix {
            layout = layout.with_table_prefix(prefix.as_str());
        }
        if let Some(columns) = &section.columns {
            let columns = ColumnSet::parse_strict(columns).context("invalid column list")?;
            if columns.is_empty() {
                bail!("column list is empty");
            }
            layout = layout.with_columns(columns);
        }
        if let Some(dynamic) = &section.dynamic_column {
            layout = layout.with_dynamic_column(dynamic.as_str());
        }
        Ok(layout)
    }
}
