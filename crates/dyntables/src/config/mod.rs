//! Connection configuration.
//!
//! Settings can come from code (builder), from a JSON file with the keys
//! `database`, `user`, `password` and `host`, or from `DTABLES_ENVS_PGSQL_*`
//! environment variables.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

/// Default JSON configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Environment variable prefix used by [`ConnectionConfig::from_env`].
pub const ENV_PREFIX: &str = "DTABLES_ENVS_PGSQL_";

/// PostgreSQL connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password (never serialized).
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Schema scanned by catalog queries.
    #[serde(default = "default_schema")]
    pub schema: String,
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

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: String::new(),
            user: String::new(),
            password: None,
            schema: default_schema(),
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration for the given database and user.
    pub fn new(database: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            ..Self::default()
        }
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the catalog schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Loads settings from a JSON file.
    pub fn from_json_file(path: &Path) -> TableResult<Self> {
        if !path.exists() {
            return Err(TableError::InvalidConfig(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads settings from [`DEFAULT_CONFIG_FILE`] in the working directory.
    pub fn from_default_file() -> TableResult<Self> {
        Self::from_json_file(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Loads settings from `DTABLES_ENVS_PGSQL_{DATABASE,USER,HOST}`, with
    /// optional `_PASSWORD`, `_PORT` and `_SCHEMA`.
    pub fn from_env() -> TableResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConnectionConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> TableResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let required = |name: &str| {
            var(name).ok_or_else(|| {
                TableError::InvalidConfig(format!("missing environment variable {ENV_PREFIX}{name}"))
            })
        };

        let mut config =
            Self::new(required("DATABASE")?, required("USER")?).host(required("HOST")?);

        config.password = var("PASSWORD");
        if let Some(port) = var("PORT") {
            config.port = port.parse().map_err(|_| {
                TableError::InvalidConfig(format!("invalid port in {ENV_PREFIX}PORT: {port}"))
            })?;
        }
        if let Some(schema) = var("SCHEMA") {
            config.schema = schema;
        }
        Ok(config)
    }

    /// Checks that the required fields are present.
    pub fn validate(&self) -> TableResult<()> {
        if self.database.is_empty() {
            return Err(TableError::InvalidConfig("database name is required".into()));
        }
        if self.user.is_empty() {
            return Err(TableError::InvalidConfig("user is required".into()));
        }
        if self.host.is_empty() {
            return Err(TableError::InvalidConfig("host is required".into()));
        }
        Ok(())
    }

    /// Converts into a driver configuration.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .application_name("dyntables");
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }

    /// `host:port/database`, for log lines.
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("schema", &self.schema)
            .finish()
    }
}
