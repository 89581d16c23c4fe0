//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_INSTALLER_CLASS, DEFAULT_PREFIX};
use crate::emit::TriggerDropPolicy;
use crate::introspect::DEFAULT_ROW_LIMIT;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source database. Only needed when introspecting.
    #[serde(default)]
    pub source: Option<SourceConfig>,

    /// What introspection captures.
    #[serde(default)]
    pub introspection: IntrospectionConfig,

    /// How the installer is generated.
    #[serde(default)]
    pub installer: InstallerConfig,
}

/// Source database (MySQL/MariaDB) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database type (always "mysql" for now).
    #[serde(default = "default_mysql")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// TLS mode: disable, preferred, required, verify_ca, verify_identity.
    #[serde(default = "default_preferred")]
    pub ssl_mode: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Introspection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    /// Only objects starting with this prefix are captured (default: "wp_").
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Capture seed rows (default: false).
    #[serde(default)]
    pub include_seed_data: bool,

    /// Seed rows per table; 0 captures every row (default: 100).
    #[serde(default = "default_row_limit")]
    pub default_row_limit: i64,

    /// Timeout for each catalog query in seconds (default: 30).
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Tables loaded concurrently (default: 4).
    #[serde(default = "default_parallel_tables")]
    pub parallel_tables: usize,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            include_seed_data: false,
            default_row_limit: default_row_limit(),
            query_timeout_secs: default_query_timeout(),
            max_connections: default_max_connections(),
            parallel_tables: default_parallel_tables(),
        }
    }
}

/// Installer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// PHP class name (default: "MyPluginInstaller").
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Directory generated files are written to (default: "build").
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Replaces the built-in host table list when set.
    #[serde(default)]
    pub core_tables: Option<Vec<String>>,

    /// Trigger names dropped on uninstall: installed or original.
    #[serde(default)]
    pub trigger_drop: TriggerDropPolicy,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            class_name: default_class_name(),
            output_dir: default_output_dir(),
            core_tables: None,
            trigger_drop: TriggerDropPolicy::default(),
        }
    }
}

fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_preferred() -> String {
    "preferred".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_row_limit() -> i64 {
    DEFAULT_ROW_LIMIT
}

fn default_query_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    4
}

fn default_parallel_tables() -> usize {
    4
}

fn default_class_name() -> String {
    DEFAULT_INSTALLER_CLASS.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}
