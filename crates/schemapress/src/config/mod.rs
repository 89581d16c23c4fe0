//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;
use std::time::Duration;

use crate::emit::EmitOptions;
use crate::error::{PressError, Result};
use crate::introspect::IntrospectOptions;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// The source section, required for introspection.
    pub fn source(&self) -> Result<&SourceConfig> {
        self.source
            .as_ref()
            .ok_or_else(|| PressError::Config("source section is required to introspect".into()))
    }

    /// Introspection options derived from the configuration.
    pub fn introspect_options(&self) -> IntrospectOptions {
        IntrospectOptions {
            prefix: self.introspection.prefix.clone(),
            include_seed_data: self.introspection.include_seed_data,
            default_row_limit: self.introspection.default_row_limit,
            installer_class: self.installer.class_name.clone(),
            parallel_tables: self.introspection.parallel_tables,
        }
    }

    /// Emission options derived from the configuration.
    pub fn emit_options(&self) -> EmitOptions {
        let options = EmitOptions {
            trigger_drop: self.installer.trigger_drop,
            ..EmitOptions::default()
        };
        match &self.installer.core_tables {
            Some(tables) => options.with_core_tables(tables),
            None => options,
        }
    }
}

impl IntrospectionConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl SourceConfig {
    /// Connection URL with the password masked, for logs.
    pub fn display_url(&self) -> String {
        format!(
            "mysql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}
