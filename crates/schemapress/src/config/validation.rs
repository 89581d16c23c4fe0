//! Configuration validation.

use super::Config;
use crate::core::identifier::is_valid_php_class_name;
use crate::error::{PressError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation, when present
    if let Some(source) = &config.source {
        if source.host.is_empty() {
            return Err(PressError::Config("source.host is required".into()));
        }
        if source.database.is_empty() {
            return Err(PressError::Config("source.database is required".into()));
        }
        if source.user.is_empty() {
            return Err(PressError::Config("source.user is required".into()));
        }
        if source.r#type != "mysql" {
            return Err(PressError::Config(format!(
                "source.type must be 'mysql', got '{}'",
                source.r#type
            )));
        }
        match source.ssl_mode.to_lowercase().as_str() {
            "disable" | "disabled" | "preferred" | "required" | "verify_ca" | "verify_identity" => {}
            other => {
                return Err(PressError::Config(format!(
                    "source.ssl_mode '{}' is not one of disable, preferred, required, verify_ca, verify_identity",
                    other
                )));
            }
        }
    }

    // Introspection validation
    if config.introspection.prefix.is_empty() {
        return Err(PressError::Config(
            "introspection.prefix must not be empty".into(),
        ));
    }
    if config.introspection.query_timeout_secs == 0 {
        return Err(PressError::Config(
            "introspection.query_timeout_secs must be at least 1".into(),
        ));
    }
    if config.introspection.max_connections == 0 {
        return Err(PressError::Config(
            "introspection.max_connections must be at least 1".into(),
        ));
    }
    if config.introspection.parallel_tables == 0 {
        return Err(PressError::Config(
            "introspection.parallel_tables must be at least 1".into(),
        ));
    }

    // Installer validation
    if !is_valid_php_class_name(&config.installer.class_name) {
        return Err(PressError::Config(format!(
            "installer.class_name '{}' is not a valid PHP class name",
            config.installer.class_name
        )));
    }

    Ok(())
}
