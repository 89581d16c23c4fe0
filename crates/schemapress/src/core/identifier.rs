//! Identifier validation, quoting and naming helpers.
//!
//! Catalog statements such as `SHOW FULL COLUMNS FROM` cannot take the table
//! name as a bound parameter, so every identifier that reaches a catalog query
//! is validated and quoted here first. The same module owns the naming rules
//! used by emission: PHP class name validation and the file slug.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PressError, Result};

/// Maximum identifier length accepted by MySQL.
const MAX_IDENTIFIER_LENGTH: usize = 64;

static PHP_CLASS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_\x{80}-\x{10FFFF}][A-Za-z0-9_\x{80}-\x{10FFFF}]*$")
        .expect("static regex must compile")
});

/// Validate an identifier before it is spliced into a catalog statement.
///
/// Rejects empty names, names containing null bytes, and names longer than
/// MySQL allows.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PressError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(PressError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(PressError::Config(format!(
            "Identifier exceeds maximum length of {} characters: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote a MySQL identifier with backticks, doubling embedded backticks.
///
/// ```ignore
/// assert_eq!(quote_mysql("orders")?, "`orders`");
/// assert_eq!(quote_mysql("odd`name")?, "`odd``name`");
/// ```
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Render a single-quoted MySQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_sql_literal(value))
}

/// Escape a value for placement between single quotes in generated SQL.
pub fn escape_sql_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Remove `prefix` from the front of `name` when present.
pub fn strip_prefix(name: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    name.strip_prefix(prefix).unwrap_or(name).to_string()
}

/// Whether `name` is usable as a PHP class name.
pub fn is_valid_php_class_name(name: &str) -> bool {
    PHP_CLASS_NAME.is_match(name)
}

/// Deterministic file-name slug for an installer class name.
///
/// Uppercase letters become `-` plus their lowercase form (no hyphen for the
/// first character), underscores are removed, repeated hyphens collapse and
/// leading or trailing hyphens are trimmed.
///
/// ```ignore
/// assert_eq!(file_slug("MyPluginInstaller"), "my-plugin-installer");
/// assert_eq!(file_slug("Acme_Shop_Installer"), "acme-shop-installer");
/// ```
pub fn file_slug(class_name: &str) -> String {
    let mut slug = String::with_capacity(class_name.len() + 8);
    for (i, c) in class_name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                slug.push('-');
            }
            slug.extend(c.to_lowercase());
        } else if c != '_' {
            slug.push(c);
        }
    }

    while slug.contains("--") {
        slug = slug.replace("--", "-");
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_rejects_bad_names() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("wp_\0orders").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
        assert!(validate_identifier("wp_orders").is_ok());
    }

    #[test]
    fn test_quote_mysql() {
        assert_eq!(quote_mysql("wp_orders").unwrap(), "`wp_orders`");
        assert_eq!(quote_mysql("odd`name").unwrap(), "`odd``name`");
        assert!(quote_mysql("").is_err());
    }

    #[test]
    fn test_escape_sql_literal() {
        assert_eq!(escape_sql_literal("O'Brien"), "O''Brien");
        assert_eq!(escape_sql_literal(r"C:\temp"), r"C:\\temp");
        assert_eq!(quote_literal("wp_orders"), "'wp_orders'");
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("wp_orders", "wp_"), "orders");
        assert_eq!(strip_prefix("orders", "wp_"), "orders");
        assert_eq!(strip_prefix("WP_orders", "wp_"), "WP_orders");
        assert_eq!(strip_prefix("wp_orders", ""), "wp_orders");
    }

    #[test]
    fn test_php_class_names() {
        assert!(is_valid_php_class_name("MyPluginInstaller"));
        assert!(is_valid_php_class_name("_Private2"));
        assert!(!is_valid_php_class_name("2Fast"));
        assert!(!is_valid_php_class_name("My Installer"));
        assert!(!is_valid_php_class_name("My-Installer"));
        assert!(!is_valid_php_class_name(""));
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("MyPluginInstaller"), "my-plugin-installer");
        assert_eq!(file_slug("Acme_Shop_Installer"), "acme-shop-installer");
        assert_eq!(file_slug("ABC"), "a-b-c");
        assert_eq!(file_slug("_Leading"), "leading");
        assert_eq!(file_slug("installer"), "installer");
    }
}
