//! MySQL/MariaDB catalog driver.
//!
//! Provides [`MysqlCatalog`], the [`CatalogReader`](crate::core::CatalogReader)
//! used against live servers.
//!
//! # Feature Flag
//!
//! This module is only available when the `mysql` feature is enabled (it is
//! on by default):
//!
//! ```toml
//! [dependencies]
//! schemapress = { version = "0.1", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod reader;

pub use reader::MysqlCatalog;
