//! # schemapress
//!
//! Compile a MySQL/MariaDB schema into a prefix-agnostic WordPress plugin
//! installer.
//!
//! The library works in two stages:
//!
//! - **Introspection** reads tables, views, stored procedures and triggers
//!   sharing a name prefix and records them in a JSON [`Manifest`]
//! - **Compilation** turns a manifest into a PHP installer class plus the
//!   bootstrap files that call it, with every prefixed name rewritten to the
//!   site's runtime prefix
//!
//! ## Example
//!
//! ```rust,no_run
//! use schemapress::{manifest, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("schemapress.yaml")?;
//!     let orchestrator = Orchestrator::new(config);
//!     let snapshot = orchestrator.introspect().await?;
//!     manifest::save(&snapshot, "manifest.json".as_ref())?;
//!
//!     let compiled = orchestrator.compile(&snapshot, None)?;
//!     compiled.write_to(orchestrator.output_dir())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod emit;
pub mod error;
pub mod introspect;
pub mod manifest;
pub mod orchestrator;
pub mod sanitize;

// Re-exports for convenient access
pub use config::{Config, InstallerConfig, IntrospectionConfig, SourceConfig};
pub use core::{CatalogReader, Manifest, SeedRow, SeedValue};
pub use emit::{compile, CompileReport, CompiledInstaller, EmitOptions, TriggerDropPolicy};
pub use error::{PressError, Result};
pub use introspect::{IntrospectOptions, Introspector};
pub use manifest::ValidationReport;
pub use orchestrator::{Orchestrator, Request, Response};
