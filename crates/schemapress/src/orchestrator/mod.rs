//! Compiler workflow coordinator.
//!
//! The [`Orchestrator`] ties configuration to the two compiler entry points:
//! introspecting a live schema into a [`Manifest`] and compiling a manifest
//! into installer sources. [`request`] exposes the same operations as a
//! closed set of JSON requests.

pub mod request;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::{CatalogReader, Manifest};
use crate::emit::{self, CompiledInstaller};
use crate::error::{PressError, Result};
use crate::introspect::{IntrospectOptions, Introspector};
use crate::manifest::{self, ValidationReport};

pub use request::{dispatch, handle, parse_request, Request, Response};

/// Compiler orchestrator.
pub struct Orchestrator {
    config: Config,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort introspection once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory generated installer files go to.
    pub fn output_dir(&self) -> &Path {
        &self.config.installer.output_dir
    }

    /// Connect to the configured source and capture its schema.
    #[cfg(feature = "mysql")]
    pub async fn introspect(&self) -> Result<Manifest> {
        self.introspect_using(self.config.introspect_options()).await
    }

    /// Like [`Orchestrator::introspect`] with explicit options.
    #[cfg(feature = "mysql")]
    pub async fn introspect_using(&self, options: IntrospectOptions) -> Result<Manifest> {
        let source = self.config.source()?;
        let catalog =
            crate::drivers::MysqlCatalog::connect(source, &self.config.introspection).await?;
        let result = self.run_introspection(&catalog, options).await;
        catalog.close().await;
        result
    }

    /// Capture a schema from an already connected catalog.
    pub async fn introspect_with<R: CatalogReader + ?Sized>(&self, reader: &R) -> Result<Manifest> {
        self.run_introspection(reader, self.config.introspect_options())
            .await
    }

    async fn run_introspection<R: CatalogReader + ?Sized>(
        &self,
        reader: &R,
        options: IntrospectOptions,
    ) -> Result<Manifest> {
        let started = Instant::now();
        let result = Introspector::new(reader, options)
            .with_cancellation(self.cancel.clone())
            .introspect()
            .await;

        match &result {
            Ok(manifest) => info!(
                "Introspection finished in {:.2}s ({} objects)",
                started.elapsed().as_secs_f64(),
                manifest.object_count()
            ),
            Err(PressError::Cancelled) => warn!("Introspection cancelled"),
            Err(_) => {}
        }
        result
    }

    /// Compile a manifest into installer sources.
    pub fn compile(
        &self,
        manifest: &Manifest,
        class_override: Option<&str>,
    ) -> Result<CompiledInstaller> {
        let report = self.validate(manifest, class_override);
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        let compiled = emit::compile(manifest, class_override, &self.config.emit_options())?;
        info!(
            "Compiled {}: {} tables ({} excluded), {} views, {} procedures, {} triggers, {} seed rows",
            compiled.report.class_name,
            compiled.report.tables.len(),
            compiled.report.excluded_tables.len(),
            compiled.report.views.len(),
            compiled.report.stored_procedures.len(),
            compiled.report.triggers.len(),
            compiled.report.seed_rows
        );
        Ok(compiled)
    }

    /// Compile and write the generated files into `dir`.
    pub fn compile_to(
        &self,
        manifest: &Manifest,
        class_override: Option<&str>,
        dir: &Path,
    ) -> Result<(CompiledInstaller, Vec<PathBuf>)> {
        let compiled = self.compile(manifest, class_override)?;
        let written = compiled.write_to(dir)?;
        info!("Wrote {} files to {}", written.len(), dir.display());
        Ok((compiled, written))
    }

    /// Check a manifest without compiling it.
    pub fn validate(&self, manifest: &Manifest, class_override: Option<&str>) -> ValidationReport {
        manifest::validate(manifest, class_override)
    }
}
