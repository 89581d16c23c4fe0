//! Installer emission: manifest to PHP sources.
//!
//! [`compile`] is a pure function of the manifest, the class name and the
//! [`EmitOptions`]. It produces three files:
//!
//! - the installer class (`class-<slug>.php`) with `install()`, `populate()`
//!   and `uninstall()`
//! - a manual-run stub (`<slug>-installer.php`)
//! - the main plugin file (`<slug>.php`) wiring the class to the plugin hooks
//!
//! Every table reference in the generated SQL goes through the runtime
//! `{$this->prefix}` interpolation, so one manifest installs under any prefix.
//! Tables marked `skip` and host-owned core tables are never created or
//! dropped; the [`CompileReport`] lists each exclusion with its reason. Seed
//! rows are replayed for every table not marked `skip`, core tables included.

mod installer;
mod naming;
mod php;
mod templates;

pub use naming::trigger_names;
pub use php::{double_quoted, heredoc, single_quoted};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::identifier::file_slug;
use crate::core::{Manifest, Table};
use crate::error::{PressError, Result};
use crate::manifest::resolve_class_name;

/// Prefix-free names of the tables a WordPress host owns, multisite included.
pub const WORDPRESS_CORE_TABLES: &[&str] = &[
    "blog_versions",
    "blogmeta",
    "blogs",
    "commentmeta",
    "comments",
    "links",
    "options",
    "postmeta",
    "posts",
    "registration_log",
    "signups",
    "site",
    "sitemeta",
    "term_relationships",
    "term_taxonomy",
    "termmeta",
    "terms",
    "usermeta",
    "users",
];

/// Which trigger names `uninstall()` drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerDropPolicy {
    /// The disambiguated names `install()` created.
    #[default]
    Installed,
    /// The names recorded in the manifest.
    Original,
}

/// Compile-time settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Prefix-free host table names, lowercase.
    pub core_tables: BTreeSet<String>,
    pub trigger_drop: TriggerDropPolicy,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            core_tables: WORDPRESS_CORE_TABLES.iter().map(|s| s.to_string()).collect(),
            trigger_drop: TriggerDropPolicy::default(),
        }
    }
}

impl EmitOptions {
    /// Replace the core-table set.
    pub fn with_core_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.core_tables = tables
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn is_core_table(&self, name: &str) -> bool {
        self.core_tables.contains(&name.to_lowercase())
    }
}

/// Why a table was left out of the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExclusionReason {
    /// The manifest marks it `skip`.
    Skipped,
    /// The host owns it.
    CoreTable,
}

/// A table the installer does not create or drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedTable {
    pub name: String,
    pub reason: ExclusionReason,
}

/// A trigger and the name it is installed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledTrigger {
    pub name: String,
    pub installed_as: String,
}

/// Summary of what a compile emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileReport {
    pub class_name: String,
    pub tables: Vec<String>,
    pub excluded_tables: Vec<ExcludedTable>,
    pub views: Vec<String>,
    pub stored_procedures: Vec<String>,
    pub triggers: Vec<InstalledTrigger>,
    pub seed_rows: usize,
}

impl CompileReport {
    pub fn exclusion(&self, table: &str) -> Option<ExclusionReason> {
        self.excluded_tables
            .iter()
            .find(|e| e.name == table)
            .map(|e| e.reason)
    }
}

/// Role of a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    InstallerClass,
    InstallerStub,
    MainPlugin,
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub kind: OutputKind,
    pub file_name: String,
    pub content: String,
}

/// Result of [`compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstaller {
    pub installer_class: OutputFile,
    pub installer_stub: OutputFile,
    pub main_plugin: OutputFile,
    pub report: CompileReport,
}

impl CompiledInstaller {
    pub fn files(&self) -> [&OutputFile; 3] {
        [&self.installer_class, &self.installer_stub, &self.main_plugin]
    }

    /// Write every file into `dir`, creating it as needed.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(3);
        for file in self.files() {
            let path = dir.join(&file.file_name);
            fs::write(&path, &file.content)?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Everything the renderers need, decided once per compile.
pub(crate) struct CompilePlan<'a> {
    pub manifest: &'a Manifest,
    pub class_name: String,
    pub slug: String,
    pub options: &'a EmitOptions,
    /// Tables to create and drop, in manifest order.
    pub tables: Vec<&'a Table>,
    /// Tables whose seed rows `populate()` replays: every table not marked `skip`.
    pub seeded: Vec<&'a Table>,
    pub excluded: Vec<ExcludedTable>,
    /// Installed trigger names, parallel to `manifest.triggers`.
    pub trigger_names: Vec<String>,
}

impl<'a> CompilePlan<'a> {
    fn new(manifest: &'a Manifest, class_name: String, options: &'a EmitOptions) -> Self {
        let mut tables = Vec::new();
        let mut excluded = Vec::new();
        for table in &manifest.tables {
            let reason = if table.skip {
                Some(ExclusionReason::Skipped)
            } else if options.is_core_table(&table.name) {
                Some(ExclusionReason::CoreTable)
            } else {
                None
            };
            match reason {
                Some(reason) => excluded.push(ExcludedTable {
                    name: table.name.clone(),
                    reason,
                }),
                None => tables.push(table),
            }
        }

        let seeded = manifest
            .tables
            .iter()
            .filter(|t| !t.skip && !t.seed_rows_to_emit().is_empty())
            .collect();

        Self {
            slug: file_slug(&class_name),
            class_name,
            manifest,
            options,
            tables,
            seeded,
            excluded,
            trigger_names: trigger_names(manifest),
        }
    }

    /// Names `uninstall()` drops, per the trigger drop policy.
    pub fn uninstall_trigger_names(&self) -> Vec<&str> {
        match self.options.trigger_drop {
            TriggerDropPolicy::Installed => {
                self.trigger_names.iter().map(String::as_str).collect()
            }
            TriggerDropPolicy::Original => self
                .manifest
                .triggers
                .iter()
                .map(|t| t.name.as_str())
                .collect(),
        }
    }

    fn report(&self) -> CompileReport {
        CompileReport {
            class_name: self.class_name.clone(),
            tables: self.tables.iter().map(|t| t.name.clone()).collect(),
            excluded_tables: self.excluded.clone(),
            views: self.manifest.views.iter().map(|v| v.name.clone()).collect(),
            stored_procedures: self
                .manifest
                .stored_procedures
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            triggers: self
                .manifest
                .triggers
                .iter()
                .zip(&self.trigger_names)
                .map(|(t, installed)| InstalledTrigger {
                    name: t.name.clone(),
                    installed_as: installed.clone(),
                })
                .collect(),
            seed_rows: self
                .seeded
                .iter()
                .map(|t| t.seed_rows_to_emit().len())
                .sum(),
        }
    }
}

/// Compile a manifest into installer sources.
///
/// `class_override` replaces the manifest's installer class name when it is
/// non-blank. Fails when the class name is missing or not a PHP identifier,
/// or the manifest prefix is empty.
pub fn compile(
    manifest: &Manifest,
    class_override: Option<&str>,
    options: &EmitOptions,
) -> Result<CompiledInstaller> {
    let class_name = resolve_class_name(manifest, class_override)?;
    if manifest.default_prefix.is_empty() {
        return Err(PressError::invalid_manifest(
            "manifest default prefix is empty",
        ));
    }

    let plan = CompilePlan::new(manifest, class_name, options);
    let report = plan.report();

    let compiled = CompiledInstaller {
        installer_class: OutputFile {
            kind: OutputKind::InstallerClass,
            file_name: templates::class_file_name(&plan.slug),
            content: installer::render(&plan),
        },
        installer_stub: OutputFile {
            kind: OutputKind::InstallerStub,
            file_name: templates::stub_file_name(&plan.slug),
            content: templates::render_stub(&plan),
        },
        main_plugin: OutputFile {
            kind: OutputKind::MainPlugin,
            file_name: templates::main_file_name(&plan.slug),
            content: templates::render_main(&plan),
        },
        report,
    };

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, SeedRow, SeedValue, Trigger};
    use tempfile::tempdir;

    fn id_column() -> Column {
        Column {
            name: "id".into(),
            data_type: "bigint(20) unsigned".into(),
            nullable: false,
            auto_increment: true,
            primary_key: true,
            default: None,
            comment: None,
        }
    }

    fn table(name: &str) -> Table {
        let mut t = Table::new(name, format!("wp_{}", name), "shop");
        t.columns.push(id_column());
        t
    }

    fn manifest() -> Manifest {
        let mut m = Manifest::new("shop", "wp_");
        m.tables = vec![table("orders"), table("options"), table("archive")];
        m.tables[2].skip = true;
        m
    }

    fn install_section(php: &str) -> &str {
        let start = php.find("public function install()").unwrap();
        let end = php.find("public function populate()").unwrap();
        &php[start..end]
    }

    #[test]
    fn test_file_names_follow_slug() {
        let compiled = compile(&manifest(), Some("AcmeShopInstaller"), &EmitOptions::default()).unwrap();
        assert_eq!(compiled.installer_class.file_name, "class-acme-shop-installer.php");
        assert_eq!(compiled.installer_stub.file_name, "acme-shop-installer-installer.php");
        assert_eq!(compiled.main_plugin.file_name, "acme-shop-installer.php");
        assert!(compiled.installer_class.content.contains("class AcmeShopInstaller {"));
    }

    #[test]
    fn test_invalid_class_name_fails_whole_compile() {
        let mut m = manifest();
        m.installer_class = String::new();
        assert!(matches!(
            compile(&m, None, &EmitOptions::default()),
            Err(PressError::ManifestValidation(_))
        ));
        assert!(compile(&m, Some("Bad Name"), &EmitOptions::default()).is_err());
    }

    #[test]
    fn test_empty_prefix_fails() {
        let mut m = manifest();
        m.default_prefix.clear();
        assert!(matches!(
            compile(&m, None, &EmitOptions::default()),
            Err(PressError::ManifestValidation(_))
        ));
    }

    #[test]
    fn test_core_table_and_skip_are_independent_exclusions() {
        let compiled = compile(&manifest(), None, &EmitOptions::default()).unwrap();
        let report = &compiled.report;
        assert_eq!(report.tables, vec!["orders"]);
        assert_eq!(report.exclusion("options"), Some(ExclusionReason::CoreTable));
        assert_eq!(report.exclusion("archive"), Some(ExclusionReason::Skipped));
        assert_eq!(report.exclusion("orders"), None);

        let php = &compiled.installer_class.content;
        assert!(php.contains("CREATE TABLE {$this->prefix}orders ("));
        assert!(!php.contains("CREATE TABLE {$this->prefix}options"));
        assert!(!php.contains("CREATE TABLE {$this->prefix}archive"));
        assert!(!php.contains("DROP TABLE IF EXISTS {$this->prefix}options"));
        assert!(!php.contains("DROP TABLE IF EXISTS {$this->prefix}archive"));

        // An empty core set lets "options" through while "archive" stays skipped.
        let options = EmitOptions::default().with_core_tables(Vec::<String>::new());
        let compiled = compile(&manifest(), None, &options).unwrap();
        assert_eq!(compiled.report.tables, vec!["orders", "options"]);
        assert_eq!(
            compiled.report.exclusion("archive"),
            Some(ExclusionReason::Skipped)
        );
    }

    #[test]
    fn test_seed_rows_capped_at_row_limit() {
        let mut m = manifest();
        m.tables[0].row_limit = 3;
        m.tables[0].seed_data = (1..=10)
            .map(|i| {
                let mut row = SeedRow::new();
                row.insert("id".into(), SeedValue::from(i));
                row.insert("paid".into(), SeedValue::Bool(i % 2 == 0));
                row
            })
            .collect();

        let compiled = compile(&m, None, &EmitOptions::default()).unwrap();
        let php = &compiled.installer_class.content;
        assert_eq!(php.matches("INSERT INTO").count(), 3);
        assert!(php.contains(
            "INSERT INTO {$this->prefix}orders (`id`, `paid`) VALUES ('1', '0')"
        ));
        assert_eq!(compiled.report.seed_rows, 3);
    }

    #[test]
    fn test_core_table_seed_rows_are_still_inserted() {
        let mut m = manifest();
        m.tables[1].row_limit = 2;
        m.tables[1].seed_data = ["acme_mode", "acme_version"]
            .iter()
            .map(|name| {
                let mut row = SeedRow::new();
                row.insert("option_name".into(), SeedValue::from(*name));
                row
            })
            .collect();
        m.tables[2].row_limit = 5;
        m.tables[2].seed_data = m.tables[1].seed_data.clone();

        let compiled = compile(&m, None, &EmitOptions::default()).unwrap();
        let php = &compiled.installer_class.content;
        assert_eq!(compiled.report.exclusion("options"), Some(ExclusionReason::CoreTable));
        assert!(!php.contains("CREATE TABLE {$this->prefix}options"));
        assert_eq!(php.matches("INSERT INTO {$this->prefix}options (").count(), 2);
        assert!(!php.contains("INSERT INTO {$this->prefix}archive"));
        assert_eq!(compiled.report.seed_rows, 2);
    }

    #[test]
    fn test_zero_row_limit_emits_no_inserts() {
        let mut m = manifest();
        let mut row = SeedRow::new();
        row.insert("id".into(), SeedValue::from(1));
        m.tables[0].seed_data.push(row);
        let compiled = compile(&m, None, &EmitOptions::default()).unwrap();
        assert!(!compiled.installer_class.content.contains("INSERT INTO"));
    }

    #[test]
    fn test_trigger_drop_policy() {
        let mut m = manifest();
        m.triggers.push(Trigger {
            name: "orders".into(),
            name_original: "wp_orders".into(),
            full_name: "shop.wp_orders".into(),
            event: "AFTER INSERT".into(),
            table: "orders".into(),
            definition: "BEGIN END".into(),
            comment: None,
        });

        let compiled = compile(&m, None, &EmitOptions::default()).unwrap();
        let php = &compiled.installer_class.content;
        assert_eq!(
            php.matches("DROP TRIGGER IF EXISTS `{$this->prefix}orders_trg`").count(),
            2
        );
        assert_eq!(compiled.report.triggers[0].installed_as, "orders_trg");

        let options = EmitOptions {
            trigger_drop: TriggerDropPolicy::Original,
            ..EmitOptions::default()
        };
        let php = compile(&m, None, &options).unwrap().installer_class.content;
        assert_eq!(
            php.matches("DROP TRIGGER IF EXISTS `{$this->prefix}orders_trg`").count(),
            1
        );
        assert!(php.contains("DROP TRIGGER IF EXISTS `{$this->prefix}orders`"));
    }

    #[test]
    fn test_compile_is_deterministic_and_does_not_touch_input() {
        let m = manifest();
        let before = m.clone();
        let a = compile(&m, None, &EmitOptions::default()).unwrap();
        let b = compile(&m, None, &EmitOptions::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(m, before);
    }

    #[test]
    fn test_install_guards_dbdelta_with_core_check() {
        let compiled = compile(&manifest(), None, &EmitOptions::default()).unwrap();
        let install = install_section(&compiled.installer_class.content);
        assert!(install.contains("if ( ! $this->is_core_table( $this->prefix . 'orders' ) ) {"));
        assert!(install.contains("dbDelta( $sql );"));
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempdir().unwrap();
        let compiled = compile(&manifest(), None, &EmitOptions::default()).unwrap();
        let written = compiled.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 3);
        for path in written {
            assert!(path.exists());
        }
    }
}
