//! Schema introspection: catalog rows to manifest entities.
//!
//! The [`Introspector`] walks a [`CatalogReader`] and assembles a
//! [`Manifest`]. Only objects whose name starts with the configured prefix are
//! captured (triggers are matched by the prefix of their table) and the prefix
//! is stripped from every captured name.
//!
//! Per-table metadata is loaded with bounded concurrency; results keep catalog
//! order. The cancellation token is checked before each entity, and any
//! catalog error aborts the whole run.

mod params;

pub use params::parse_procedure_parameters;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::identifier::strip_prefix;
use crate::core::{
    CatalogReader, Column, ColumnRow, Constraint, ConstraintRow, ForeignKey, ForeignKeyReference,
    ForeignKeyRow, Index, IndexRow, Manifest, RelationKind, RelationRow, SeedRow,
    StoredProcedure, Table, Trigger, TriggerRow, View, DEFAULT_INSTALLER_CLASS, DEFAULT_PREFIX,
};
use crate::error::{PressError, Result};

/// Row limit applied to seed data when none is configured.
pub const DEFAULT_ROW_LIMIT: i64 = 100;

/// What to capture and how.
#[derive(Debug, Clone)]
pub struct IntrospectOptions {
    /// Only objects whose name starts with this prefix are captured.
    pub prefix: String,
    /// Capture seed rows for every table.
    pub include_seed_data: bool,
    /// Seed rows per table; zero or less captures every row.
    pub default_row_limit: i64,
    /// Class name recorded in the manifest.
    pub installer_class: String,
    /// Tables whose metadata is loaded concurrently.
    pub parallel_tables: usize,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            include_seed_data: false,
            default_row_limit: DEFAULT_ROW_LIMIT,
            installer_class: DEFAULT_INSTALLER_CLASS.to_string(),
            parallel_tables: 4,
        }
    }
}

/// Builds manifest entities from a catalog.
pub struct Introspector<'a, R: CatalogReader + ?Sized> {
    reader: &'a R,
    options: IntrospectOptions,
    cancel: CancellationToken,
    database: OnceCell<String>,
}

impl<'a, R: CatalogReader + ?Sized> Introspector<'a, R> {
    pub fn new(reader: &'a R, options: IntrospectOptions) -> Self {
        Self {
            reader,
            options,
            cancel: CancellationToken::new(),
            database: OnceCell::new(),
        }
    }

    /// Stop at the next entity boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &IntrospectOptions {
        &self.options
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PressError::Cancelled);
        }
        Ok(())
    }

    async fn database(&self) -> Result<&str> {
        let name = self
            .database
            .get_or_try_init(|| self.reader.database_name())
            .await?;
        Ok(name.as_str())
    }

    /// Capture the whole schema into a manifest.
    pub async fn introspect(&self) -> Result<Manifest> {
        let database = self.database().await?.to_string();
        let prefix = self.options.prefix.clone();
        info!(
            "Introspecting database {} (prefix {:?}, seed data: {})",
            database, prefix, self.options.include_seed_data
        );

        let tables = self.list_tables(&prefix).await?;
        let views = self.list_views(&prefix).await?;
        let stored_procedures = self.list_stored_procedures(&prefix).await?;
        let triggers = self.list_triggers(&prefix).await?;

        info!(
            "Captured {} tables, {} views, {} procedures, {} triggers",
            tables.len(),
            views.len(),
            stored_procedures.len(),
            triggers.len()
        );

        Ok(Manifest {
            database,
            generated_at: Utc::now(),
            default_prefix: prefix,
            installer_class: self.options.installer_class.clone(),
            include_seed_data: self.options.include_seed_data,
            tables,
            views,
            stored_procedures,
            triggers,
        })
    }

    /// Base tables starting with `prefix`, with columns, indexes, constraints,
    /// foreign keys and (when requested) seed rows.
    pub async fn list_tables(&self, prefix: &str) -> Result<Vec<Table>> {
        self.checkpoint()?;
        let database = self.database().await?.to_string();
        let relations: Vec<RelationRow> = self
            .reader
            .list_relations(RelationKind::BaseTable)
            .await?
            .into_iter()
            .filter(|r| r.name.starts_with(prefix))
            .collect();
        debug!("{} base tables match prefix {:?}", relations.len(), prefix);

        let database = database.as_str();
        stream::iter(relations)
            .map(|relation| self.load_table(relation, prefix, database))
            .buffered(self.options.parallel_tables.max(1))
            .try_collect()
            .await
    }

    async fn load_table(&self, relation: RelationRow, prefix: &str, database: &str) -> Result<Table> {
        self.checkpoint()?;
        let mut table = Table::new(strip_prefix(&relation.name, prefix), &relation.name, database);
        table.comment = relation.comment.filter(|c| !c.is_empty());

        table.columns = self.list_columns(&relation.name).await?;
        table.indexes = self.list_indexes(&relation.name).await?;
        table.constraints = self.list_constraints(&relation.name).await?;
        table.foreign_keys = self.list_foreign_keys(&relation.name, prefix).await?;

        if self.options.include_seed_data {
            table.seed_data = self
                .list_seed_rows(&relation.name, self.options.default_row_limit)
                .await?;
            table.row_limit = if self.options.default_row_limit > 0 {
                self.options.default_row_limit
            } else {
                i64::try_from(table.seed_data.len()).unwrap_or(i64::MAX)
            };
        }

        debug!(
            "Loaded {}: {} columns, {} indexes, {} foreign keys, {} seed rows",
            relation.name,
            table.columns.len(),
            table.indexes.len(),
            table.foreign_keys.len(),
            table.seed_data.len()
        );
        Ok(table)
    }

    pub async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let rows = self.reader.show_columns(table).await?;
        Ok(rows.into_iter().map(column_from_row).collect())
    }

    pub async fn list_indexes(&self, table: &str) -> Result<Vec<Index>> {
        Ok(group_indexes(self.reader.show_index(table).await?))
    }

    pub async fn list_constraints(&self, table: &str) -> Result<Vec<Constraint>> {
        Ok(group_constraints(self.reader.table_constraints(table).await?))
    }

    pub async fn list_foreign_keys(&self, table: &str, prefix: &str) -> Result<Vec<ForeignKey>> {
        Ok(group_foreign_keys(
            self.reader.foreign_keys(table).await?,
            prefix,
        ))
    }

    /// Up to `limit` rows of `table`; every row when `limit <= 0`.
    pub async fn list_seed_rows(&self, table: &str, limit: i64) -> Result<Vec<SeedRow>> {
        self.checkpoint()?;
        self.reader.select_rows(table, limit).await
    }

    /// Views starting with `prefix`, with their raw definitions.
    pub async fn list_views(&self, prefix: &str) -> Result<Vec<View>> {
        let database = self.database().await?.to_string();
        let relations = self.reader.list_relations(RelationKind::View).await?;

        let mut views = Vec::new();
        for relation in relations.into_iter().filter(|r| r.name.starts_with(prefix)) {
            self.checkpoint()?;
            let definition = self.reader.show_create_view(&relation.name).await?;
            views.push(View {
                name: strip_prefix(&relation.name, prefix),
                full_name: format!("{}.{}", database, relation.name),
                name_original: relation.name,
                definition,
                comment: relation.comment.filter(|c| !c.is_empty() && c != "VIEW"),
            });
        }
        Ok(views)
    }

    /// Stored procedures starting with `prefix`, with parsed parameters.
    pub async fn list_stored_procedures(&self, prefix: &str) -> Result<Vec<StoredProcedure>> {
        let database = self.database().await?.to_string();
        let names = self.reader.list_procedures().await?;

        let mut procedures = Vec::new();
        for name in names.into_iter().filter(|n| n.starts_with(prefix)) {
            self.checkpoint()?;
            let definition = self.reader.show_create_procedure(&name).await?;
            if definition.trim().is_empty() {
                warn!(
                    "Procedure {} has no visible definition (missing privileges?)",
                    name
                );
            }
            procedures.push(StoredProcedure {
                name: strip_prefix(&name, prefix),
                full_name: format!("{}.{}", database, name),
                parameters: parse_procedure_parameters(&definition),
                name_original: name,
                definition,
                comment: None,
            });
        }
        Ok(procedures)
    }

    /// Triggers whose table starts with `prefix`.
    pub async fn list_triggers(&self, prefix: &str) -> Result<Vec<Trigger>> {
        self.checkpoint()?;
        let database = self.database().await?.to_string();
        Ok(self
            .reader
            .show_triggers()
            .await?
            .into_iter()
            .filter(|row| row.table.starts_with(prefix))
            .map(|row| trigger_from_row(row, prefix, &database))
            .collect())
    }
}

/// Map one `SHOW FULL COLUMNS` row.
pub fn column_from_row(row: ColumnRow) -> Column {
    Column {
        nullable: row.null.eq_ignore_ascii_case("YES"),
        auto_increment: row.extra.to_ascii_lowercase().contains("auto_increment"),
        primary_key: row.key.eq_ignore_ascii_case("PRI"),
        name: row.field,
        data_type: row.column_type,
        default: row.default,
        comment: row.comment.filter(|c| !c.is_empty()),
    }
}

/// Group per-column index rows into indexes, in order of first appearance.
///
/// Uniqueness comes from the first row seen for each index.
pub fn group_indexes(rows: Vec<IndexRow>) -> Vec<Index> {
    let mut indexes: Vec<Index> = Vec::new();
    for row in rows {
        match indexes.iter_mut().find(|i| i.name == row.key_name) {
            Some(index) => index.columns.push(row.column_name),
            None => indexes.push(Index {
                name: row.key_name,
                columns: vec![row.column_name],
                unique: !row.non_unique,
            }),
        }
    }
    indexes
}

/// Group per-column constraint rows by constraint name.
pub fn group_constraints(rows: Vec<ConstraintRow>) -> Vec<Constraint> {
    let mut constraints: Vec<Constraint> = Vec::new();
    for row in rows {
        let idx = match constraints.iter().position(|c| c.name == row.name) {
            Some(idx) => idx,
            None => {
                constraints.push(Constraint {
                    name: row.name,
                    constraint_type: row.constraint_type,
                    columns: Vec::new(),
                });
                constraints.len() - 1
            }
        };
        if let Some(column) = row.column {
            constraints[idx].columns.push(column);
        }
    }
    constraints
}

/// Group foreign key column pairs by constraint name, stripping `prefix`
/// from the referenced table.
pub fn group_foreign_keys(rows: Vec<ForeignKeyRow>, prefix: &str) -> Vec<ForeignKey> {
    let mut keys: Vec<ForeignKey> = Vec::new();
    for row in rows {
        match keys.iter_mut().find(|k| k.name == row.name) {
            Some(fk) => {
                fk.columns.push(row.column);
                fk.references.columns.push(row.referenced_column);
            }
            None => keys.push(ForeignKey {
                name: row.name,
                columns: vec![row.column],
                references: ForeignKeyReference {
                    table: strip_prefix(&row.referenced_table, prefix),
                    columns: vec![row.referenced_column],
                },
                on_update: row.update_rule.filter(|r| !r.is_empty()),
                on_delete: row.delete_rule.filter(|r| !r.is_empty()),
            }),
        }
    }
    keys
}

/// Map one `SHOW TRIGGERS` row.
pub fn trigger_from_row(row: TriggerRow, prefix: &str, database: &str) -> Trigger {
    let event = format!("{} {}", row.timing.trim(), row.event.trim())
        .trim()
        .to_ascii_uppercase();
    Trigger {
        name: strip_prefix(&row.name, prefix),
        full_name: format!("{}.{}", database, row.name),
        name_original: row.name,
        event,
        table: strip_prefix(&row.table, prefix),
        definition: row.statement,
        comment: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParameterMode, SeedValue};
    use crate::drivers::memory::{MemoryCatalog, MemoryTable};

    fn column(field: &str, column_type: &str, null: &str, key: &str, extra: &str) -> ColumnRow {
        ColumnRow {
            field: field.into(),
            column_type: column_type.into(),
            null: null.into(),
            key: key.into(),
            default: None,
            extra: extra.into(),
            comment: None,
        }
    }

    fn index(name: &str, column: &str, non_unique: bool) -> IndexRow {
        IndexRow {
            key_name: name.into(),
            column_name: column.into(),
            non_unique,
        }
    }

    fn shop_catalog() -> MemoryCatalog {
        let mut rows = Vec::new();
        for i in 1..=5 {
            let mut row = SeedRow::new();
            row.insert("id".into(), SeedValue::from(i));
            rows.push(row);
        }

        MemoryCatalog::new("shop")
            .with_table(
                MemoryTable::new("wp_orders")
                    .comment("Orders")
                    .column(column("id", "bigint(20) unsigned", "NO", "PRI", "auto_increment"))
                    .column(column("status", "varchar(20)", "YES", "MUL", ""))
                    .index(index("PRIMARY", "id", false))
                    .index(index("status_idx", "status", true))
                    .rows(rows),
            )
            .with_table(
                MemoryTable::new("wp_orders_meta")
                    .column(column("order_id", "bigint(20) unsigned", "NO", "", ""))
                    .foreign_key(ForeignKeyRow {
                        name: "fk_order".into(),
                        column: "order_id".into(),
                        referenced_table: "wp_orders".into(),
                        referenced_column: "id".into(),
                        update_rule: Some("CASCADE".into()),
                        delete_rule: Some("RESTRICT".into()),
                    }),
            )
            .with_table(MemoryTable::new("other_log"))
            .with_view(
                "wp_orders_v",
                "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `wp_orders_v` AS select `shop`.`wp_orders`.`id` AS `id` from `shop`.`wp_orders`",
            )
            .with_procedure(
                "wp_order_count",
                "CREATE DEFINER=`root`@`%` PROCEDURE `wp_order_count`(OUT p_total INT)\nBEGIN\n  SELECT COUNT(*) INTO p_total FROM wp_orders;\nEND",
            )
            .with_procedure("legacy_proc", "CREATE PROCEDURE legacy_proc() BEGIN END")
            .with_trigger(TriggerRow {
                name: "orders".into(),
                event: "INSERT".into(),
                table: "wp_orders".into(),
                statement: "BEGIN SET NEW.status = 'new'; END".into(),
                timing: "BEFORE".into(),
            })
            .with_trigger(TriggerRow {
                name: "wp_audit".into(),
                event: "DELETE".into(),
                table: "other_log".into(),
                statement: "BEGIN END".into(),
                timing: "AFTER".into(),
            })
    }

    #[test]
    fn test_column_from_row() {
        let col = column_from_row(column("id", "int(11)", "NO", "PRI", "auto_increment"));
        assert!(!col.nullable);
        assert!(col.auto_increment);
        assert!(col.primary_key);

        let col = column_from_row(column("note", "text", "YES", "", ""));
        assert!(col.nullable);
        assert!(!col.auto_increment);
        assert!(!col.primary_key);
    }

    #[test]
    fn test_group_indexes_keeps_first_seen_order_and_uniqueness() {
        let rows = vec![
            index("PRIMARY", "id", false),
            index("name_idx", "last", true),
            index("name_idx", "first", false),
            index("PRIMARY", "site", false),
        ];
        let indexes = group_indexes(rows);
        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].name, "PRIMARY");
        assert_eq!(indexes[0].columns, vec!["id", "site"]);
        assert!(indexes[0].unique);
        assert_eq!(indexes[1].columns, vec!["last", "first"]);
        assert!(!indexes[1].unique);
    }

    #[test]
    fn test_group_constraints() {
        let rows = vec![
            ConstraintRow {
                name: "PRIMARY".into(),
                constraint_type: "PRIMARY KEY".into(),
                column: Some("id".into()),
            },
            ConstraintRow {
                name: "chk_total".into(),
                constraint_type: "CHECK".into(),
                column: None,
            },
            ConstraintRow {
                name: "PRIMARY".into(),
                constraint_type: "PRIMARY KEY".into(),
                column: Some("site".into()),
            },
        ];
        let constraints = group_constraints(rows);
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].columns, vec!["id", "site"]);
        assert!(constraints[1].columns.is_empty());
    }

    #[test]
    fn test_group_foreign_keys_strips_referenced_prefix() {
        let row = |column: &str, referenced: &str| ForeignKeyRow {
            name: "fk_pair".into(),
            column: column.into(),
            referenced_table: "wp_sites".into(),
            referenced_column: referenced.into(),
            update_rule: Some("NO ACTION".into()),
            delete_rule: Some(String::new()),
        };
        let keys = group_foreign_keys(vec![row("site_id", "id"), row("blog_id", "blog")], "wp_");
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].columns, vec!["site_id", "blog_id"]);
        assert_eq!(keys[0].references.table, "sites");
        assert_eq!(keys[0].references.columns, vec!["id", "blog"]);
        assert_eq!(keys[0].on_update.as_deref(), Some("NO ACTION"));
        assert_eq!(keys[0].on_delete, None);
    }

    #[tokio::test]
    async fn test_introspect_filters_by_prefix() {
        let catalog = shop_catalog();
        let introspector = Introspector::new(&catalog, IntrospectOptions::default());
        let manifest = introspector.introspect().await.unwrap();

        assert_eq!(manifest.database, "shop");
        let names: Vec<&str> = manifest.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "orders_meta"]);

        let orders = &manifest.tables[0];
        assert_eq!(orders.name_original, "wp_orders");
        assert_eq!(orders.full_name, "shop.wp_orders");
        assert_eq!(orders.comment.as_deref(), Some("Orders"));
        assert_eq!(orders.primary_key_columns(), vec!["id"]);
        assert!(orders.seed_data.is_empty());
        assert_eq!(orders.row_limit, 0);

        assert_eq!(manifest.tables[1].foreign_keys[0].references.table, "orders");

        assert_eq!(manifest.views.len(), 1);
        assert_eq!(manifest.views[0].name, "orders_v");

        assert_eq!(manifest.stored_procedures.len(), 1);
        let sp = &manifest.stored_procedures[0];
        assert_eq!(sp.name, "order_count");
        assert_eq!(sp.parameters[0].mode, ParameterMode::Out);

        assert_eq!(manifest.triggers.len(), 1);
        assert_eq!(manifest.triggers[0].event, "BEFORE INSERT");
        assert_eq!(manifest.triggers[0].table, "orders");
    }

    #[tokio::test]
    async fn test_seed_rows_use_default_row_limit() {
        let catalog = shop_catalog();
        let options = IntrospectOptions {
            include_seed_data: true,
            default_row_limit: 3,
            ..IntrospectOptions::default()
        };
        let manifest = Introspector::new(&catalog, options).introspect().await.unwrap();
        assert!(manifest.include_seed_data);
        assert_eq!(manifest.tables[0].row_limit, 3);
        assert_eq!(manifest.tables[0].seed_data.len(), 3);

        let options = IntrospectOptions {
            include_seed_data: true,
            default_row_limit: 0,
            ..IntrospectOptions::default()
        };
        let manifest = Introspector::new(&catalog, options).introspect().await.unwrap();
        assert_eq!(manifest.tables[0].seed_data.len(), 5);
        assert_eq!(manifest.tables[0].row_limit, 5);
    }

    #[tokio::test]
    async fn test_catalog_error_aborts_introspection() {
        let catalog = shop_catalog().fail_on("wp_orders_meta");
        let result = Introspector::new(&catalog, IntrospectOptions::default())
            .introspect()
            .await;
        assert!(matches!(result, Err(PressError::Introspection { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_introspection() {
        let catalog = shop_catalog();
        let token = CancellationToken::new();
        token.cancel();
        let result = Introspector::new(&catalog, IntrospectOptions::default())
            .with_cancellation(token)
            .introspect()
            .await;
        assert!(matches!(result, Err(PressError::Cancelled)));
    }

    #[tokio::test]
    async fn test_trigger_names_outside_prefix_are_kept_verbatim() {
        let catalog = shop_catalog();
        let introspector = Introspector::new(&catalog, IntrospectOptions::default());
        let triggers = introspector.list_triggers("other_").await.unwrap();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].name, "wp_audit");
        assert_eq!(triggers[0].table, "log");
        assert_eq!(triggers[0].event, "AFTER DELETE");
    }
}
