//! In-memory catalog.
//!
//! Serves fixed catalog rows through [`CatalogReader`] so introspection can
//! run without a server. Built with a small builder API:
//!
//! ```rust,ignore
//! let catalog = MemoryCatalog::new("shop")
//!     .with_table(MemoryTable::new("wp_orders").column(id_column))
//!     .with_view("wp_orders_v", "CREATE VIEW ...");
//! ```

use async_trait::async_trait;

use crate::core::{
    CatalogReader, ColumnRow, ConstraintRow, ForeignKeyRow, IndexRow, RelationKind, RelationRow,
    SeedRow, TriggerRow,
};
use crate::error::{PressError, Result};

/// One table's catalog rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    name: String,
    comment: Option<String>,
    columns: Vec<ColumnRow>,
    indexes: Vec<IndexRow>,
    constraints: Vec<ConstraintRow>,
    foreign_keys: Vec<ForeignKeyRow>,
    rows: Vec<SeedRow>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn column(mut self, column: ColumnRow) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexRow) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn constraint(mut self, constraint: ConstraintRow) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyRow) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn rows(mut self, rows: Vec<SeedRow>) -> Self {
        self.rows = rows;
        self
    }
}

/// A [`CatalogReader`] over fixed rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    database: String,
    tables: Vec<MemoryTable>,
    views: Vec<(String, String)>,
    procedures: Vec<(String, String)>,
    triggers: Vec<TriggerRow>,
    fail_on: Option<String>,
}

impl MemoryCatalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_view(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.views.push((name.into(), definition.into()));
        self
    }

    pub fn with_procedure(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.procedures.push((name.into(), definition.into()));
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerRow) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Make every per-table query for `table` fail.
    pub fn fail_on(mut self, table: impl Into<String>) -> Self {
        self.fail_on = Some(table.into());
        self
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(PressError::introspection(name, "simulated catalog failure"));
        }
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| PressError::introspection(name, "table does not exist"))
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn database_name(&self) -> Result<String> {
        Ok(self.database.clone())
    }

    async fn list_relations(&self, kind: RelationKind) -> Result<Vec<RelationRow>> {
        let mut rows: Vec<RelationRow> = match kind {
            RelationKind::BaseTable => self
                .tables
                .iter()
                .map(|t| RelationRow {
                    name: t.name.clone(),
                    comment: t.comment.clone(),
                })
                .collect(),
            RelationKind::View => self
                .views
                .iter()
                .map(|(name, _)| RelationRow {
                    name: name.clone(),
                    comment: Some("VIEW".to_string()),
                })
                .collect(),
        };
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn show_columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn show_index(&self, table: &str) -> Result<Vec<IndexRow>> {
        Ok(self.table(table)?.indexes.clone())
    }

    async fn table_constraints(&self, table: &str) -> Result<Vec<ConstraintRow>> {
        Ok(self.table(table)?.constraints.clone())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        Ok(self.table(table)?.foreign_keys.clone())
    }

    async fn select_rows(&self, table: &str, limit: i64) -> Result<Vec<SeedRow>> {
        let rows = &self.table(table)?.rows;
        let take = match usize::try_from(limit) {
            Ok(n) if n > 0 => n,
            _ => rows.len(),
        };
        Ok(rows.iter().take(take).cloned().collect())
    }

    async fn show_create_view(&self, view: &str) -> Result<String> {
        self.views
            .iter()
            .find(|(name, _)| name == view)
            .map(|(_, def)| def.clone())
            .ok_or_else(|| PressError::introspection(view, "view does not exist"))
    }

    async fn list_procedures(&self) -> Result<Vec<String>> {
        Ok(self.procedures.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn show_create_procedure(&self, name: &str) -> Result<String> {
        self.procedures
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def.clone())
            .ok_or_else(|| PressError::introspection(name, "procedure does not exist"))
    }

    async fn show_triggers(&self) -> Result<Vec<TriggerRow>> {
        Ok(self.triggers.clone())
    }
}
