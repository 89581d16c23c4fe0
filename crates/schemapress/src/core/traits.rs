//! The catalog capability the introspector depends on.
//!
//! [`CatalogReader`] is the seam between schema introspection and a live
//! database. The MySQL driver implements it over a `sqlx` pool; tests
//! implement it over in-memory fixtures.

use async_trait::async_trait;

use crate::error::Result;

use super::catalog::{
    ColumnRow, ConstraintRow, ForeignKeyRow, IndexRow, RelationKind, RelationRow, TriggerRow,
};
use super::value::SeedRow;

/// Read schema metadata from a source database.
///
/// Every method maps to one catalog command and returns its rows unprocessed.
/// Table, view and routine names are passed exactly as the catalog reported
/// them (prefix included).
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Name of the database the connection is scoped to.
    async fn database_name(&self) -> Result<String>;

    /// Base tables or views of the current database, in name order.
    async fn list_relations(&self, kind: RelationKind) -> Result<Vec<RelationRow>>;

    /// `SHOW FULL COLUMNS FROM <table>`.
    async fn show_columns(&self, table: &str) -> Result<Vec<ColumnRow>>;

    /// `SHOW INDEX FROM <table>`, one row per index column.
    async fn show_index(&self, table: &str) -> Result<Vec<IndexRow>>;

    /// Table constraints with their key columns.
    async fn table_constraints(&self, table: &str) -> Result<Vec<ConstraintRow>>;

    /// Foreign key column pairs with referential rules.
    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Up to `limit` rows of `table` (every row when `limit <= 0`).
    async fn select_rows(&self, table: &str, limit: i64) -> Result<Vec<SeedRow>>;

    /// `SHOW CREATE VIEW` text.
    async fn show_create_view(&self, view: &str) -> Result<String>;

    /// Names of the stored procedures in the current database.
    async fn list_procedures(&self) -> Result<Vec<String>>;

    /// `SHOW CREATE PROCEDURE` text.
    async fn show_create_procedure(&self, name: &str) -> Result<String>;

    /// `SHOW TRIGGERS` for the current database.
    async fn show_triggers(&self) -> Result<Vec<TriggerRow>>;

    /// Release connections. The default does nothing.
    async fn close(&self) {}
}
