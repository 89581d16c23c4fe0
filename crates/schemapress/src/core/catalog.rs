//! Raw catalog rows as a [`CatalogReader`](super::CatalogReader) returns them.
//!
//! These mirror the result sets of the MySQL metadata commands one row at a
//! time, before any grouping or prefix handling. The introspector turns them
//! into manifest entities.

/// Kind of relation listed in `information_schema.TABLES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BaseTable,
    View,
}

impl RelationKind {
    /// Value of `TABLE_TYPE` for this kind.
    pub fn table_type(&self) -> &'static str {
        match self {
            RelationKind::BaseTable => "BASE TABLE",
            RelationKind::View => "VIEW",
        }
    }
}

/// One table or view name with its comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRow {
    pub name: String,
    pub comment: Option<String>,
}

/// One row of `SHOW FULL COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRow {
    pub field: String,
    pub column_type: String,
    /// `YES` or `NO`.
    pub null: String,
    /// `PRI`, `UNI`, `MUL` or empty.
    pub key: String,
    pub default: Option<String>,
    /// e.g. `auto_increment`, `on update current_timestamp()`.
    pub extra: String,
    pub comment: Option<String>,
}

/// One row of `SHOW INDEX`: a single column of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub key_name: String,
    pub column_name: String,
    pub non_unique: bool,
}

/// One column of a table constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRow {
    pub name: String,
    pub constraint_type: String,
    /// Absent for CHECK constraints, which have no key columns.
    pub column: Option<String>,
}

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

/// One row of `SHOW TRIGGERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRow {
    pub name: String,
    /// INSERT, UPDATE or DELETE.
    pub event: String,
    pub table: String,
    pub statement: String,
    /// BEFORE or AFTER.
    pub timing: String,
}
