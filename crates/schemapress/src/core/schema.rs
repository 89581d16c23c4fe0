//! Manifest entity types: tables, views, stored procedures and triggers.
//!
//! These types are the language-neutral intermediate representation shared by
//! the introspector (which fills them), the manifest serializer and the
//! installer emitter (which only reads them). Field names serialize in
//! camelCase and absent optional fields are omitted.
//!
//! Sanitized definitions are exposed as methods and computed on demand; they
//! are never stored or serialized.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::SeedRow;
use crate::sanitize;

/// Prefix assumed when a manifest does not name one.
pub const DEFAULT_PREFIX: &str = "wp_";

/// Installer class name assumed when a manifest does not name one.
pub const DEFAULT_INSTALLER_CLASS: &str = "MyPluginInstaller";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_installer_class() -> String {
    DEFAULT_INSTALLER_CLASS.to_string()
}

/// The complete introspected schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Name of the source database.
    #[serde(default)]
    pub database: String,

    /// When the manifest was produced.
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,

    /// Table prefix of the source schema (e.g. `wp_`).
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// PHP class name of the generated installer.
    #[serde(default = "default_installer_class")]
    pub installer_class: String,

    /// Whether seed rows were captured.
    #[serde(default)]
    pub include_seed_data: bool,

    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default)]
    pub views: Vec<View>,

    #[serde(default)]
    pub stored_procedures: Vec<StoredProcedure>,

    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl Manifest {
    /// Create an empty manifest for `database` with the given prefix.
    pub fn new(database: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            generated_at: Utc::now(),
            default_prefix: prefix.into(),
            installer_class: default_installer_class(),
            include_seed_data: false,
            tables: Vec::new(),
            views: Vec::new(),
            stored_procedures: Vec::new(),
            triggers: Vec::new(),
        }
    }

    /// Look up a table by its prefix-stripped name (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Total number of schema objects in the manifest.
    pub fn object_count(&self) -> usize {
        self.tables.len() + self.views.len() + self.stored_procedures.len() + self.triggers.len()
    }
}

/// Table metadata plus optional seed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Name with the prefix stripped.
    pub name: String,

    /// Name as it exists in the source schema.
    #[serde(default)]
    pub name_original: String,

    /// Fully-qualified `database.table` name.
    #[serde(default)]
    pub full_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Maximum seed rows to emit; zero or less emits none.
    #[serde(default)]
    pub row_limit: i64,

    /// Excluded from CREATE and DROP, kept in the manifest.
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub columns: Vec<Column>,

    #[serde(default)]
    pub indexes: Vec<Index>,

    #[serde(default)]
    pub constraints: Vec<Constraint>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    #[serde(default)]
    pub seed_data: Vec<SeedRow>,
}

impl Table {
    /// Create an empty table entry.
    pub fn new(name: impl Into<String>, name_original: impl Into<String>, database: &str) -> Self {
        let name_original = name_original.into();
        Self {
            name: name.into(),
            full_name: format!("{}.{}", database, name_original),
            name_original,
            comment: None,
            row_limit: 0,
            skip: false,
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            foreign_keys: Vec::new(),
            seed_data: Vec::new(),
        }
    }

    /// Primary key columns in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Seed rows the installer should insert, capped at `row_limit`.
    pub fn seed_rows_to_emit(&self) -> &[SeedRow] {
        if self.row_limit <= 0 {
            return &[];
        }
        let cap = usize::try_from(self.row_limit).unwrap_or(usize::MAX);
        &self.seed_data[..self.seed_data.len().min(cap)]
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,

    /// Raw type string as reported by the catalog (e.g. `decimal(10,2) unsigned`).
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub nullable: bool,

    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default)]
    pub primary_key: bool,

    /// Raw default literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// Table constraint (PRIMARY KEY, UNIQUE, FOREIGN KEY, CHECK).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub name: String,
    #[serde(rename = "type")]
    pub constraint_type: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    pub references: ForeignKeyReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// Referenced side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyReference {
    /// Referenced table, prefix stripped.
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

/// View definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    #[serde(default)]
    pub name_original: String,
    #[serde(default)]
    pub full_name: String,
    /// Raw `SHOW CREATE VIEW` text.
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl View {
    /// Definition with definer, algorithm and security clauses removed.
    pub fn sanitized_definition(&self) -> String {
        sanitize::sanitize_view_definition(&self.definition)
    }
}

/// Stored procedure definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProcedure {
    pub name: String,
    #[serde(default)]
    pub name_original: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Raw `SHOW CREATE PROCEDURE` text.
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl StoredProcedure {
    /// Definition with definer clauses and `DELIMITER` directives removed.
    pub fn sanitized_definition(&self) -> String {
        sanitize::sanitize_routine_definition(&self.definition)
    }
}

/// Parameter direction of a stored procedure argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// Parse a mode keyword, case-insensitively.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "IN" => Some(ParameterMode::In),
            "OUT" => Some(ParameterMode::Out),
            "INOUT" => Some(ParameterMode::InOut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterMode::In => "IN",
            ParameterMode::Out => "OUT",
            ParameterMode::InOut => "INOUT",
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub mode: ParameterMode,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Trigger definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,
    #[serde(default)]
    pub name_original: String,
    #[serde(default)]
    pub full_name: String,
    /// Timing and event, e.g. `BEFORE INSERT`.
    #[serde(default)]
    pub event: String,
    /// Owning table, prefix stripped.
    pub table: String,
    /// Trigger body as reported by the catalog.
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Trigger {
    /// Body with definer clauses and `DELIMITER` directives removed.
    pub fn sanitized_definition(&self) -> String {
        sanitize::sanitize_routine_definition(&self.definition)
    }

    /// Timing and event parsed from [`Trigger::event`].
    ///
    /// Missing or unrecognized words fall back to `AFTER` and `INSERT`.
    pub fn timing_and_event(&self) -> (TriggerTiming, TriggerEvent) {
        let mut words = self.event.split_whitespace();
        let timing = words
            .next()
            .and_then(TriggerTiming::parse)
            .unwrap_or(TriggerTiming::After);
        let event = words
            .next()
            .and_then(TriggerEvent::parse)
            .unwrap_or(TriggerEvent::Insert);
        (timing, event)
    }
}

/// When a trigger fires relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Before,
    After,
}

impl TriggerTiming {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "BEFORE" => Some(TriggerTiming::Before),
            "AFTER" => Some(TriggerTiming::After),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
        }
    }
}

/// Row event a trigger listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "INSERT" => Some(TriggerEvent::Insert),
            "UPDATE" => Some(TriggerEvent::Update),
            "DELETE" => Some(TriggerEvent::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SeedValue;

    fn column(name: &str, pk: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: "int".to_string(),
            nullable: false,
            auto_increment: false,
            primary_key: pk,
            default: None,
            comment: None,
        }
    }

    #[test]
    fn test_primary_key_columns_keep_declaration_order() {
        let mut table = Table::new("orders", "wp_orders", "shop");
        table.columns = vec![column("b", true), column("x", false), column("a", true)];
        assert_eq!(table.primary_key_columns(), vec!["b", "a"]);
        assert_eq!(table.full_name, "shop.wp_orders");
    }

    #[test]
    fn test_seed_rows_capped_by_row_limit() {
        let mut table = Table::new("orders", "wp_orders", "shop");
        table.seed_data = (0..10)
            .map(|i| {
                let mut row = SeedRow::new();
                row.insert("id".into(), SeedValue::from(i));
                row
            })
            .collect();

        assert!(table.seed_rows_to_emit().is_empty());
        table.row_limit = 3;
        assert_eq!(table.seed_rows_to_emit().len(), 3);
        table.row_limit = 50;
        assert_eq!(table.seed_rows_to_emit().len(), 10);
        table.row_limit = -1;
        assert!(table.seed_rows_to_emit().is_empty());
    }

    #[test]
    fn test_trigger_timing_and_event_defaults() {
        let mut trigger = Trigger {
            name: "audit".into(),
            name_original: "wp_audit".into(),
            full_name: "shop.wp_audit".into(),
            event: "before update".into(),
            table: "orders".into(),
            definition: "SET @x = 1".into(),
            comment: None,
        };
        assert_eq!(
            trigger.timing_and_event(),
            (TriggerTiming::Before, TriggerEvent::Update)
        );

        trigger.event = String::new();
        assert_eq!(
            trigger.timing_and_event(),
            (TriggerTiming::After, TriggerEvent::Insert)
        );

        trigger.event = "SOMETIME BANANA".into();
        assert_eq!(
            trigger.timing_and_event(),
            (TriggerTiming::After, TriggerEvent::Insert)
        );
    }

    #[test]
    fn test_sanitized_definition_is_not_serialized() {
        let view = View {
            name: "orders_v".into(),
            name_original: "wp_orders_v".into(),
            full_name: "shop.wp_orders_v".into(),
            definition: "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `wp_orders_v` AS select 1".into(),
            comment: None,
        };
        assert_eq!(
            view.sanitized_definition(),
            "CREATE VIEW `wp_orders_v` AS select 1"
        );

        let json = serde_json::to_value(&view).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "nameOriginal", "fullName", "definition"]);
    }

    #[test]
    fn test_parameter_mode_serializes_uppercase() {
        let p = Parameter {
            mode: ParameterMode::InOut,
            name: "p_total".into(),
            data_type: "DECIMAL(10,2)".into(),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"mode":"INOUT","name":"p_total","type":"DECIMAL(10,2)"}"#);
    }
}
