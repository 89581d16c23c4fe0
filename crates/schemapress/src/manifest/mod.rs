//! Manifest interchange: JSON (de)serialization and validation.
//!
//! Manifests are written as pretty-printed camelCase JSON with absent
//! optional fields omitted. Reads are lenient about key casing: every key is
//! matched case-insensitively against the known field names before serde sees
//! it, so `TableName`-style documents from other tools load unchanged. Seed
//! row keys are column names and are never renamed.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::identifier::is_valid_php_class_name;
use crate::core::Manifest;
use crate::error::{PressError, Result};

/// Object shapes that appear in a manifest document.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Manifest,
    Table,
    Column,
    Index,
    Constraint,
    ForeignKey,
    Reference,
    View,
    Procedure,
    Parameter,
    Trigger,
}

/// What a field holds, for recursive key normalization.
#[derive(Debug, Clone, Copy)]
enum Nested {
    Scalar,
    Object(Shape),
    List(Shape),
    /// A single value of the named list field.
    OneOf(&'static str),
}

use Nested::{List, Object, OneOf, Scalar};

const MANIFEST_FIELDS: &[(&str, Nested)] = &[
    ("database", Scalar),
    ("generatedAt", Scalar),
    ("defaultPrefix", Scalar),
    ("installerClass", Scalar),
    ("includeSeedData", Scalar),
    ("tables", List(Shape::Table)),
    ("views", List(Shape::View)),
    ("storedProcedures", List(Shape::Procedure)),
    ("triggers", List(Shape::Trigger)),
];

const TABLE_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("nameOriginal", Scalar),
    ("fullName", Scalar),
    ("comment", Scalar),
    ("rowLimit", Scalar),
    ("skip", Scalar),
    ("columns", List(Shape::Column)),
    ("indexes", List(Shape::Index)),
    ("constraints", List(Shape::Constraint)),
    ("foreignKeys", List(Shape::ForeignKey)),
    ("seedData", Scalar),
];

const COLUMN_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("type", Scalar),
    ("nullable", Scalar),
    ("autoIncrement", Scalar),
    ("primaryKey", Scalar),
    ("default", Scalar),
    ("comment", Scalar),
];

const INDEX_FIELDS: &[(&str, Nested)] =
    &[("name", Scalar), ("columns", Scalar), ("unique", Scalar)];

const CONSTRAINT_FIELDS: &[(&str, Nested)] =
    &[("name", Scalar), ("type", Scalar), ("columns", Scalar)];

const FOREIGN_KEY_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("columns", Scalar),
    ("column", OneOf("columns")),
    ("references", Object(Shape::Reference)),
    ("onUpdate", Scalar),
    ("onDelete", Scalar),
];

const REFERENCE_FIELDS: &[(&str, Nested)] = &[
    ("table", Scalar),
    ("columns", Scalar),
    ("column", OneOf("columns")),
];

const VIEW_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("nameOriginal", Scalar),
    ("fullName", Scalar),
    ("definition", Scalar),
    ("comment", Scalar),
];

const PROCEDURE_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("nameOriginal", Scalar),
    ("fullName", Scalar),
    ("parameters", List(Shape::Parameter)),
    ("definition", Scalar),
    ("comment", Scalar),
];

const PARAMETER_FIELDS: &[(&str, Nested)] = &[("mode", Scalar), ("name", Scalar), ("type", Scalar)];

const TRIGGER_FIELDS: &[(&str, Nested)] = &[
    ("name", Scalar),
    ("nameOriginal", Scalar),
    ("fullName", Scalar),
    ("event", Scalar),
    ("table", Scalar),
    ("definition", Scalar),
    ("comment", Scalar),
];

impl Shape {
    fn fields(self) -> &'static [(&'static str, Nested)] {
        match self {
            Shape::Manifest => MANIFEST_FIELDS,
            Shape::Table => TABLE_FIELDS,
            Shape::Column => COLUMN_FIELDS,
            Shape::Index => INDEX_FIELDS,
            Shape::Constraint => CONSTRAINT_FIELDS,
            Shape::ForeignKey => FOREIGN_KEY_FIELDS,
            Shape::Reference => REFERENCE_FIELDS,
            Shape::View => VIEW_FIELDS,
            Shape::Procedure => PROCEDURE_FIELDS,
            Shape::Parameter => PARAMETER_FIELDS,
            Shape::Trigger => TRIGGER_FIELDS,
        }
    }
}

/// Rename object keys to their canonical spelling, recursively.
fn canonicalize(value: Value, shape: Shape) -> Value {
    let Value::Object(map) = value else {
        return value;
    };

    let fields = shape.fields();
    let mut out = Map::with_capacity(map.len());
    for (key, val) in map {
        match fields.iter().find(|(name, _)| name.eq_ignore_ascii_case(&key)) {
            Some((_, OneOf(list))) => {
                // An explicit list wins over the single-value spelling
                match val {
                    Value::Null => {}
                    Value::Array(items) => {
                        out.entry(*list).or_insert(Value::Array(items));
                    }
                    v => {
                        out.entry(*list).or_insert(Value::Array(vec![v]));
                    }
                }
            }
            Some((name, nested)) => {
                let val = match (*nested, val) {
                    (Object(inner), v) => canonicalize(v, inner),
                    (List(inner), Value::Array(items)) => Value::Array(
                        items.into_iter().map(|v| canonicalize(v, inner)).collect(),
                    ),
                    (_, v) => v,
                };
                out.insert((*name).to_string(), val);
            }
            None => {
                out.insert(key, val);
            }
        }
    }
    Value::Object(out)
}

/// Serialize a manifest to pretty-printed camelCase JSON.
pub fn to_json(manifest: &Manifest) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    manifest.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| PressError::invalid_manifest(e.to_string()))
}

/// Parse a manifest, matching field names case-insensitively.
pub fn from_json(text: &str) -> Result<Manifest> {
    from_value(serde_json::from_str(text)?)
}

/// Build a manifest from an already parsed JSON document.
pub fn from_value(raw: Value) -> Result<Manifest> {
    if !raw.is_object() {
        return Err(PressError::invalid_manifest(
            "manifest document must be a JSON object",
        ));
    }
    let manifest = serde_json::from_value(canonicalize(raw, Shape::Manifest))?;
    Ok(manifest)
}

/// Load a manifest from a file.
pub fn load(path: &Path) -> Result<Manifest> {
    debug!("Loading manifest from {}", path.display());
    let text = fs::read_to_string(path)?;
    from_json(&text)
}

/// Write a manifest to a file, creating parent directories as needed.
pub fn save(manifest: &Manifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json(manifest)?)?;
    debug!("Wrote manifest to {}", path.display());
    Ok(())
}

/// Installer class name for a compile: the override when given, else the manifest's.
///
/// Fails when neither supplies a name or the name is not a valid PHP identifier.
pub fn resolve_class_name(manifest: &Manifest, class_override: Option<&str>) -> Result<String> {
    let name = class_override
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| manifest.installer_class.trim());

    if name.is_empty() {
        return Err(PressError::invalid_manifest(
            "manifest has no installer class name and no override was supplied",
        ));
    }
    if !is_valid_php_class_name(name) {
        return Err(PressError::invalid_manifest(format!(
            "installer class name {:?} is not a valid PHP identifier",
            name
        )));
    }
    Ok(name.to_string())
}

/// Findings from [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Problems that make compilation fail.
    pub errors: Vec<String>,
    /// Problems the installer survives but a caller probably wants to know about.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a manifest for problems before compiling it.
pub fn validate(manifest: &Manifest, class_override: Option<&str>) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Err(e) = resolve_class_name(manifest, class_override) {
        report.errors.push(e.to_string());
    }
    if manifest.default_prefix.is_empty() {
        report
            .errors
            .push("manifest default prefix is empty".to_string());
    }

    let mut seen: Vec<String> = Vec::new();
    for table in &manifest.tables {
        if table.name.trim().is_empty() {
            report.errors.push(format!(
                "table {:?} has an empty name",
                table.name_original
            ));
            continue;
        }
        let key = table.name.to_ascii_lowercase();
        if seen.contains(&key) {
            report
                .errors
                .push(format!("table {:?} appears more than once", table.name));
        } else {
            seen.push(key);
        }

        if !table.skip && table.columns.is_empty() {
            report
                .warnings
                .push(format!("table {:?} has no columns", table.name));
        }
        if table.row_limit > 0 && table.seed_data.is_empty() {
            report.warnings.push(format!(
                "table {:?} has rowLimit {} but no seed rows",
                table.name, table.row_limit
            ));
        }
        for row in &table.seed_data {
            for column in row.keys() {
                if !table.columns.iter().any(|c| c.name == *column) {
                    report.warnings.push(format!(
                        "seed data for table {:?} references unknown column {:?}",
                        table.name, column
                    ));
                }
            }
        }
        for fk in &table.foreign_keys {
            if manifest.table(&fk.references.table).is_none() {
                report.warnings.push(format!(
                    "foreign key {:?} on table {:?} references table {:?} which is not in the manifest",
                    fk.name, table.name, fk.references.table
                ));
            }
        }
    }

    for trigger in &manifest.triggers {
        match manifest.table(&trigger.table) {
            None => report.warnings.push(format!(
                "trigger {:?} is attached to table {:?} which is not in the manifest",
                trigger.name, trigger.table
            )),
            Some(t) if t.skip => report.warnings.push(format!(
                "trigger {:?} is attached to skipped table {:?}",
                trigger.name, trigger.table
            )),
            Some(_) => {}
        }
    }

    report.warnings.dedup();
    report
}
