//! Core abstractions shared by introspection and emission.
//!
//! - [`schema`]: manifest entities (tables, views, procedures, triggers)
//! - [`value`]: seed row values
//! - [`catalog`]: raw catalog rows
//! - [`traits`]: the [`CatalogReader`] capability
//! - [`identifier`]: identifier quoting and naming rules
//!
//! The introspector is written against [`CatalogReader`] only, so it can be
//! tested with in-memory catalogs and the MySQL driver stays a leaf module.

pub mod catalog;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use catalog::{
    ColumnRow, ConstraintRow, ForeignKeyRow, IndexRow, RelationKind, RelationRow, TriggerRow,
};
pub use schema::{
    Column, Constraint, ForeignKey, ForeignKeyReference, Index, Manifest, Parameter,
    ParameterMode, StoredProcedure, Table, Trigger, TriggerEvent, TriggerTiming, View,
    DEFAULT_INSTALLER_CLASS, DEFAULT_PREFIX,
};
pub use traits::CatalogReader;
pub use value::{SeedRow, SeedValue};
