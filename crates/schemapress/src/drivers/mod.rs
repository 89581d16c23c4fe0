//! Catalog implementations.
//!
//! - [`mysql`]: MySQL/MariaDB over SQLx (feature `mysql`)
//! - [`memory`]: fixed in-memory rows, for tests and offline runs

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

pub use memory::{MemoryCatalog, MemoryTable};
#[cfg(feature = "mysql")]
pub use mysql::MysqlCatalog;
