//! MySQL/MariaDB catalog reader.
//!
//! Implements [`CatalogReader`] over a SQLx pool. `information_schema`
//! queries are prepared and bound like any other query. `SHOW` statements and
//! the seed row `SELECT` run over the text protocol (`sqlx::raw_sql`), so every
//! value arrives as text and is decoded without type checks.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column as _, ColumnIndex, Row, TypeInfo};
use tracing::{debug, info, warn};

use crate::config::{IntrospectionConfig, SourceConfig};
use crate::core::identifier::quote_mysql;
use crate::core::{
    CatalogReader, ColumnRow, ConstraintRow, ForeignKeyRow, IndexRow, RelationKind, RelationRow,
    SeedRow, SeedValue, TriggerRow,
};
use crate::error::{PressError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB catalog reader.
pub struct MysqlCatalog {
    pool: MySqlPool,
    database: String,
    query_timeout: Duration,
}

fn ssl_mode(mode: &str) -> MySqlSslMode {
    match mode.to_lowercase().as_str() {
        "disable" | "disabled" => {
            warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
            MySqlSslMode::Disabled
        }
        "required" => MySqlSslMode::Required,
        "verify_ca" => MySqlSslMode::VerifyCa,
        "verify_identity" => MySqlSslMode::VerifyIdentity,
        _ => MySqlSslMode::Preferred,
    }
}

/// Map a driver error to the connectivity or introspection category.
fn classify(e: sqlx::Error, operation: &str) -> PressError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PressError::connectivity(e, operation),
        other => PressError::introspection(operation, other),
    }
}

/// Column value as text, lossily decoded; `None` for SQL NULL.
fn text<I: ColumnIndex<MySqlRow>>(row: &MySqlRow, index: I) -> Option<String> {
    row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

fn text_or_empty<I: ColumnIndex<MySqlRow>>(row: &MySqlRow, index: I) -> String {
    text(row, index).unwrap_or_default()
}

impl MysqlCatalog {
    /// Connect to the source database.
    pub async fn connect(config: &SourceConfig, introspection: &IntrospectionConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode(&config.ssl_mode));

        let pool = MySqlPoolOptions::new()
            .max_connections(introspection.max_connections)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| PressError::connectivity(e, "creating MySQL source pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| PressError::connectivity(e, "testing MySQL source connection"))?;

        info!("Connected to MySQL source: {}", config.display_url());

        Ok(Self {
            pool,
            database: config.database.clone(),
            query_timeout: introspection.query_timeout(),
        })
    }

    /// Run a query future under the configured timeout.
    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(e, operation)),
            Err(_) => Err(PressError::Timeout {
                operation: operation.to_string(),
                seconds: self.query_timeout.as_secs(),
            }),
        }
    }

    /// Text-protocol statement.
    async fn raw(&self, sql: &str, operation: &str) -> Result<Vec<MySqlRow>> {
        debug!("{}: {}", operation, sql);
        self.timed(operation, sqlx::raw_sql(sql).fetch_all(&self.pool))
            .await
    }
}

#[async_trait]
impl CatalogReader for MysqlCatalog {
    async fn database_name(&self) -> Result<String> {
        let rows = self.raw("SELECT DATABASE()", "reading current database").await?;
        Ok(rows
            .first()
            .and_then(|row| text(row, 0))
            .unwrap_or_else(|| self.database.clone()))
    }

    async fn list_relations(&self, kind: RelationKind) -> Result<Vec<RelationRow>> {
        // CAST to CHAR to handle collation differences
        let query = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(TABLE_COMMENT AS CHAR(2048)) AS TABLE_COMMENT
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = ?
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = self
            .timed(
                "listing tables",
                sqlx::query(query)
                    .bind(kind.table_type())
                    .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| RelationRow {
                name: text_or_empty(row, "TABLE_NAME"),
                comment: text(row, "TABLE_COMMENT"),
            })
            .collect())
    }

    async fn show_columns(&self, table: &str) -> Result<Vec<ColumnRow>> {
        let sql = format!("SHOW FULL COLUMNS FROM {}", quote_mysql(table)?);
        let rows = self.raw(&sql, "loading columns").await?;
        Ok(rows
            .iter()
            .map(|row| ColumnRow {
                field: text_or_empty(row, "Field"),
                column_type: text_or_empty(row, "Type"),
                null: text_or_empty(row, "Null"),
                key: text_or_empty(row, "Key"),
                default: text(row, "Default"),
                extra: text_or_empty(row, "Extra"),
                comment: text(row, "Comment"),
            })
            .collect())
    }

    async fn show_index(&self, table: &str) -> Result<Vec<IndexRow>> {
        let sql = format!("SHOW INDEX FROM {}", quote_mysql(table)?);
        let rows = self.raw(&sql, "loading indexes").await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                // Functional index parts have no column name
                let column_name = text(row, "Column_name")?;
                Some(IndexRow {
                    key_name: text_or_empty(row, "Key_name"),
                    column_name,
                    non_unique: text(row, "Non_unique").as_deref() != Some("0"),
                })
            })
            .collect())
    }

    async fn table_constraints(&self, table: &str) -> Result<Vec<ConstraintRow>> {
        let query = r#"
            SELECT
                CAST(tc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(tc.CONSTRAINT_TYPE AS CHAR(64)) AS CONSTRAINT_TYPE,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            LEFT JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            WHERE tc.TABLE_SCHEMA = DATABASE() AND tc.TABLE_NAME = ?
            ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = self
            .timed(
                "loading constraints",
                sqlx::query(query).bind(table).fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ConstraintRow {
                name: text_or_empty(row, "CONSTRAINT_NAME"),
                constraint_type: text_or_empty(row, "CONSTRAINT_TYPE"),
                column: text(row, "COLUMN_NAME"),
            })
            .collect())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        // CAST to CHAR to handle collation differences
        let query = r#"
            SELECT
                CAST(rc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR(64)) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR(64)) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND rc.TABLE_NAME = kcu.TABLE_NAME
            WHERE rc.CONSTRAINT_SCHEMA = DATABASE() AND rc.TABLE_NAME = ?
            ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = self
            .timed(
                "loading foreign keys",
                sqlx::query(query).bind(table).fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| ForeignKeyRow {
                name: text_or_empty(row, "CONSTRAINT_NAME"),
                column: text_or_empty(row, "COLUMN_NAME"),
                referenced_table: text_or_empty(row, "REFERENCED_TABLE_NAME"),
                referenced_column: text_or_empty(row, "REFERENCED_COLUMN_NAME"),
                update_rule: text(row, "UPDATE_RULE"),
                delete_rule: text(row, "DELETE_RULE"),
            })
            .collect())
    }

    async fn select_rows(&self, table: &str, limit: i64) -> Result<Vec<SeedRow>> {
        let mut sql = format!("SELECT * FROM {}", quote_mysql(table)?);
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let rows = self.raw(&sql, "reading seed rows").await?;

        Ok(rows
            .iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| {
                        let value = SeedValue::from_catalog_text(
                            column.type_info().name(),
                            text(row, column.ordinal()),
                        );
                        (column.name().to_string(), value)
                    })
                    .collect()
            })
            .collect())
    }

    async fn show_create_view(&self, view: &str) -> Result<String> {
        let sql = format!("SHOW CREATE VIEW {}", quote_mysql(view)?);
        let rows = self.raw(&sql, "reading view definition").await?;
        rows.first()
            .and_then(|row| text(row, "Create View"))
            .ok_or_else(|| PressError::introspection(view, "SHOW CREATE VIEW returned no definition"))
    }

    async fn list_procedures(&self) -> Result<Vec<String>> {
        let rows = self
            .raw("SHOW PROCEDURE STATUS WHERE Db = DATABASE()", "listing procedures")
            .await?;
        Ok(rows.iter().filter_map(|row| text(row, "Name")).collect())
    }

    async fn show_create_procedure(&self, name: &str) -> Result<String> {
        let sql = format!("SHOW CREATE PROCEDURE {}", quote_mysql(name)?);
        let rows = self.raw(&sql, "reading procedure definition").await?;
        // NULL when the account lacks privileges on the routine body
        Ok(rows
            .first()
            .and_then(|row| text(row, "Create Procedure"))
            .unwrap_or_default())
    }

    async fn show_triggers(&self) -> Result<Vec<TriggerRow>> {
        let rows = self.raw("SHOW TRIGGERS", "listing triggers").await?;
        Ok(rows
            .iter()
            .map(|row| TriggerRow {
                name: text_or_empty(row, "Trigger"),
                event: text_or_empty(row, "Event"),
                table: text_or_empty(row, "Table"),
                statement: text_or_empty(row, "Statement"),
                timing: text_or_empty(row, "Timing"),
            })
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
