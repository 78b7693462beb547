//! Read-only query access to the target database.
//!
//! The validation core only needs to run a handful of `SELECT` statements: one
//! against the metadata catalog and one per reference set. [`QuerySource`] is
//! that seam. Every cell comes back as `Option<String>` so callers never depend
//! on driver-specific value types.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, params_from_iter, types::ValueRef};

/// One result row; `None` marks SQL `NULL`.
pub type QueryRow = Vec<Option<String>>;

/// Catalog statement for engines exposing `INFORMATION_SCHEMA` (SQL Server,
/// PostgreSQL, MySQL). Returns `(column name, IS_NULLABLE, declared type)`.
pub const INFORMATION_SCHEMA_COLUMNS: &str = "SELECT COLUMN_NAME, IS_NULLABLE, DATA_TYPE \
     FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = ? ORDER BY ORDINAL_POSITION";

/// SQLite has no `INFORMATION_SCHEMA`; the table-valued pragma yields the same shape.
pub const SQLITE_TABLE_INFO: &str = "SELECT name, CASE WHEN \"notnull\" = 1 THEN 'NO' ELSE 'YES' END, type \
     FROM pragma_table_info(?1) ORDER BY cid";

pub trait QuerySource {
    /// Runs `statement` with positional string parameters and returns all rows.
    fn query(&self, statement: &str, params: &[&str]) -> Result<Vec<QueryRow>>;

    /// Statement used by the schema introspector. It takes the table name as
    /// its only parameter and yields `(name, is_nullable, declared_type)`.
    fn catalog_statement(&self) -> &str {
        INFORMATION_SCHEMA_COLUMNS
    }
}

pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Opening SQLite database {path:?}"))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl QuerySource for SqliteSource {
    fn query(&self, statement: &str, params: &[&str]) -> Result<Vec<QueryRow>> {
        let mut stmt = self
            .conn
            .prepare(statement)
            .with_context(|| format!("Preparing statement: {statement}"))?;
        let column_count = stmt.column_count();
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..column_count)
                    .map(|idx| row.get_ref(idx).map(render_value))
                    .collect::<rusqlite::Result<QueryRow>>()
            })
            .with_context(|| format!("Executing statement: {statement}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Reading query results")
    }

    fn catalog_statement(&self) -> &str {
        SQLITE_TABLE_INFO
    }
}

fn render_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_source() -> SqliteSource {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(
            "CREATE TABLE salesmen (SalesmanKey INTEGER PRIMARY KEY, id VARCHAR(10) NOT NULL, active BIT);
             INSERT INTO salesmen (id, active) VALUES ('S01', 1), ('S02', NULL);",
        )
        .expect("seed");
        SqliteSource::from_connection(conn)
    }

    #[test]
    fn query_renders_nulls_and_numbers() {
        let source = memory_source();
        let rows = source
            .query("SELECT id, active FROM salesmen ORDER BY id", &[])
            .expect("query");
        assert_eq!(
            rows,
            vec![
                vec![Some("S01".to_string()), Some("1".to_string())],
                vec![Some("S02".to_string()), None],
            ]
        );
    }

    #[test]
    fn catalog_statement_reports_nullability() {
        let source = memory_source();
        let rows = source
            .query(source.catalog_statement(), &["salesmen"])
            .expect("catalog");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0].as_deref(), Some("id"));
        assert_eq!(rows[1][1].as_deref(), Some("NO"));
        assert_eq!(rows[1][2].as_deref(), Some("VARCHAR(10)"));
        assert_eq!(rows[2][1].as_deref(), Some("YES"));
    }

    #[test]
    fn query_with_parameters_filters_rows() {
        let source = memory_source();
        let rows = source
            .query("SELECT id FROM salesmen WHERE id = ?1", &["S02"])
            .expect("query");
        assert_eq!(rows, vec![vec![Some("S02".to_string())]]);
    }
}
