//! Target-table schema model and catalog introspection.
//!
//! A [`SchemaDescriptor`] is loaded once at the start of each run from the
//! database's metadata catalog and never changes afterwards. Row validation
//! consults it instead of inspecting live types, so every run validates against
//! one consistent snapshot of the target table.

use std::{collections::HashSet, fmt};

use log::{debug, info};
use serde::Serialize;

use crate::{error::BatchError, source::QuerySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    Integer,
    Decimal,
    Boolean,
    Temporal,
    Text,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Integer => "integer",
            DeclaredType::Decimal => "decimal",
            DeclaredType::Boolean => "boolean",
            DeclaredType::Temporal => "temporal",
            DeclaredType::Text => "text",
        }
    }

    /// Maps a catalog type name such as `int`, `VARCHAR(50)` or `datetime2(7)`.
    /// Unknown names fall back to [`DeclaredType::Text`], which is never coerced.
    pub fn from_sql_type(raw: &str) -> Self {
        let base = base_type_name(raw);
        match base.as_str() {
            "int" | "bigint" | "smallint" | "tinyint" | "integer" => DeclaredType::Integer,
            "float" | "real" | "double" | "decimal" | "numeric" | "money" | "smallmoney" => {
                DeclaredType::Decimal
            }
            "bit" | "bool" | "boolean" => DeclaredType::Boolean,
            "date" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset"
            | "timestamp" => DeclaredType::Temporal,
            _ => DeclaredType::Text,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn base_type_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = trimmed
        .split_once('(')
        .map(|(head, _)| head)
        .unwrap_or(trimmed);
    base.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Lowercased name; matches normalized upload headers.
    pub name: String,
    /// Spelling reported by the catalog, used when rendering SQL.
    pub source_name: String,
    pub required: bool,
    pub declared_type: DeclaredType,
    /// Catalog type name without size arguments, e.g. `int` or `bit`.
    pub sql_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    table: String,
    columns: Vec<ColumnDescriptor>,
}

impl SchemaDescriptor {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.required)
            .map(|column| column.name.as_str())
            .collect()
    }
}

/// Builds a column descriptor from one catalog row. Kept separate from the
/// query so fixtures can assemble schemas without a database.
pub fn describe_column(name: &str, nullable: bool, sql_type: &str) -> ColumnDescriptor {
    ColumnDescriptor {
        name: name.trim().to_lowercase(),
        source_name: name.trim().to_string(),
        required: !nullable,
        declared_type: DeclaredType::from_sql_type(sql_type),
        sql_type: base_type_name(sql_type),
    }
}

/// Fetches the column list of `table`, dropping skip-listed columns
/// (compared case-insensitively).
pub fn introspect(
    source: &dyn QuerySource,
    table: &str,
    skip_columns: &[String],
) -> Result<SchemaDescriptor, BatchError> {
    let rows = source
        .query(source.catalog_statement(), &[table])
        .map_err(|err| BatchError::schema_unavailable(table, format!("{err:#}")))?;
    if rows.is_empty() {
        return Err(BatchError::schema_unavailable(
            table,
            "the metadata catalog returned no columns",
        ));
    }

    let skip: HashSet<String> = skip_columns
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name = match row.first().and_then(|value| value.as_deref()) {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(BatchError::schema_unavailable(
                    table,
                    "catalog row without a column name",
                ));
            }
        };
        if skip.contains(&name.trim().to_lowercase()) {
            debug!("Skipping internal column '{name}' of '{table}'");
            continue;
        }
        let nullable = row
            .get(1)
            .and_then(|value| value.as_deref())
            .map(|flag| !flag.trim().eq_ignore_ascii_case("no"))
            .unwrap_or(true);
        let sql_type = row.get(2).and_then(|value| value.as_deref()).unwrap_or("");
        columns.push(describe_column(name, nullable, sql_type));
    }

    info!(
        "Loaded schema for '{}': {} column(s), {} required",
        table,
        columns.len(),
        columns.iter().filter(|column| column.required).count()
    );
    Ok(SchemaDescriptor::new(table, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{QueryRow, SqliteSource};
    use anyhow::{Result, anyhow};
    use rusqlite::Connection;

    struct FailingSource;

    impl QuerySource for FailingSource {
        fn query(&self, _statement: &str, _params: &[&str]) -> Result<Vec<QueryRow>> {
            Err(anyhow!("login timeout expired"))
        }
    }

    fn sqlite_with(ddl: &str) -> SqliteSource {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(ddl).expect("ddl");
        SqliteSource::from_connection(conn)
    }

    #[test]
    fn declared_type_strips_size_arguments() {
        assert_eq!(DeclaredType::from_sql_type("VARCHAR(50)"), DeclaredType::Text);
        assert_eq!(DeclaredType::from_sql_type("decimal(18,4)"), DeclaredType::Decimal);
        assert_eq!(DeclaredType::from_sql_type(" BIT "), DeclaredType::Boolean);
        assert_eq!(DeclaredType::from_sql_type("datetime2(7)"), DeclaredType::Temporal);
        assert_eq!(DeclaredType::from_sql_type("smallint"), DeclaredType::Integer);
        assert_eq!(DeclaredType::from_sql_type("uniqueidentifier"), DeclaredType::Text);
    }

    #[test]
    fn introspect_excludes_skip_listed_columns() {
        let source = sqlite_with(
            "CREATE TABLE salesmen (
                SalesmanKey INTEGER NOT NULL,
                id VARCHAR(10) NOT NULL,
                FirstName VARCHAR(30) NOT NULL,
                active BIT,
                LastModifiedUTC DATETIME NOT NULL
            );",
        );
        let skip = vec!["salesmankey".to_string(), "LastModifiedUTC".to_string()];
        let schema = introspect(&source, "salesmen", &skip).expect("schema");

        let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "firstname", "active"]);
        assert_eq!(schema.required_names(), vec!["id", "firstname"]);
        let first = schema.column("firstname").expect("firstname");
        assert_eq!(first.source_name, "FirstName");
        assert_eq!(first.sql_type, "varchar");
        assert_eq!(
            schema.column("active").map(|c| c.declared_type),
            Some(DeclaredType::Boolean)
        );
    }

    #[test]
    fn introspect_unknown_table_is_schema_unavailable() {
        let source = sqlite_with("CREATE TABLE other (x INTEGER);");
        let err = introspect(&source, "salesmen", &[]).expect_err("no columns");
        assert!(matches!(err, BatchError::SchemaUnavailable { ref table, .. } if table == "salesmen"));
    }

    #[test]
    fn introspect_query_failure_is_schema_unavailable() {
        let err = introspect(&FailingSource, "salesmen", &[]).expect_err("failure");
        match err {
            BatchError::SchemaUnavailable { reason, .. } => {
                assert!(reason.contains("login timeout"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
