//! Schema Indexer
//!
//! Reads the schema of an SQLite database from its own catalog
//! (`sqlite_master` and the `table_info` / `foreign_key_list` pragmas)
//! and builds a [`SchemaIndex`].

use crate::database::schema::{Column, ForeignKeyReference, SchemaIndex, Table};
use crate::error::Result;
use sqlx::{sqlite::SqlitePool, Row};
use tracing::debug;

/// Index SQLite database schema
pub async fn index_sqlite(pool: &SqlitePool) -> Result<SchemaIndex> {
    let mut schema_index = SchemaIndex::new();

    let tables_query = r#"
        SELECT name, type
        FROM sqlite_master
        WHERE type IN ('table', 'view')
            AND name NOT LIKE 'sqlite_%'
        ORDER BY name
    "#;

    let tables_rows = sqlx::query(tables_query).fetch_all(pool).await?;

    for row in tables_rows {
        let table_name: String = row.try_get("name")?;
        let table_type: String = row.try_get("type")?;

        let mut table = if table_type == "view" {
            Table::new_view(&table_name)
        } else {
            Table::new(&table_name)
        };

        let foreign_keys = foreign_keys(pool, &table_name).await?;

        let columns_query = r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?1)
            ORDER BY cid
        "#;

        let column_rows = sqlx::query(columns_query)
            .bind(&table_name)
            .fetch_all(pool)
            .await?;

        // pk holds the 1-based position within the primary key, 0 otherwise
        let mut pk_positions = Vec::new();
        for col_row in column_rows {
            let name: String = col_row.try_get("name")?;
            let declared_type: String = col_row.try_get("type")?;
            let not_null: i64 = col_row.try_get("notnull")?;
            let pk: i64 = col_row.try_get("pk")?;

            if pk > 0 {
                pk_positions.push((pk, name.clone()));
            }

            let references = foreign_keys
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, reference)| reference.clone());

            table.columns.push(Column {
                name,
                declared_type,
                nullable: not_null == 0 && pk == 0,
                default_value: col_row.try_get("dflt_value")?,
                is_primary_key: pk > 0,
                references,
            });
        }

        pk_positions.sort();
        table.primary_keys = pk_positions.into_iter().map(|(_, name)| name).collect();

        if !table.is_view {
            let count_query = format!("SELECT COUNT(*) FROM {}", quote_identifier(&table_name));
            let (count,): (i64,) = sqlx::query_as(&count_query).fetch_one(pool).await?;
            table.row_count = Some(count);
        }

        debug!(table = %table_name, columns = table.columns.len(), "Indexed table");
        schema_index.add_table(table);
    }

    Ok(schema_index)
}

/// Foreign keys of a table as (local column, reference) pairs
async fn foreign_keys(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<Vec<(String, ForeignKeyReference)>> {
    let fk_query = r#"
        SELECT "from", "table", "to"
        FROM pragma_foreign_key_list(?1)
        ORDER BY id, seq
    "#;

    let rows = sqlx::query(fk_query)
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        let from: String = row.try_get("from")?;
        let table: String = row.try_get("table")?;
        // "to" is NULL when the reference targets the parent's primary key
        let to: Option<String> = row.try_get("to")?;
        let column = match to {
            Some(column) => column,
            None => parent_primary_key(pool, &table).await?,
        };

        keys.push((from, ForeignKeyReference { table, column }));
    }

    Ok(keys)
}

/// First primary-key column of a table, `rowid` when it has none
async fn parent_primary_key(pool: &SqlitePool, table_name: &str) -> Result<String> {
    let column: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk LIMIT 1",
    )
    .bind(table_name)
    .fetch_optional(pool)
    .await?;

    Ok(column.map_or_else(|| "rowid".to_string(), |(name,)| name))
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
