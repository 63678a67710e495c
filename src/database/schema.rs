//! Schema data structures
//!
//! This module defines the data structures describing the database schema
//! (tables, columns and foreign keys) and the text rendering of that schema
//! used in prompts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Represents a column in a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type as written in the CREATE statement (may be empty)
    pub declared_type: String,
    /// Whether the column is nullable
    pub nullable: bool,
    /// Default value expression (if any)
    pub default_value: Option<String>,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Referenced table/column (if this is a foreign key)
    pub references: Option<ForeignKeyReference>,
}

impl Column {
    /// Create a nullable, unconstrained column
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
            references: None,
        }
    }

    /// Declared type, or `ANY` for untyped columns
    pub fn type_name(&self) -> &str {
        if self.declared_type.is_empty() {
            "ANY"
        } else {
            &self.declared_type
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name())?;

        if self.is_primary_key {
            write!(f, " [PK]")?;
        }
        if let Some(ref fk) = self.references {
            write!(f, " -> {}.{}", fk.table, fk.column)?;
        }

        Ok(())
    }
}

/// Foreign key reference information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Referenced table name
    pub table: String,
    /// Referenced column name
    pub column: String,
}

/// Represents a database table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table or view name
    pub name: String,
    /// Whether this is a view (vs a table)
    pub is_view: bool,
    /// Table columns, in declaration order
    pub columns: Vec<Column>,
    /// Primary key columns (ordered)
    pub primary_keys: Vec<String>,
    /// Row count at indexing time
    pub row_count: Option<i64>,
}

impl Table {
    /// Create a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_view: false,
            columns: Vec::new(),
            primary_keys: Vec::new(),
            row_count: None,
        }
    }

    /// Create a new view
    pub fn new_view(name: impl Into<String>) -> Self {
        let mut table = Self::new(name);
        table.is_view = true;
        table
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        if column.is_primary_key {
            self.primary_keys.push(column.name.clone());
        }
        self.columns.push(column);
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Format table schema for the prompt
    pub fn format_schema(&self) -> String {
        let prefix = if self.is_view { "VIEW" } else { "TABLE" };
        let mut result = format!("{}: {}\n", prefix, self.name);

        result.push_str("Columns:\n");
        for column in &self.columns {
            result.push_str(&format!("  - {}\n", column));
        }

        result
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_schema())
    }
}

/// Represents a foreign-key relationship between two tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRelationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl fmt::Display for TableRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

/// Complete database schema index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaIndex {
    /// Tables and views indexed by name
    pub tables: BTreeMap<String, Table>,
    /// Foreign-key relationships between tables
    pub relationships: Vec<TableRelationship>,
}

impl SchemaIndex {
    /// Create a new schema index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the index
    pub fn add_table(&mut self, table: Table) {
        for column in &table.columns {
            if let Some(ref fk) = column.references {
                self.relationships.push(TableRelationship {
                    from_table: table.name.clone(),
                    from_column: column.name.clone(),
                    to_table: fk.table.clone(),
                    to_column: fk.column.clone(),
                });
            }
        }
        self.tables.insert(table.name.clone(), table);
    }

    /// Remove a table (and the relationships touching it)
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.relationships
            .retain(|rel| rel.from_table != name && rel.to_table != name);
        self.tables.remove(name)
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Get all table names
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Format the entire schema for LLM context
    pub fn format_for_llm(&self) -> String {
        let mut result = String::from("DATABASE SCHEMA:\n");

        for table in self.tables.values() {
            result.push('\n');
            result.push_str(&table.format_schema());
        }

        if !self.relationships.is_empty() {
            result.push_str("\nRelationships:\n");
            for rel in &self.relationships {
                result.push_str(&format!("  {}\n", rel));
            }
        }

        result
    }
}

impl fmt::Display for SchemaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_for_llm())
    }
}
