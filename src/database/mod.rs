//! Database module
//!
//! This module provides the SQLite connection, schema indexing,
//! column tags and the sample database bootstrapper.

pub mod bootstrap;
pub mod connection;
pub mod indexer;
pub mod schema;
pub mod tags;

// Re-exports
pub use bootstrap::{bootstrap, bootstrap_pool, BootstrapOptions, BootstrapReport};
pub use connection::{Database, DatabaseLocation, QueryResult};
pub use indexer::index_sqlite;
pub use schema::{Column, ForeignKeyReference, SchemaIndex, Table, TableRelationship};
pub use tags::{format_tags_for_prompt, install_tags, load_tags, ColumnTag};
