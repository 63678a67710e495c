//! Read-only guard for generated SQL
//!
//! Generated statements are parsed with `sqlparser` before they reach the
//! database. Only a single query (or an `EXPLAIN` of one) is let through.

use crate::error::{AgentError, Result};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Leading keywords that name the operation with their object kind
const TWO_WORD_OPERATIONS: &[&str] = &["CREATE", "DROP", "ALTER"];

/// Reject anything that is not a single read-only query
///
/// Text that `sqlparser` cannot parse is let through; the connection is
/// opened read-only and SQLite has the final say.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!(error = %e, "SQL not understood by parser, deferring to SQLite");
            return Ok(());
        }
    };

    match statements.as_slice() {
        [] => Err(refuse("EMPTY", "no statement found", sql)),
        [statement] => check_statement(statement, sql),
        _ => Err(refuse(
            "MULTIPLE",
            &format!("expected one statement, found {}", statements.len()),
            sql,
        )),
    }
}

fn check_statement(statement: &Statement, sql: &str) -> Result<()> {
    match statement {
        Statement::Query(query) => match non_read_part(query) {
            Some(part) => Err(refuse(
                &operation_name(&part.to_string()),
                "data-modifying statement inside a query",
                sql,
            )),
            None => {
                debug!("read-only query accepted");
                Ok(())
            }
        },
        Statement::Explain { statement, .. } => check_statement(statement, sql),
        other => Err(refuse(
            &operation_name(&other.to_string()),
            "only SELECT queries are allowed",
            sql,
        )),
    }
}

/// First part of a query, CTEs included, that is not a plain read
///
/// Only `SELECT`, `VALUES` and `TABLE` bodies count as reads; a body such
/// as `WITH x AS (..) DELETE ..` is returned.
fn non_read_part(query: &Query) -> Option<&SetExpr> {
    let in_ctes = query
        .with
        .iter()
        .flat_map(|with| with.cte_tables.iter())
        .find_map(|cte| non_read_part(&cte.query));

    in_ctes.or_else(|| non_read_body(&query.body))
}

fn non_read_body(body: &SetExpr) -> Option<&SetExpr> {
    match body {
        SetExpr::Select(_) | SetExpr::Values(_) | SetExpr::Table(_) => None,
        SetExpr::Query(query) => non_read_part(query),
        SetExpr::SetOperation { left, right, .. } => {
            non_read_body(left).or_else(|| non_read_body(right))
        }
        other => Some(other),
    }
}

/// Name a statement by its leading keyword(s), e.g. `DELETE` or `DROP TABLE`
fn operation_name(text: &str) -> String {
    let mut words = text.split_whitespace().map(|w| w.to_uppercase());

    match words.next() {
        Some(first) if TWO_WORD_OPERATIONS.contains(&first.as_str()) => match words.next() {
            Some(second) => format!("{} {}", first, second),
            None => first,
        },
        Some(first) => first,
        None => "UNKNOWN".to_string(),
    }
}

fn refuse(operation: &str, reason: &str, sql: &str) -> AgentError {
    debug!(operation, reason, "statement refused");
    AgentError::UnsafeStatement {
        operation: operation.to_string(),
        reason: reason.to_string(),
        sql: sql.to_string(),
    }
}
