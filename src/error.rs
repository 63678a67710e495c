//! Error types for the SQL agent
//!
//! This module defines the error types used throughout the application.
//! Every variant belongs to one [`ErrorKind`], which decides whether the
//! CLI aborts at startup or reports the failure and keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the SQL agent
pub type Result<T> = std::result::Result<T, AgentError>;

/// Coarse grouping of errors, as seen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential, missing database, bad config file
    Configuration,
    /// Network failure, API rejection, unusable completion
    ExternalService,
    /// Generated SQL failed or was refused
    QueryExecution,
    /// Everything else
    Internal,
}

/// Main error type for the SQL agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credential available for the selected provider
    #[error(
        "API key required for {provider}. Either:\n  \
         1. Add it to a .env file: {env_var}=...\n  \
         2. Export it: export {env_var}=...\n  \
         3. Put it under [api_keys] in the config file"
    )]
    MissingApiKey { provider: String, env_var: String },

    /// Database file does not exist
    #[error("Database not found: {}. Run `sql-agent-setup` to create it.", .0.display())]
    DatabaseNotFound(PathBuf),

    /// Refused to overwrite an existing database file
    #[error("Database already exists: {}. Pass --force to recreate it.", .0.display())]
    DatabaseExists(PathBuf),

    /// Database-related errors outside generated-SQL execution
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// LLM API returned an error status or an unreadable body
    #[error("{provider} API error (status {status}): {message}")]
    LLMApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Completion did not follow the expected shape
    #[error("Unparseable response: {reason}\n--- completion ---\n{snippet}")]
    UnparseableResponse { reason: String, snippet: String },

    /// The user interrupted the question
    #[error("Cancelled")]
    Cancelled,

    /// Generated SQL failed when executed
    #[error("Query failed: {message}\nSQL: {sql}")]
    QueryExecution { sql: String, message: String },

    /// Generated SQL is not a read-only query
    #[error("Refused to run {operation} statement: {reason}\nSQL: {sql}")]
    UnsafeStatement {
        operation: String,
        reason: String,
        sql: String,
    },

    /// Command parsing errors
    #[error("Command parsing error: {0}")]
    CommandParse(String),

    /// Broken internal assumption
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Which group this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Config(_)
            | AgentError::MissingApiKey { .. }
            | AgentError::DatabaseNotFound(_)
            | AgentError::DatabaseExists(_) => ErrorKind::Configuration,
            AgentError::Http(_)
            | AgentError::LLMApiError { .. }
            | AgentError::UnparseableResponse { .. }
            | AgentError::Cancelled => ErrorKind::ExternalService,
            AgentError::QueryExecution { .. } | AgentError::UnsafeStatement { .. } => {
                ErrorKind::QueryExecution
            }
            AgentError::Database(_)
            | AgentError::Io(_)
            | AgentError::CommandParse(_)
            | AgentError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The SQL text attached to this error, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            AgentError::QueryExecution { sql, .. } | AgentError::UnsafeStatement { sql, .. } => {
                Some(sql)
            }
            _ => None,
        }
    }

    /// Build an API error for a provider
    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        AgentError::LLMApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AgentError::Config("bad".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            AgentError::api("Anthropic", 401, "invalid x-api-key").kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            AgentError::QueryExecution {
                sql: "SELECT nope FROM orders".to_string(),
                message: "no such column: nope".to_string(),
            }
            .kind(),
            ErrorKind::QueryExecution
        );
    }

    #[test]
    fn test_query_error_carries_sql() {
        let err = AgentError::QueryExecution {
            sql: "SELECT nope FROM orders".to_string(),
            message: "no such column: nope".to_string(),
        };
        assert_eq!(err.sql(), Some("SELECT nope FROM orders"));
        assert!(err.to_string().contains("no such column"));
        assert!(AgentError::Cancelled.sql().is_none());
    }

    #[test]
    fn test_missing_key_message_names_variable() {
        let err = AgentError::MissingApiKey {
            provider: "anthropic".to_string(),
            env_var: "ANTHROPIC_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }
}
