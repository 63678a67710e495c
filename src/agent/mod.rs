//! Natural-language query agent
//!
//! Turns a question into SQL through the configured LLM provider, checks
//! the statement, runs it and hands back everything the formatter shows.

pub mod guard;
pub mod parser;
pub mod prompt;

use crate::database::tags::TAGS_TABLE;
use crate::database::{index_sqlite, load_tags, ColumnTag, Database, QueryResult, SchemaIndex};
use crate::error::Result;
use crate::llm::{GenerationParams, LLMProvider};
use serde::Serialize;
use tracing::{debug, info};

pub use guard::ensure_read_only;
pub use parser::{parse_completion, ParsedCompletion};
pub use prompt::build_prompt;

/// Everything loaded once at startup: the database, its schema and its tags
#[derive(Debug)]
pub struct AgentContext {
    pub database: Database,
    pub schema: SchemaIndex,
    pub tags: Vec<ColumnTag>,
}

impl AgentContext {
    /// Index the schema and read the column tags
    ///
    /// The tags table itself is metadata and is left out of the schema.
    pub async fn load(database: Database) -> Result<Self> {
        let mut schema = index_sqlite(database.pool()).await?;
        schema.remove_table(TAGS_TABLE);
        let tags = load_tags(database.pool()).await?;

        info!(
            location = %database.location(),
            tables = schema.tables.len(),
            tags = tags.len(),
            "Agent context loaded"
        );

        Ok(Self {
            database,
            schema,
            tags,
        })
    }
}

/// Outcome of one answered question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub sql: String,
    pub explanation: String,
    pub result: QueryResult,
    /// Model reported by the API
    pub model: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// Answers questions against one database with one provider
pub struct QueryAgent {
    provider: Box<dyn LLMProvider>,
    context: AgentContext,
    params: GenerationParams,
    allow_writes: bool,
}

impl QueryAgent {
    pub fn new(
        provider: Box<dyn LLMProvider>,
        context: AgentContext,
        params: GenerationParams,
    ) -> Self {
        Self {
            provider,
            context,
            params,
            allow_writes: false,
        }
    }

    /// Skip the read-only guard
    pub fn with_allow_writes(mut self, allow_writes: bool) -> Self {
        self.allow_writes = allow_writes;
        self
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub fn provider(&self) -> &dyn LLMProvider {
        self.provider.as_ref()
    }

    /// Translate a question to SQL, run it and collect the result
    pub async fn answer(&self, question: &str) -> Result<QueryResponse> {
        let messages = build_prompt(&self.context.schema, &self.context.tags, question);
        debug!(
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            provider = self.provider.provider_name(),
            model = self.provider.model(),
            "Requesting completion"
        );

        let response = self.provider.generate(&messages, &self.params).await?;
        info!(
            model = ?response.model,
            input_tokens = ?response.input_tokens,
            output_tokens = ?response.output_tokens,
            "Completion received"
        );

        let parsed = parse_completion(&response.content, response.hit_token_limit())?;
        let result = self.execute(&parsed.sql).await?;

        Ok(QueryResponse {
            question: question.trim().to_string(),
            sql: parsed.sql,
            explanation: parsed.explanation,
            result,
            model: response.model,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        })
    }

    /// Run a statement through the guard and the connection
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if !self.allow_writes {
            ensure_read_only(sql)?;
        }
        self.context.database.run_query(sql).await
    }

    /// Release the database
    pub async fn shutdown(self) {
        self.context.database.close().await;
    }
}
