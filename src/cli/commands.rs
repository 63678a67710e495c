//! Command handlers for CLI
//!
//! This module parses REPL input into meta-commands and questions and
//! renders the output for each. Meta-commands never reach the LLM.

use crate::agent::QueryAgent;
use crate::cli::formatter::Formatter;
use crate::error::{AgentError, Result};

/// Meta-command names offered for completion
pub const COMMAND_NAMES: &[&str] = &["schema", "tags", "help", "quit", "exit"];

/// Command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// Show the indexed schema
    Schema,
    /// Show the column tags
    Tags,
    /// Show commands and example questions
    Help,
    /// Exit the application
    Quit,
    /// Natural language question
    Query { text: String },
}

/// Parsed command
#[derive(Debug, Clone)]
pub struct Command {
    /// The type of command
    pub command_type: CommandType,
}

impl Command {
    /// Parse a command from user input
    ///
    /// Meta-commands are case-insensitive and may carry a leading `/`.
    /// Anything else is a question.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AgentError::CommandParse("empty input".to_string()));
        }

        let word = input.strip_prefix('/').unwrap_or(input).to_lowercase();
        let command_type = match word.as_str() {
            "schema" => CommandType::Schema,
            "tags" => CommandType::Tags,
            "help" => CommandType::Help,
            "quit" | "exit" => CommandType::Quit,
            _ if input.starts_with('/') => {
                return Err(AgentError::CommandParse(format!(
                    "unknown command: {}. Type help for the list of commands.",
                    input
                )));
            }
            _ => CommandType::Query {
                text: input.to_string(),
            },
        };

        Ok(Command { command_type })
    }
}

/// Run a question through the agent and render the outcome
///
/// Failures are rendered too; one bad question never ends the session.
pub async fn ask(agent: &QueryAgent, formatter: &Formatter, question: &str) -> String {
    match agent.answer(question).await {
        Ok(response) => formatter.render_response(
            &response,
            agent.provider().provider_name(),
            &agent.context().database.location().to_string(),
        ),
        Err(e) => formatter.render_failure(question, &e),
    }
}

/// Handle a command and return the text to print
pub async fn handle_command(command: &Command, agent: &QueryAgent, formatter: &Formatter) -> String {
    match &command.command_type {
        CommandType::Schema => format!(
            "{}\n{}",
            formatter.header("DATABASE SCHEMA"),
            formatter.schema(&agent.context().schema)
        ),
        CommandType::Tags => format!(
            "{}\n{}",
            formatter.header("COLUMN TAGS"),
            formatter.tags(&agent.context().tags)
        ),
        CommandType::Help => format!("{}\n{}", formatter.header("HELP"), help_text()),
        CommandType::Quit => "Goodbye!".to_string(),
        CommandType::Query { text } => ask(agent, formatter, text).await,
    }
}

/// Commands and example questions
pub fn help_text() -> String {
    r#"
Commands (case-insensitive, a leading / is optional):
  schema             Show tables, columns and keys
  tags               Show the column tags given to the model
  help               Show this help message
  quit, exit         Leave the session (Ctrl-D works too)

Anything else is a question. Ctrl-C cancels a question in flight.

Example questions:
  Basic
    How many customers do we have?
    What products are in the Electronics category?
    Show me all pending orders
  Aggregations
    What is the average product price?
    How many orders does each customer have?
    What's the total revenue by category?
  Joins
    Which customers have written reviews?
    Show order details with customer and product names
  Harder
    Who are the top 3 customers by total spending?
    What products have never been ordered?
    What's the average order value per membership tier?
"#
    .to_string()
}

/// Format an error for display
pub fn format_error(error: &AgentError) -> String {
    format!("Error: {}", error)
}
