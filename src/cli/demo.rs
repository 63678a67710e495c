//! Demo mode: a fixed tour of example questions

use crate::agent::QueryAgent;
use crate::cli::commands::ask;
use crate::cli::formatter::Formatter;
use crate::error::AgentError;
use tracing::info;

/// Questions asked in demo mode, in order
pub const DEMO_QUESTIONS: &[&str] = &[
    "How many customers do we have?",
    "Who are the top 3 customers by total spending?",
    "What is the total revenue by product category, excluding cancelled orders?",
    "Which products have an average rating below 3?",
    "Which managers have the most direct reports, and in which department?",
];

/// Ask every demo question and print the results
///
/// Ctrl-C cancels the current question and ends the demo.
pub async fn run_demo(agent: &QueryAgent, formatter: &Formatter) {
    println!("{}", formatter.header("SQL AGENT DEMO"));

    for (i, question) in DEMO_QUESTIONS.iter().enumerate() {
        info!(index = i + 1, question, "Demo question");

        tokio::select! {
            output = ask(agent, formatter, question) => {
                println!("{}", output);
                println!();
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", formatter.error(&AgentError::Cancelled.to_string()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_questions() {
        assert!(DEMO_QUESTIONS.contains(&"How many customers do we have?"));
        assert!(DEMO_QUESTIONS.iter().all(|q| q.ends_with('?')));
    }
}
