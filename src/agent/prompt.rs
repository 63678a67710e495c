//! Prompt construction
//!
//! The system message carries the fixed instructions, the schema and the
//! column tags; the user message is the question on its own.

use crate::database::{format_tags_for_prompt, ColumnTag, SchemaIndex};
use crate::llm::Message;

const INSTRUCTIONS: &str = "\
You are a SQL expert. Translate the user's question into one SQLite query \
against the database described below.

Answer in this order:
1. Reasoning: say which column tags apply to the question and how they shape \
the query (for example which status values to exclude or which column holds \
the amount to sum).
2. Set theory: explain the query in relational terms. Filters are selections \
(σ), chosen columns are projections (π), joins are intersections of related \
sets, GROUP BY partitions a set into subsets and aggregates summarise each \
subset.
3. The query: exactly one SQLite statement inside a single ```sql fenced \
block. Do not write any other code block.

Rules:
- Only use tables and columns from the schema.
- Use table aliases in joins.
- Return what was asked for and nothing more.
- State any assumption about an ambiguous question in the reasoning.";

/// Build the messages for one question
pub fn build_prompt(schema: &SchemaIndex, tags: &[ColumnTag], question: &str) -> Vec<Message> {
    let mut system = String::from(INSTRUCTIONS);
    system.push_str("\n\n");
    system.push_str(&schema.format_for_llm());

    if !tags.is_empty() {
        system.push('\n');
        system.push_str(&format_tags_for_prompt(tags));
        system.push('\n');
    }

    vec![
        Message::system(system),
        Message::user(format!("QUESTION: {}", question.trim())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Column, Table};
    use crate::llm::MessageRole;

    fn schema() -> SchemaIndex {
        let mut table = Table::new("orders");
        table.add_column(Column {
            is_primary_key: true,
            ..Column::new("id", "INTEGER")
        });
        table.add_column(Column::new("status", "TEXT"));

        let mut schema = SchemaIndex::new();
        schema.add_table(table);
        schema
    }

    fn status_tag() -> ColumnTag {
        ColumnTag {
            table_name: "orders".to_string(),
            column_name: "status".to_string(),
            tag: "order_lifecycle".to_string(),
            description: Some("Current order state".to_string()),
            examples: Some("pending, shipped, cancelled".to_string()),
            use_for: Some("exclude cancelled orders from revenue".to_string()),
        }
    }

    #[test]
    fn test_prompt_contains_schema_tags_and_question() {
        let messages = build_prompt(&schema(), &[status_tag()], "How many orders shipped?");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        let system = &messages[0].content;
        assert!(system.contains("TABLE: orders"));
        assert!(system.contains("status: TEXT"));
        assert!(system.contains("tag: order_lifecycle"));
        assert!(system.contains("```sql"));
        assert!(system.contains("σ"));

        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "QUESTION: How many orders shipped?");
    }

    #[test]
    fn test_prompt_without_tags() {
        let messages = build_prompt(&schema(), &[], "  List orders  ");
        assert!(!messages[0].content.contains("COLUMN TAGS"));
        assert_eq!(messages[1].content, "QUESTION: List orders");
    }
}
