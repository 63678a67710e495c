//! Completion parsing
//!
//! The model answers with prose around one fenced code block. The first
//! fenced block is the SQL; everything outside it is the explanation.

use crate::error::{AgentError, Result};

const FENCE: &str = "```";

/// Characters of the completion kept in a parse error
const SNIPPET_CHARS: usize = 300;

/// Words that open a statement, so they are never read as a language tag
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "EXPLAIN", "INSERT", "UPDATE", "DELETE", "CREATE", "DROP",
    "ALTER", "PRAGMA", "REPLACE",
];

/// SQL and explanation pulled out of a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCompletion {
    pub sql: String,
    pub explanation: String,
}

/// Split a completion into its SQL block and explanation
///
/// `hit_token_limit` is the provider's report that generation was cut off;
/// it is only used to make the error more helpful.
pub fn parse_completion(text: &str, hit_token_limit: bool) -> Result<ParsedCompletion> {
    let open = text
        .find(FENCE)
        .ok_or_else(|| unparseable("no fenced code block found", text, hit_token_limit))?;

    let after_open = &text[open + FENCE.len()..];
    let close = after_open
        .find(FENCE)
        .ok_or_else(|| unparseable("code block is not terminated", text, hit_token_limit))?;

    let sql = strip_language_tag(&after_open[..close]).trim();
    if sql.is_empty() {
        return Err(unparseable("code block is empty", text, hit_token_limit));
    }

    let before = text[..open].trim();
    let after = after_open[close + FENCE.len()..].trim();
    let explanation = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{}\n\n{}", before, after),
        (false, true) => before.to_string(),
        (true, _) => after.to_string(),
    };

    Ok(ParsedCompletion {
        sql: sql.to_string(),
        explanation,
    })
}

/// Drop the info string after an opening fence (```sql, ```sqlite)
///
/// On a one-line block the tag is the first word, when more text follows.
fn strip_language_tag(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, rest)) if is_language_tag(first.trim()) => rest,
        Some(_) => block,
        None => match block.trim_start().split_once(char::is_whitespace) {
            Some((word, rest)) if !word.is_empty() && is_language_tag(word) => rest,
            _ => block,
        },
    }
}

fn is_language_tag(word: &str) -> bool {
    if word.is_empty() {
        return true;
    }
    let is_word = word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'));
    is_word
        && !STATEMENT_KEYWORDS
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(word))
}

fn unparseable(reason: &str, text: &str, hit_token_limit: bool) -> AgentError {
    let reason = if hit_token_limit {
        format!(
            "{} (the completion stopped at the token limit; raise max_tokens)",
            reason
        )
    } else {
        reason.to_string()
    };

    let snippet = if text.trim().is_empty() {
        "(empty completion)".to_string()
    } else {
        let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
        if text.chars().count() > SNIPPET_CHARS {
            snippet.push_str("...");
        }
        snippet
    };

    AgentError::UnparseableResponse { reason, snippet }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_sql_and_explanation() {
        let completion = "Tags used: orders.status (exclude cancelled).\n\n\
                          ```sql\nSELECT COUNT(*) FROM orders WHERE status != 'cancelled';\n```\n\n\
                          σ(status ≠ 'cancelled')(orders), then count the set.";

        let parsed = parse_completion(completion, false).unwrap();
        assert_eq!(
            parsed.sql,
            "SELECT COUNT(*) FROM orders WHERE status != 'cancelled';"
        );
        assert_eq!(
            parsed.explanation,
            "Tags used: orders.status (exclude cancelled).\n\n\
             σ(status ≠ 'cancelled')(orders), then count the set."
        );
    }

    #[test]
    fn test_fence_without_language_tag() {
        let parsed = parse_completion("```\nSELECT 1\n```", false).unwrap();
        assert_eq!(parsed.sql, "SELECT 1");
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn test_statement_on_fence_line_is_kept() {
        let parsed = parse_completion("```SELECT\n  name\nFROM customers\n```", false).unwrap();
        assert_eq!(parsed.sql, "SELECT\n  name\nFROM customers");

        let parsed = parse_completion("Inline: ```SELECT 1```", false).unwrap();
        assert_eq!(parsed.sql, "SELECT 1");
        assert_eq!(parsed.explanation, "Inline:");
    }

    #[test]
    fn test_language_tag_on_one_line_block() {
        let parsed = parse_completion("Count: ```sql SELECT 1```", false).unwrap();
        assert_eq!(parsed.sql, "SELECT 1");

        let parsed = parse_completion("```sqlite SELECT name FROM customers```", false).unwrap();
        assert_eq!(parsed.sql, "SELECT name FROM customers");
    }

    #[test]
    fn test_only_first_block_is_sql() {
        let completion = "```sql\nSELECT 1\n```\nAlternative:\n```sql\nSELECT 2\n```";
        let parsed = parse_completion(completion, false).unwrap();
        assert_eq!(parsed.sql, "SELECT 1");
        assert!(parsed.explanation.contains("SELECT 2"));
    }

    #[test]
    fn test_missing_fence() {
        let err = parse_completion("SELECT * FROM customers", false).unwrap_err();
        match err {
            AgentError::UnparseableResponse { reason, snippet } => {
                assert!(reason.contains("no fenced code block"));
                assert_eq!(snippet, "SELECT * FROM customers");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_fence_mentions_token_limit() {
        let err = parse_completion("```sql\nSELECT name FROM", true).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not terminated"));
        assert!(message.contains("token limit"));
    }

    #[test]
    fn test_empty_block() {
        let err = parse_completion("Here you go:\n```sql\n\n```", false).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_empty_completion_snippet() {
        match parse_completion("   ", false).unwrap_err() {
            AgentError::UnparseableResponse { snippet, .. } => {
                assert_eq!(snippet, "(empty completion)")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
