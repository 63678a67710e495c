//! Terminal output formatting
//!
//! Every function returns a `String`; the caller decides when to print.
//! ANSI styling is only emitted when color is enabled.

use crate::agent::QueryResponse;
use crate::config::Settings;
use crate::database::{ColumnTag, QueryResult, SchemaIndex};
use crate::error::AgentError;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Table as TextTable};
use crossterm::style::Stylize;
use serde_json::Value;

/// Width of rules and boxes
pub const WIDTH: usize = 70;

/// Longest cell value shown in a result table
const MAX_CELL_CHARS: usize = 30;

/// Longest tag guidance shown in the tag table
const MAX_TAG_TEXT_CHARS: usize = 40;

const INDENT: &str = "    ";

/// Keywords highlighted in SQL
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "CROSS", "FULL",
    "NATURAL", "ON", "USING", "AND", "OR", "NOT", "IN", "IS", "NULL", "AS", "ORDER", "BY",
    "GROUP", "HAVING", "LIMIT", "OFFSET", "WITH", "LIKE", "BETWEEN", "EXISTS", "INSERT", "INTO",
    "VALUES", "UPDATE", "SET", "DELETE", "CREATE", "TABLE", "DROP", "ALTER", "EXPLAIN", "COUNT",
    "SUM", "AVG", "MIN", "MAX", "DISTINCT", "ASC", "DESC", "UNION", "ALL", "INTERSECT", "EXCEPT",
    "CASE", "WHEN", "THEN", "ELSE", "END",
];

/// Keywords that start a new line when they open a clause
const CLAUSE_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "HAVING", "LIMIT", "UNION", "INTERSECT", "EXCEPT",
];

const JOIN_MODIFIERS: &[&str] = &["LEFT", "RIGHT", "INNER", "OUTER", "CROSS", "FULL", "NATURAL"];

#[derive(Debug, Clone, Copy)]
enum Tone {
    Rule,
    Title,
    Step,
    Muted,
    Keyword,
    Label,
    Good,
    Bad,
}

/// Renders agent output for the terminal
#[derive(Debug, Clone)]
pub struct Formatter {
    color: bool,
    max_rows: usize,
}

impl Formatter {
    pub fn new(color: bool, max_rows: usize) -> Self {
        Self {
            color,
            max_rows: max_rows.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.color, settings.max_display_rows)
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        let text = text.to_string();
        if !self.color {
            return text;
        }
        match tone {
            Tone::Rule => text.blue().to_string(),
            Tone::Title => text.bold().to_string(),
            Tone::Step => text.yellow().to_string(),
            Tone::Muted => text.dim().to_string(),
            Tone::Keyword => text.magenta().to_string(),
            Tone::Label => text.cyan().to_string(),
            Tone::Good => text.green().to_string(),
            Tone::Bad => text.red().to_string(),
        }
    }

    /// Section header between two rules
    pub fn header(&self, title: &str) -> String {
        let rule = self.paint(&"═".repeat(WIDTH), Tone::Rule);
        format!("\n{}\n{}\n{}", rule, self.paint(title, Tone::Title), rule)
    }

    /// Numbered step, with where its data came from
    pub fn step(&self, number: usize, title: &str, source: Option<&str>) -> String {
        let mut output = format!(
            "\n{} {}",
            self.paint(&format!("[{}]", number), Tone::Step),
            self.paint(title, Tone::Title)
        );
        if let Some(source) = source {
            output.push_str(&format!(
                "\n{}{}",
                INDENT,
                self.paint(&format!("Source: {}", source), Tone::Muted)
            ));
        }
        output
    }

    /// Text inside a titled frame, word-wrapped
    pub fn boxed(&self, title: &str, text: &str) -> String {
        let inner = WIDTH - 8;
        let title_width = title.chars().count();
        let top = format!(
            "┌─ {} {}┐",
            title,
            "─".repeat(inner.saturating_sub(title_width + 3))
        );
        let bottom = format!("└{}┘", "─".repeat(inner));

        let mut lines = vec![format!("{}{}", INDENT, self.paint(&top, Tone::Label))];
        for line in wrap_paragraphs(text, inner - 2) {
            let padding = (inner - 2).saturating_sub(line.chars().count());
            lines.push(format!(
                "{}{} {}{} {}",
                INDENT,
                self.paint("│", Tone::Label),
                line,
                " ".repeat(padding),
                self.paint("│", Tone::Label)
            ));
        }
        lines.push(format!("{}{}", INDENT, self.paint(&bottom, Tone::Label)));
        lines.join("\n")
    }

    /// Titled block of wrapped text; blank lines between paragraphs are kept
    pub fn text_block(&self, title: &str, text: &str) -> String {
        let body: Vec<String> = wrap_paragraphs(text, WIDTH - 6)
            .into_iter()
            .map(|line| {
                if line.is_empty() {
                    line
                } else {
                    format!("{}{}", INDENT, line)
                }
            })
            .collect();

        format!(
            "\n{}\n{}",
            self.paint(&format!("• {}:", title), Tone::Good),
            body.join("\n")
        )
    }

    /// SQL laid out one clause per line inside a box
    pub fn sql(&self, sql: &str) -> String {
        let rule = "─".repeat(WIDTH - 8);
        let mut output = vec![format!(
            "{}{}",
            INDENT,
            self.paint(&format!("┌{}┐", rule), Tone::Muted)
        )];

        for (i, line) in self.layout_sql(sql).iter().enumerate() {
            let indent = if i == 0 { INDENT } else { "      " };
            output.push(format!("{}{}", indent, line));
        }

        output.push(format!(
            "{}{}",
            INDENT,
            self.paint(&format!("└{}┘", rule), Tone::Muted)
        ));
        output.join("\n")
    }

    fn layout_sql(&self, sql: &str) -> Vec<String> {
        let tokens = tokenize_sql(sql.trim());
        let mut lines = vec![String::new()];
        let mut depth = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let Some(current) = lines.last_mut() else {
                break;
            };
            match token {
                SqlToken::Word(word) => {
                    if depth == 0 && !current.trim().is_empty() && starts_clause(&tokens, i) {
                        let finished = current.trim_end().to_string();
                        *current = finished;
                        lines.push(String::new());
                    }
                    let styled = if SQL_KEYWORDS.contains(&word.to_uppercase().as_str()) {
                        self.paint(word, Tone::Keyword)
                    } else {
                        word.clone()
                    };
                    if let Some(current) = lines.last_mut() {
                        current.push_str(&styled);
                    }
                }
                SqlToken::Quoted(text) => current.push_str(text),
                SqlToken::Space => {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                }
                SqlToken::Symbol(c) => {
                    match c {
                        '(' => depth += 1,
                        ')' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    current.push(*c);
                }
            }
        }

        lines
            .into_iter()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Result rows as a table
    pub fn table(&self, result: &QueryResult) -> String {
        if result.is_empty() {
            return format!("{}{}", INDENT, self.paint("(no results)", Tone::Muted));
        }

        let mut table = self.text_table();
        table.set_header(
            result
                .columns
                .iter()
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        );
        for row in result.rows.iter().take(self.max_rows) {
            table.add_row(
                row.iter()
                    .map(|value| truncate(&display_value(value), MAX_CELL_CHARS)),
            );
        }

        let mut output = indent_lines(&table.to_string());

        let total = result.row_count();
        if total > self.max_rows {
            output.push('\n');
            output.push_str(INDENT);
            output.push_str(&self.paint(
                &format!("... and {} more rows", total - self.max_rows),
                Tone::Muted,
            ));
        }

        output.push_str("\n\n");
        output.push_str(INDENT);
        output.push_str(&self.paint(
            &format!(
                "({} row{} returned)",
                total,
                if total == 1 { "" } else { "s" }
            ),
            Tone::Muted,
        ));
        output
    }

    /// Compact schema view
    pub fn schema(&self, schema: &SchemaIndex) -> String {
        if schema.is_empty() {
            return format!("{}{}", INDENT, self.paint("(no tables)", Tone::Muted));
        }

        let mut output = Vec::new();
        for table in schema.tables.values() {
            let detail = match (table.is_view, table.row_count) {
                (true, _) => " (view)".to_string(),
                (false, Some(1)) => " (1 row)".to_string(),
                (false, Some(count)) => format!(" ({} rows)", count),
                (false, None) => String::new(),
            };
            output.push(format!(
                "\n{}{}{}",
                INDENT,
                self.paint(&table.name, Tone::Title),
                self.paint(&detail, Tone::Muted)
            ));
            output.push(format!(
                "{}{}",
                INDENT,
                self.paint(&"─".repeat(table.name.chars().count() + 4), Tone::Muted)
            ));

            for column in &table.columns {
                let pk = if column.is_primary_key {
                    format!("{} ", self.paint("PK", Tone::Step))
                } else {
                    "   ".to_string()
                };
                let fk = match column.references {
                    Some(ref fk) => format!(
                        " {}",
                        self.paint(&format!("→ {}.{}", fk.table, fk.column), Tone::Label)
                    ),
                    None => String::new(),
                };
                output.push(format!(
                    "      {}{}: {}{}",
                    pk,
                    column.name,
                    self.paint(column.type_name(), Tone::Muted),
                    fk
                ));
            }
        }

        output.join("\n")
    }

    /// Column tags as a table
    pub fn tags(&self, tags: &[ColumnTag]) -> String {
        if tags.is_empty() {
            return format!(
                "{}{}",
                INDENT,
                self.paint("(no column tags in this database)", Tone::Muted)
            );
        }

        let mut table = self.text_table();
        table.set_header(
            ["Table", "Column", "Tag", "Use for"]
                .into_iter()
                .map(|name| Cell::new(name).add_attribute(Attribute::Bold)),
        );
        for tag in tags {
            table.add_row(vec![
                tag.table_name.clone(),
                tag.column_name.clone(),
                tag.tag.clone(),
                truncate(tag.use_for.as_deref().unwrap_or(""), MAX_TAG_TEXT_CHARS),
            ]);
        }

        format!(
            "{}\n\n{}{}",
            indent_lines(&table.to_string()),
            INDENT,
            self.paint(
                &format!(
                    "({} tag{})",
                    tags.len(),
                    if tags.len() == 1 { "" } else { "s" }
                ),
                Tone::Muted
            )
        )
    }

    fn text_table(&self) -> TextTable {
        let mut table = TextTable::new();
        table.load_preset(UTF8_FULL);
        if self.color {
            table.enforce_styling();
        } else {
            table.force_no_tty();
        }
        table
    }

    pub fn error(&self, message: &str) -> String {
        format!("\n{}", self.paint(&format!("✗ Error: {}", message), Tone::Bad))
    }

    pub fn success(&self, message: &str) -> String {
        format!("\n{}", self.paint(&format!("✓ {}", message), Tone::Good))
    }

    /// Full walkthrough of an answered question
    pub fn render_response(&self, response: &QueryResponse, provider: &str, database: &str) -> String {
        let model = response.model.as_deref().unwrap_or("unknown model");
        let translation_source = format!("{} API ({})", provider, model);
        let execution_source = format!("SQLite ({})", database);
        let mut sections = vec![
            self.header("QUERY"),
            self.step(1, "Question Received", Some("User input")),
            self.boxed("Question", &response.question),
            self.step(2, "Translating to SQL", Some(translation_source.as_str())),
        ];

        if !response.explanation.is_empty() {
            sections.push(self.text_block("Explanation", &response.explanation));
        }
        if let (Some(input), Some(output)) = (response.input_tokens, response.output_tokens) {
            sections.push(format!(
                "{}{}",
                INDENT,
                self.paint(
                    &format!("Tokens: {} in / {} out", input, output),
                    Tone::Muted
                )
            ));
        }

        sections.push(self.step(3, "Generated SQL", Some("LLM output")));
        sections.push(self.sql(&response.sql));
        sections.push(self.step(4, "Execution", Some(execution_source.as_str())));
        sections.push(self.table(&response.result));
        sections.push(self.success("Query completed"));

        sections.join("\n")
    }

    /// A question that could not be answered
    ///
    /// Errors tied to a statement show the statement.
    pub fn render_failure(&self, question: &str, error: &AgentError) -> String {
        let mut sections = vec![
            self.header("QUERY"),
            self.step(1, "Question Received", Some("User input")),
            self.boxed("Question", question),
        ];

        if let Some(sql) = error.sql() {
            sections.push(self.step(2, "Generated SQL", Some("LLM output")));
            sections.push(self.sql(sql));
        }
        sections.push(self.error(&error_summary(error)));

        sections.join("\n")
    }
}

/// One-line description of an error, without the SQL it carries
pub fn error_summary(error: &AgentError) -> String {
    match error {
        AgentError::QueryExecution { message, .. } => format!("Query failed: {}", message),
        AgentError::UnsafeStatement {
            operation, reason, ..
        } => format!("Refused to run {} statement: {}", operation, reason),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SqlToken {
    Word(String),
    /// String literal or quoted identifier, kept verbatim
    Quoted(String),
    Space,
    Symbol(char),
}

fn tokenize_sql(sql: &str) -> Vec<SqlToken> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            tokens.push(SqlToken::Space);
        } else if matches!(c, '\'' | '"' | '`') {
            let mut quoted = String::from(c);
            while let Some(next) = chars.next() {
                quoted.push(next);
                if next == c {
                    // doubled quote is an escaped quote
                    if chars.peek() == Some(&c) {
                        quoted.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }
            tokens.push(SqlToken::Quoted(quoted));
        } else if c.is_alphanumeric() || c == '_' {
            let mut word = String::from(c);
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    word.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(SqlToken::Word(word));
        } else {
            tokens.push(SqlToken::Symbol(c));
        }
    }

    tokens
}

/// Nearest word before `index`, looking across spaces only
fn previous_word(tokens: &[SqlToken], index: usize) -> Option<String> {
    tokens[..index]
        .iter()
        .rev()
        .find(|t| **t != SqlToken::Space)
        .and_then(|t| match t {
            SqlToken::Word(w) => Some(w.to_uppercase()),
            _ => None,
        })
}

/// Nearest word after `index`, looking across spaces only
fn next_word(tokens: &[SqlToken], index: usize) -> Option<String> {
    tokens[index + 1..]
        .iter()
        .find(|t| **t != SqlToken::Space)
        .and_then(|t| match t {
            SqlToken::Word(w) => Some(w.to_uppercase()),
            _ => None,
        })
}

fn is_join_modifier(word: Option<&str>) -> bool {
    word.is_some_and(|w| JOIN_MODIFIERS.contains(&w))
}

fn starts_clause(tokens: &[SqlToken], index: usize) -> bool {
    let SqlToken::Word(word) = &tokens[index] else {
        return false;
    };
    let word = word.to_uppercase();
    let previous = previous_word(tokens, index);

    match word.as_str() {
        w if CLAUSE_KEYWORDS.contains(&w) => true,
        "GROUP" | "ORDER" => next_word(tokens, index).as_deref() == Some("BY"),
        "JOIN" => !is_join_modifier(previous.as_deref()),
        w if JOIN_MODIFIERS.contains(&w) => {
            if is_join_modifier(previous.as_deref()) {
                return false;
            }
            // Walk forward over modifiers looking for JOIN
            let mut i = index;
            while let Some(next) = next_word(tokens, i) {
                if next == "JOIN" {
                    return true;
                }
                if !JOIN_MODIFIERS.contains(&next.as_str()) {
                    return false;
                }
                i = match tokens[i + 1..]
                    .iter()
                    .position(|t| matches!(t, SqlToken::Word(_)))
                {
                    Some(offset) => i + 1 + offset,
                    None => return false,
                };
            }
            false
        }
        _ => false,
    }
}

/// Greedy word wrap, one output block per input line
fn wrap_paragraphs(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.trim().lines() {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn indent_lines(text: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", INDENT, line))
        .collect::<Vec<_>>()
        .join("\n")
}
