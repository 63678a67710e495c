//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop. Questions
//! run one at a time; Ctrl-C cancels the one in flight.

use crate::agent::QueryAgent;
use crate::cli::commands::{self, format_error, Command, CommandType, COMMAND_NAMES};
use crate::cli::formatter::Formatter;
use crate::error::{AgentError, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use tracing::debug;

/// Meta-command completer
struct CommandCompleter;

impl Completer for CommandCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        let typed = &line[..pos];
        if typed.contains(' ') {
            return Ok((0, vec![]));
        }

        let (slash, word) = match typed.strip_prefix('/') {
            Some(rest) => ("/", rest),
            None => ("", typed),
        };
        let word = word.to_lowercase();
        let matches = COMMAND_NAMES
            .iter()
            .filter(|name| !word.is_empty() && name.starts_with(word.as_str()))
            .map(|name| format!("{}{}", slash, name))
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}

impl Validator for CommandCompleter {}

impl Helper for CommandCompleter {}

/// Interactive session
pub struct Repl {
    /// The rustyline editor
    editor: Editor<CommandCompleter, DefaultHistory>,
    /// Whether the REPL should continue running
    running: bool,
    formatter: Formatter,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(formatter: Formatter) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .auto_add_history(true)
            .build();

        let mut editor = Editor::<CommandCompleter, DefaultHistory>::with_config(config)
            .map_err(|e| {
                AgentError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to initialize editor: {}", e),
                ))
            })?;
        editor.set_helper(Some(CommandCompleter));

        let history_path = history_path();
        if let Err(e) = editor.load_history(&history_path) {
            // First run: no history yet
            debug!(error = %e, path = %history_path.display(), "No history loaded");
        }

        Ok(Self {
            editor,
            running: true,
            formatter,
            history_path,
        })
    }

    /// Run the REPL loop until quit or end of input
    pub async fn run(&mut self, agent: &QueryAgent) -> Result<()> {
        self.print_welcome();

        while self.running {
            match self.editor.readline("? ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match Command::parse(line) {
                        Ok(command) => self.handle_command(command, agent).await,
                        Err(e) => println!("{}", format_error(&e)),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    self.running = false;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    self.running = false;
                }
            }
        }

        self.save_history();
        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!("{}", self.formatter.header("SQL AGENT"));
        println!();
        println!("Ask a question about the database in plain English.");
        println!("Commands: schema, tags, help, quit");
        println!();
    }

    /// Handle a command
    async fn handle_command(&mut self, command: Command, agent: &QueryAgent) {
        match command.command_type {
            CommandType::Quit => self.running = false,
            CommandType::Query { .. } => {
                tokio::select! {
                    output = commands::handle_command(&command, agent, &self.formatter) => {
                        println!("{}", output);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!("{}", self.formatter.error(&AgentError::Cancelled.to_string()));
                    }
                }
            }
            _ => println!(
                "{}",
                commands::handle_command(&command, agent, &self.formatter).await
            ),
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                debug!(error = %e, "Could not create history directory");
                return;
            }
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            debug!(error = %e, "Could not save history");
        }
    }
}

fn history_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".sql-agent").join("history"))
        .unwrap_or_else(|| ".sql-agent-history".into())
}
