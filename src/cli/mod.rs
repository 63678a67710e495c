//! CLI module
//!
//! This module provides the command-line interface: demo mode, the REPL,
//! command handlers and the terminal formatter.

pub mod commands;
pub mod demo;
pub mod formatter;
pub mod repl;

// Re-exports
pub use demo::{run_demo, DEMO_QUESTIONS};
pub use formatter::Formatter;
pub use repl::Repl;
