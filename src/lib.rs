//! SQL Agent Library
//!
//! Ask questions about a SQLite database in plain English. The binaries are
//! in src/main.rs (the agent) and src/bin/setup.rs (the sample database).

pub mod agent;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod llm;
pub mod logging;
