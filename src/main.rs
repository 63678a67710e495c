// SQL Agent: ask a SQLite database questions in plain English
//
// Demo mode runs a fixed list of questions; --interactive opens a REPL.

use anyhow::Result;
use clap::Parser;
use sql_agent::agent::{AgentContext, QueryAgent};
use sql_agent::cli::{run_demo, Formatter, Repl};
use sql_agent::config::Settings;
use sql_agent::database::Database;
use sql_agent::llm::{build_provider, generation_params};
use sql_agent::logging::init_tracing;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "sql-agent",
    version,
    about = "Ask questions about a SQLite database in plain English"
)]
struct Args {
    /// Open an interactive session instead of running the demo questions
    #[arg(short, long)]
    interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    // Fail before touching the database or the network
    settings.require_api_key()?;

    let database = Database::open(&settings.database_path, !settings.allow_writes).await?;
    let context = AgentContext::load(database).await?;
    let provider = build_provider(&settings)?;
    info!(
        provider = provider.provider_name(),
        model = provider.model(),
        allow_writes = settings.allow_writes,
        "Starting"
    );

    let agent = QueryAgent::new(provider, context, generation_params(&settings))
        .with_allow_writes(settings.allow_writes);
    let formatter = Formatter::from_settings(&settings);

    let outcome = if args.interactive {
        match Repl::new(formatter) {
            Ok(mut repl) => repl.run(&agent).await,
            Err(e) => Err(e),
        }
    } else {
        run_demo(&agent, &formatter).await;
        Ok(())
    };

    agent.shutdown().await;
    outcome?;
    Ok(())
}
