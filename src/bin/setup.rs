// Creates the sample shop database used by sql-agent.

use anyhow::{Context, Result};
use clap::Parser;
use sql_agent::config::Settings;
use sql_agent::database::{bootstrap, install_tags, BootstrapOptions, Database};
use sql_agent::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sql-agent-setup",
    version,
    about = "Create the sample shop database with column tags"
)]
struct Args {
    /// Database file (defaults to the configured path)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Replace an existing database file
    #[arg(short, long)]
    force: bool,

    /// Seed for the sample data
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of customers
    #[arg(long, default_value_t = 200)]
    customers: usize,

    /// Number of orders
    #[arg(long, default_value_t = 1000)]
    orders: usize,

    /// Number of product reviews
    #[arg(long, default_value_t = 600)]
    reviews: usize,

    /// Only reinstall the column tags in an existing database
    #[arg(long, conflicts_with = "force")]
    tags_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load()?;
    init_tracing(&settings.log_level);
    let path = args.database.unwrap_or(settings.database_path);

    if args.tags_only {
        let db = Database::open(&path, false).await?;
        let mut conn = db
            .pool()
            .acquire()
            .await
            .context("could not acquire a connection")?;
        let count = install_tags(&mut conn).await?;
        drop(conn);
        db.close().await;

        println!("✓ Installed {} column tags in {}", count, path.display());
        return Ok(());
    }

    let options = BootstrapOptions {
        seed: args.seed,
        customers: args.customers,
        orders: args.orders,
        reviews: args.reviews,
        overwrite: args.force,
    };

    println!("Creating {} ...", path.display());
    let report = bootstrap(&path, &options).await?;

    println!();
    for (table, count) in &report.tables {
        println!("  {:<18} {:>6} rows", table, count);
    }
    println!();
    println!("✓ Database ready: {}", path.display());
    println!("  Try: sql-agent --interactive");

    Ok(())
}
