//! Integration tests for the SQL agent
//!
//! These run the real database layer against in-memory and temporary
//! SQLite files, with a scripted provider standing in for the LLM API.

use async_trait::async_trait;
use serde_json::Value;
use sql_agent::agent::{AgentContext, QueryAgent};
use sql_agent::cli::commands::{handle_command, Command};
use sql_agent::cli::Formatter;
use sql_agent::database::bootstrap::SAMPLE_TABLES;
use sql_agent::database::tags::{COLUMN_TAGS, TAGS_TABLE};
use sql_agent::database::{
    bootstrap, bootstrap_pool, index_sqlite, load_tags, BootstrapOptions, Database,
};
use sql_agent::error::{AgentError, ErrorKind, Result};
use sql_agent::llm::{GenerationParams, LLMProvider, LLMResponse, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider that always answers with the same completion
struct ScriptedProvider {
    completion: String,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(
        &self,
        messages: &[Message],
        _params: &GenerationParams,
    ) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = messages.to_vec();

        Ok(LLMResponse {
            content: self.completion.clone(),
            input_tokens: Some(1200),
            output_tokens: Some(80),
            model: Some("scripted-model".to_string()),
            finish_reason: Some("end_turn".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn has_api_key(&self) -> bool {
        true
    }
}

struct Harness {
    agent: QueryAgent,
    calls: Arc<AtomicUsize>,
    last_prompt: Arc<Mutex<Vec<Message>>>,
}

fn small_options() -> BootstrapOptions {
    BootstrapOptions {
        customers: 20,
        orders: 60,
        reviews: 40,
        ..BootstrapOptions::default()
    }
}

async fn harness(completion: &str, options: BootstrapOptions) -> Harness {
    let db = Database::in_memory().await.unwrap();
    bootstrap_pool(db.pool(), &options).await.unwrap();
    let context = AgentContext::load(db).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let last_prompt = Arc::new(Mutex::new(Vec::new()));
    let provider = ScriptedProvider {
        completion: completion.to_string(),
        calls: Arc::clone(&calls),
        last_prompt: Arc::clone(&last_prompt),
    };

    Harness {
        agent: QueryAgent::new(Box::new(provider), context, GenerationParams::default()),
        calls,
        last_prompt,
    }
}

fn fenced(sql: &str, explanation: &str) -> String {
    format!("```sql\n{}\n```\n\n{}", sql, explanation)
}

#[tokio::test]
async fn test_bootstrap_in_memory_creates_every_table() {
    let db = Database::in_memory().await.unwrap();
    let report = bootstrap_pool(db.pool(), &small_options()).await.unwrap();

    assert_eq!(report.row_count("customers"), Some(20));
    assert_eq!(report.row_count("orders"), Some(60));
    assert_eq!(report.row_count("reviews"), Some(40));
    assert_eq!(report.row_count(TAGS_TABLE), Some(COLUMN_TAGS.len() as i64));
    assert_eq!(report.tags, COLUMN_TAGS.len());

    let schema = index_sqlite(db.pool()).await.unwrap();
    for table in SAMPLE_TABLES {
        let indexed = schema.get_table(table).unwrap();
        assert!(indexed.row_count.unwrap() > 0, "{table} is empty");
    }

    let orders = schema.get_table("orders").unwrap();
    for column in ["id", "customer_id", "order_date", "status", "total_amount"] {
        assert!(orders.get_column(column).is_some(), "orders.{column} missing");
    }
    let customer_fk = orders.get_column("customer_id").unwrap();
    assert_eq!(customer_fk.references.as_ref().unwrap().table, "customers");

    db.close().await;
}

#[tokio::test]
async fn test_bootstrap_foreign_keys_resolve() {
    let db = Database::in_memory().await.unwrap();
    bootstrap_pool(db.pool(), &small_options()).await.unwrap();

    let violations = db.run_query("PRAGMA foreign_key_check").await.unwrap();
    assert!(violations.is_empty(), "violations: {:?}", violations.rows);

    let orphans = db
        .run_query(
            "SELECT COUNT(*) FROM order_items i \
             LEFT JOIN orders o ON o.id = i.order_id \
             LEFT JOIN products p ON p.id = i.product_id \
             WHERE o.id IS NULL OR p.id IS NULL",
        )
        .await
        .unwrap();
    assert_eq!(orphans.rows[0][0], Value::from(0));

    for (label, sql) in [
        (
            "employee department or manager",
            "SELECT COUNT(*) FROM employees e \
             LEFT JOIN departments d ON d.id = e.department_id \
             LEFT JOIN employees m ON m.id = e.manager_id \
             WHERE d.id IS NULL OR (e.manager_id IS NOT NULL AND m.id IS NULL)",
        ),
        (
            "order rep, shipping or discount",
            "SELECT COUNT(*) FROM orders o \
             LEFT JOIN employees e ON e.id = o.employee_id \
             LEFT JOIN shipping_methods s ON s.id = o.shipping_method_id \
             LEFT JOIN discount_codes d ON d.id = o.discount_code_id \
             WHERE (o.employee_id IS NOT NULL AND e.id IS NULL) \
                OR s.id IS NULL \
                OR (o.discount_code_id IS NOT NULL AND d.id IS NULL)",
        ),
        (
            "inventory product",
            "SELECT COUNT(*) FROM inventory_log l \
             LEFT JOIN products p ON p.id = l.product_id WHERE p.id IS NULL",
        ),
    ] {
        let orphans = db.run_query(sql).await.unwrap();
        assert_eq!(orphans.rows[0][0], Value::from(0), "orphaned {label}");
    }

    let managed = db
        .run_query("SELECT COUNT(*) FROM employees WHERE manager_id IS NOT NULL")
        .await
        .unwrap();
    assert!(managed.rows[0][0].as_i64().unwrap() > 0);

    db.close().await;
}

#[tokio::test]
async fn test_bootstrap_file_exists_and_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let options = small_options();

    let report = bootstrap(&path, &options).await.unwrap();
    assert!(path.exists());
    assert_eq!(report.row_count("orders"), Some(60));

    let db = Database::open(&path, true).await.unwrap();
    let first = db
        .run_query("SELECT email, total_spent FROM customers ORDER BY id")
        .await
        .unwrap();
    db.close().await;

    // A second run must not clobber the file
    let err = bootstrap(&path, &options).await.unwrap_err();
    assert!(matches!(err, AgentError::DatabaseExists(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // With overwrite the file is rebuilt from the same seed
    let overwrite = BootstrapOptions {
        overwrite: true,
        ..options
    };
    bootstrap(&path, &overwrite).await.unwrap();

    let db = Database::open(&path, true).await.unwrap();
    let second = db
        .run_query("SELECT email, total_spent FROM customers ORDER BY id")
        .await
        .unwrap();
    db.close().await;

    assert_eq!(first, second);
    assert_eq!(first.row_count(), 20);
}

#[tokio::test]
async fn test_tags_unique_and_reference_real_columns() {
    let db = Database::in_memory().await.unwrap();
    bootstrap_pool(db.pool(), &small_options()).await.unwrap();

    let tags = load_tags(db.pool()).await.unwrap();
    assert_eq!(tags.len(), COLUMN_TAGS.len());

    let distinct = db
        .run_query(&format!(
            "SELECT COUNT(*) FROM (SELECT DISTINCT table_name, column_name, tag FROM {})",
            TAGS_TABLE
        ))
        .await
        .unwrap();
    assert_eq!(distinct.rows[0][0], Value::from(COLUMN_TAGS.len() as i64));

    let schema = index_sqlite(db.pool()).await.unwrap();
    for tag in &tags {
        let table = schema
            .get_table(&tag.table_name)
            .unwrap_or_else(|| panic!("tag on unknown table {}", tag.table_name));
        assert!(
            table.get_column(&tag.column_name).is_some(),
            "tag on unknown column {}.{}",
            tag.table_name,
            tag.column_name
        );
    }

    db.close().await;
}

#[tokio::test]
async fn test_context_hides_tags_table() {
    let h = harness("unused", small_options()).await;
    let context = h.agent.context();

    assert!(context.schema.get_table(TAGS_TABLE).is_none());
    assert!(context.schema.get_table("orders").is_some());
    assert_eq!(context.tags.len(), COLUMN_TAGS.len());
}

#[tokio::test]
async fn test_answer_runs_generated_sql() {
    let completion = fenced(
        "SELECT COUNT(*) AS customer_count FROM customers;",
        "σ over no predicate: the whole customers set, then its cardinality.",
    );
    let h = harness(&completion, small_options()).await;

    let response = h.agent.answer("How many customers do we have?").await.unwrap();
    assert_eq!(response.sql, "SELECT COUNT(*) AS customer_count FROM customers;");
    assert_eq!(
        response.explanation,
        "σ over no predicate: the whole customers set, then its cardinality."
    );
    assert_eq!(response.result.columns, vec!["customer_count"]);
    assert_eq!(response.result.rows, vec![vec![Value::from(20)]]);
    assert_eq!(response.model.as_deref(), Some("scripted-model"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    let prompt = h.last_prompt.lock().unwrap().clone();
    let system = &prompt[0].content;
    assert!(system.contains("TABLE: customers"));
    assert!(system.contains("tag: lifetime_value"));
    assert!(!system.contains("TABLE: column_tags"));
    assert!(prompt[1].content.contains("How many customers do we have?"));

    h.agent.shutdown().await;
}

#[tokio::test]
async fn test_count_orders_on_tiny_dataset() {
    let options = BootstrapOptions {
        customers: 2,
        orders: 3,
        reviews: 0,
        ..BootstrapOptions::default()
    };
    let h = harness(&fenced("SELECT COUNT(*) FROM orders", "Count the orders."), options).await;

    let response = h.agent.answer("How many orders are there?").await.unwrap();
    assert_eq!(response.result.row_count(), 1);
    assert_eq!(response.result.rows[0], vec![Value::from(3)]);
}

#[tokio::test]
async fn test_nonexistent_column_is_a_query_error() {
    let completion = fenced("SELECT loyalty_points FROM customers", "Project π(loyalty_points).");
    let h = harness(&completion, small_options()).await;

    let err = h.agent.answer("What are the loyalty points?").await.unwrap_err();
    match &err {
        AgentError::QueryExecution { sql, message } => {
            assert_eq!(sql, "SELECT loyalty_points FROM customers");
            assert!(message.contains("no such column"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::QueryExecution);

    // The agent is still usable afterwards
    let result = h.agent.execute("SELECT COUNT(*) FROM customers").await.unwrap();
    assert_eq!(result.rows[0][0], Value::from(20));
}

#[tokio::test]
async fn test_write_statement_is_refused() {
    let h = harness(&fenced("DELETE FROM orders", "Remove every order."), small_options()).await;

    let err = h.agent.answer("Delete all orders").await.unwrap_err();
    match &err {
        AgentError::UnsafeStatement { operation, sql, .. } => {
            assert_eq!(operation, "DELETE");
            assert_eq!(sql, "DELETE FROM orders");
        }
        other => panic!("unexpected error: {other}"),
    }

    let remaining = h.agent.execute("SELECT COUNT(*) FROM orders").await.unwrap();
    assert_eq!(remaining.rows[0][0], Value::from(60));
}

#[tokio::test]
async fn test_delete_behind_cte_is_refused() {
    let sql = "WITH x AS (SELECT 1) DELETE FROM reviews";
    let h = harness(&fenced(sql, "Clear the reviews."), small_options()).await;

    let err = h.agent.answer("Delete every review").await.unwrap_err();
    match &err {
        AgentError::UnsafeStatement { operation, .. } => assert_eq!(operation, "DELETE"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::QueryExecution);

    let remaining = h.agent.execute("SELECT COUNT(*) FROM reviews").await.unwrap();
    assert_eq!(remaining.rows[0][0], Value::from(40));
}

#[tokio::test]
async fn test_read_only_connection_blocks_writes_without_guard() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    bootstrap(&path, &small_options()).await.unwrap();

    let db = Database::open(&path, true).await.unwrap();
    let context = AgentContext::load(db).await.unwrap();
    let provider = ScriptedProvider {
        completion: fenced("DELETE FROM reviews", "Remove reviews."),
        calls: Arc::new(AtomicUsize::new(0)),
        last_prompt: Arc::new(Mutex::new(Vec::new())),
    };
    let agent = QueryAgent::new(Box::new(provider), context, GenerationParams::default())
        .with_allow_writes(true);

    let err = agent.answer("Delete the reviews").await.unwrap_err();
    assert!(matches!(err, AgentError::QueryExecution { .. }));

    let remaining = agent.execute("SELECT COUNT(*) FROM reviews").await.unwrap();
    assert_eq!(remaining.rows[0][0], Value::from(40));
    agent.shutdown().await;
}

#[tokio::test]
async fn test_unparseable_completion() {
    let h = harness("Sorry, I am not sure which table holds that.", small_options()).await;

    let err = h.agent.answer("Where are the unicorns?").await.unwrap_err();
    assert!(matches!(err, AgentError::UnparseableResponse { .. }));
    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_meta_commands_never_call_the_provider() {
    let h = harness("unused", small_options()).await;
    let formatter = Formatter::new(false, 20);

    let schema = handle_command(&Command::parse("schema").unwrap(), &h.agent, &formatter).await;
    for table in SAMPLE_TABLES {
        assert!(schema.contains(table), "schema output misses {table}");
    }
    assert!(!schema.contains(TAGS_TABLE));

    let tags = handle_command(&Command::parse("/TAGS").unwrap(), &h.agent, &formatter).await;
    for def in COLUMN_TAGS {
        assert!(tags.contains(def.tag), "tags output misses {}", def.tag);
    }

    let help = handle_command(&Command::parse("help").unwrap(), &h.agent, &formatter).await;
    assert!(help.contains("schema"));

    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_question_command_renders_failure() {
    let h = harness(&fenced("SELECT nope FROM orders", "Project nope."), small_options()).await;
    let formatter = Formatter::new(false, 20);

    let output = handle_command(
        &Command::parse("What is nope?").unwrap(),
        &h.agent,
        &formatter,
    )
    .await;

    assert!(output.contains("SELECT nope FROM orders"));
    assert!(output.contains("✗ Error: Query failed"));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}
