//! Column tags
//!
//! Semantic metadata for the columns of the sample database. Tags give the
//! model business context (what a column means, what it is good for) and
//! are stored in the `column_tags` table next to the data they describe.

use crate::error::Result;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Name of the metadata table
pub const TAGS_TABLE: &str = "column_tags";

/// A built-in tag definition
#[derive(Debug, Clone, Copy)]
pub struct TagDefinition {
    pub table: &'static str,
    pub column: &'static str,
    pub tag: &'static str,
    pub description: &'static str,
    pub examples: &'static str,
    pub use_for: &'static str,
}

const fn tag(
    table: &'static str,
    column: &'static str,
    tag: &'static str,
    description: &'static str,
    examples: &'static str,
    use_for: &'static str,
) -> TagDefinition {
    TagDefinition {
        table,
        column,
        tag,
        description,
        examples,
        use_for,
    }
}

/// Tags installed by [`install_tags`]
pub const COLUMN_TAGS: &[TagDefinition] = &[
    tag("categories", "id", "category_id", "Unique identifier for each product category", "1, 2, 3", "joining with products.category_id"),
    tag("categories", "name", "category_name", "Display name of the category", "Electronics, Books, Garden", "grouping and filtering products by category"),
    tag("suppliers", "id", "supplier_id", "Unique identifier for each supplier", "1, 2, 3", "joining with products.supplier_id"),
    tag("suppliers", "country", "supplier_country", "Country the supplier ships from", "USA, Germany, China", "sourcing analysis by geography"),
    tag("suppliers", "rating", "supplier_quality", "Supplier reliability score from 1.0 to 5.0", "4.2, 3.8", "ranking or filtering suppliers by quality"),
    tag("departments", "id", "department_id", "Unique identifier for each department", "1, 2, 3", "joining with employees.department_id"),
    tag("departments", "name", "department_name", "Name of the department", "Sales, Warehouse, IT", "grouping staff by department"),
    tag("departments", "budget", "department_budget", "Yearly budget in dollars", "120000, 450000", "comparing departments by budget"),
    tag("employees", "id", "employee_id", "Unique identifier for each employee", "1, 2, 3", "joining with orders.employee_id and employees.manager_id"),
    tag("employees", "department_id", "employee_department", "Foreign key to departments", "1, 4", "grouping employees by department"),
    tag("employees", "manager_id", "reports_to", "Foreign key to employees: the employee's manager, NULL at the top", "3, 7", "org-chart questions via a self-join (employees e JOIN employees m ON e.manager_id = m.id)"),
    tag("employees", "salary", "annual_salary", "Yearly base salary in dollars", "52000.00, 118500.50", "payroll totals, salary comparisons"),
    tag("employees", "hire_date", "hire_date", "Date the employee joined", "2022-08-01", "tenure and hiring trends"),
    tag("customers", "id", "customer_id", "Unique identifier for each customer", "1, 2, 3", "joining with orders and reviews, identifying specific customers"),
    tag("customers", "first_name", "customer_given_name", "Customer's first name", "Alice, Bob", "displaying customer identity (combine with last_name)"),
    tag("customers", "last_name", "customer_family_name", "Customer's last name", "Johnson, Smith", "displaying customer identity, searching by name"),
    tag("customers", "email", "customer_email", "Customer's email address (unique)", "alice.johnson@example.com", "contact info, unique customer lookup"),
    tag("customers", "city", "customer_location", "City where the customer lives", "New York, Chicago, Seattle", "geographic filtering, location-based analysis"),
    tag("customers", "membership_tier", "loyalty_tier", "Loyalty program level", "bronze, silver, gold, platinum", "segmenting customers by loyalty"),
    tag("customers", "total_spent", "lifetime_value", "Sum of total_amount over the customer's non-cancelled orders", "1520.40, 89.99", "ranking customers by spending without joining orders"),
    tag("customers", "order_count", "purchase_frequency", "Number of non-cancelled orders placed", "0, 3, 12", "finding repeat or inactive customers"),
    tag("customers", "created_at", "registration_date", "When the customer account was created", "2024-03-15 10:30:00", "customer tenure, cohort analysis, time-based filtering"),
    tag("shipping_methods", "id", "shipping_method_id", "Unique identifier for each shipping option", "1, 2, 3", "joining with orders.shipping_method_id"),
    tag("shipping_methods", "name", "shipping_option", "Name of the shipping option", "Standard, Express, Overnight", "grouping orders by delivery speed"),
    tag("shipping_methods", "price", "shipping_price", "Flat shipping fee in dollars", "5.99, 24.99", "shipping revenue analysis"),
    tag("discount_codes", "id", "discount_code_id", "Unique identifier for each discount code", "1, 2, 3", "joining with orders.discount_code_id"),
    tag("discount_codes", "code", "promo_code", "Code the customer entered", "SAVE10, FLAT25", "promotion performance by code"),
    tag("discount_codes", "discount_type", "discount_kind", "Whether discount_value is a percentage or a fixed dollar amount", "percentage, fixed", "interpreting discount_value"),
    tag("discount_codes", "usage_count", "redemptions", "Number of orders that used the code", "0, 14", "finding popular or unused promotions"),
    tag("products", "id", "product_id", "Unique identifier for each product", "1, 2, 3", "joining with order_items and reviews"),
    tag("products", "name", "product_name", "Name of the product", "Wireless Mouse, Desk Lamp", "displaying product identity, searching by name"),
    tag("products", "category_id", "product_category", "Foreign key to categories", "1, 4", "grouping products by category (join categories for the name)"),
    tag("products", "price", "list_price", "Current selling price per unit in dollars", "999.99, 29.99", "price filtering, catalog analysis"),
    tag("products", "cost", "unit_cost", "What the store pays the supplier per unit", "610.00, 12.50", "margin calculations (price - cost)"),
    tag("products", "stock", "inventory_count", "Units currently in stock", "0, 50, 200", "inventory checks, stock alerts, availability filtering"),
    tag("products", "rating", "average_rating", "Mean review rating, NULL when there are no reviews", "4.5, 3.2", "finding best or worst rated products"),
    tag("orders", "id", "order_id", "Unique identifier for each order", "1, 2, 3", "joining with order_items"),
    tag("orders", "customer_id", "ordering_customer", "Foreign key to customers: who placed the order", "1, 2, 3", "joining with customers, customer order history"),
    tag("orders", "order_date", "purchase_date", "When the order was placed", "2025-01-20 14:30:00", "time-based filtering, sales trends, date range queries"),
    tag("orders", "status", "order_status", "Fulfillment state of the order", "pending, processing, shipped, delivered, cancelled", "filtering by state; exclude cancelled orders from revenue"),
    tag("orders", "employee_id", "sales_rep", "Foreign key to employees: who handled the order, NULL for self-service orders", "4, 12", "sales performance per employee"),
    tag("orders", "shipping_method_id", "order_shipping", "Foreign key to shipping_methods", "1, 3", "orders by delivery option"),
    tag("orders", "discount_code_id", "applied_discount", "Foreign key to discount_codes, NULL when no code was used", "2, 5", "discounted vs full-price orders"),
    tag("orders", "discount_amount", "discount_given", "Dollars taken off by the discount code (0 if the order was below the code's minimum)", "0, 15.00, 42.10", "cost of promotions"),
    tag("orders", "total_amount", "order_revenue", "subtotal + shipping_cost + tax_amount - discount_amount", "1079.98, 32.39", "revenue calculations, average order value"),
    tag("order_items", "order_id", "parent_order", "Foreign key to orders: which order this line belongs to", "1, 2, 3", "joining with orders, grouping lines by order"),
    tag("order_items", "product_id", "ordered_product", "Foreign key to products: which product was ordered", "1, 2, 3", "joining with products, product sales analysis"),
    tag("order_items", "quantity", "quantity_ordered", "Number of units on the line", "1, 2, 5", "volume analysis, units sold"),
    tag("order_items", "unit_price", "price_at_purchase", "Price per unit when ordered (may differ from the current product price)", "999.99, 29.99", "historical pricing"),
    tag("order_items", "line_total", "line_revenue", "quantity * unit_price after the line discount", "59.98, 899.99", "product revenue (SUM of line_total)"),
    tag("reviews", "product_id", "reviewed_product", "Foreign key to products", "1, 2, 3", "joining with products for rating analysis"),
    tag("reviews", "customer_id", "reviewer", "Foreign key to customers: who wrote the review", "1, 2, 3", "finding customers who review"),
    tag("reviews", "rating", "review_score", "Star rating from 1 to 5", "1, 4, 5", "averaging satisfaction, filtering bad reviews"),
    tag("inventory_log", "product_id", "stocked_product", "Foreign key to products", "1, 2, 3", "stock history per product"),
    tag("inventory_log", "change_type", "stock_movement", "Kind of stock change", "sale, restock", "separating sales from restocks"),
    tag("inventory_log", "quantity_change", "stock_delta", "Units added (positive) or removed (negative)", "-3, 60", "summing stock movements"),
    tag("inventory_log", "created_at", "movement_date", "When the stock change happened", "2025-02-11 12:00:00", "inventory history over time"),
];

/// A column tag as stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ColumnTag {
    pub table_name: String,
    pub column_name: String,
    pub tag: String,
    pub description: Option<String>,
    pub examples: Option<String>,
    pub use_for: Option<String>,
}

impl From<&TagDefinition> for ColumnTag {
    fn from(def: &TagDefinition) -> Self {
        Self {
            table_name: def.table.to_string(),
            column_name: def.column.to_string(),
            tag: def.tag.to_string(),
            description: Some(def.description.to_string()),
            examples: Some(def.examples.to_string()),
            use_for: Some(def.use_for.to_string()),
        }
    }
}

/// Recreate the tags table and fill it with [`COLUMN_TAGS`]
///
/// Takes a connection so it can run inside the bootstrap transaction.
pub async fn install_tags(conn: &mut SqliteConnection) -> Result<usize> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", TAGS_TABLE))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE {} (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            tag TEXT NOT NULL,
            description TEXT,
            examples TEXT,
            use_for TEXT,
            PRIMARY KEY (table_name, column_name)
        )
        "#,
        TAGS_TABLE
    ))
    .execute(&mut *conn)
    .await?;

    let insert = format!(
        "INSERT INTO {} (table_name, column_name, tag, description, examples, use_for) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        TAGS_TABLE
    );

    for def in COLUMN_TAGS {
        sqlx::query(&insert)
            .bind(def.table)
            .bind(def.column)
            .bind(def.tag)
            .bind(def.description)
            .bind(def.examples)
            .bind(def.use_for)
            .execute(&mut *conn)
            .await?;
    }

    info!(count = COLUMN_TAGS.len(), "Installed column tags");
    Ok(COLUMN_TAGS.len())
}

/// Load every tag, ordered by table and column
///
/// A database without a tags table simply has no tags.
pub async fn load_tags(pool: &SqlitePool) -> Result<Vec<ColumnTag>> {
    let exists: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(TAGS_TABLE)
            .fetch_optional(pool)
            .await?;

    if exists.is_none() {
        debug!("No {} table, continuing without tags", TAGS_TABLE);
        return Ok(Vec::new());
    }

    let tags = sqlx::query_as::<_, ColumnTag>(&format!(
        "SELECT table_name, column_name, tag, description, examples, use_for \
         FROM {} ORDER BY table_name, column_name",
        TAGS_TABLE
    ))
    .fetch_all(pool)
    .await?;

    debug!(count = tags.len(), "Loaded column tags");
    Ok(tags)
}

/// Render tags grouped by table for the prompt
pub fn format_tags_for_prompt(tags: &[ColumnTag]) -> String {
    let mut lines = vec![
        "COLUMN TAGS & SEMANTIC METADATA:".to_string(),
        "=".repeat(50),
    ];

    let mut current_table: Option<&str> = None;
    for tag in tags {
        if current_table != Some(tag.table_name.as_str()) {
            lines.push(format!("\n[{}]", tag.table_name));
            current_table = Some(tag.table_name.as_str());
        }
        lines.push(format!("  {}:", tag.column_name));
        lines.push(format!("    tag: {}", tag.tag));
        if let Some(ref description) = tag.description {
            lines.push(format!("    meaning: {}", description));
        }
        if let Some(ref use_for) = tag.use_for {
            lines.push(format!("    use for: {}", use_for));
        }
    }

    lines.join("\n")
}
