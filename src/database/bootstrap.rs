//! Sample database bootstrapper
//!
//! Creates the e-commerce sample database: a fixed schema filled with
//! generated data from a seeded PRNG, so the same options always produce
//! the same rows. Column tags are installed as the last step.

use crate::database::connection::Database;
use crate::database::indexer::quote_identifier;
use crate::database::tags::{install_tags, TAGS_TABLE};
use crate::error::{AgentError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tables created by the bootstrapper, in creation order
pub const SAMPLE_TABLES: &[&str] = &[
    "categories",
    "suppliers",
    "departments",
    "employees",
    "customers",
    "shipping_methods",
    "discount_codes",
    "products",
    "orders",
    "order_items",
    "reviews",
    "inventory_log",
];

/// Employees are a fixed-size staff, independent of the customer volume
const EMPLOYEE_COUNT: usize = 40;

/// Employees hired before this many colleagues have no manager
const TOP_LEVEL_EMPLOYEES: usize = 5;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        description TEXT
    )"#,
    r#"CREATE TABLE suppliers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE,
        country TEXT,
        rating REAL
    )"#,
    r#"CREATE TABLE departments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        description TEXT,
        budget REAL DEFAULT 0
    )"#,
    r#"CREATE TABLE employees (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        department_id INTEGER NOT NULL,
        manager_id INTEGER,
        hire_date TEXT NOT NULL,
        salary REAL NOT NULL,
        commission_pct REAL DEFAULT 0,
        active INTEGER DEFAULT 1,
        FOREIGN KEY (department_id) REFERENCES departments(id),
        FOREIGN KEY (manager_id) REFERENCES employees(id)
    )"#,
    r#"CREATE TABLE customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        city TEXT,
        state TEXT,
        country TEXT DEFAULT 'USA',
        membership_tier TEXT DEFAULT 'bronze',
        total_spent REAL DEFAULT 0,
        order_count INTEGER DEFAULT 0,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE shipping_methods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        price REAL NOT NULL,
        min_days INTEGER NOT NULL,
        max_days INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE discount_codes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT UNIQUE NOT NULL,
        discount_value REAL NOT NULL,
        discount_type TEXT NOT NULL CHECK (discount_type IN ('percentage', 'fixed')),
        valid_from TEXT NOT NULL,
        valid_until TEXT NOT NULL,
        minimum_order REAL DEFAULT 0,
        usage_count INTEGER DEFAULT 0
    )"#,
    r#"CREATE TABLE products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sku TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        category_id INTEGER NOT NULL,
        supplier_id INTEGER,
        brand TEXT,
        price REAL NOT NULL,
        cost REAL,
        stock INTEGER DEFAULT 0,
        rating REAL,
        review_count INTEGER DEFAULT 0,
        FOREIGN KEY (category_id) REFERENCES categories(id),
        FOREIGN KEY (supplier_id) REFERENCES suppliers(id)
    )"#,
    r#"CREATE TABLE orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_number TEXT UNIQUE NOT NULL,
        customer_id INTEGER NOT NULL,
        employee_id INTEGER,
        order_date TEXT NOT NULL,
        status TEXT DEFAULT 'pending',
        payment_method TEXT,
        shipping_method_id INTEGER NOT NULL,
        discount_code_id INTEGER,
        subtotal REAL DEFAULT 0,
        shipping_cost REAL DEFAULT 0,
        tax_amount REAL DEFAULT 0,
        discount_amount REAL DEFAULT 0,
        total_amount REAL DEFAULT 0,
        FOREIGN KEY (customer_id) REFERENCES customers(id),
        FOREIGN KEY (employee_id) REFERENCES employees(id),
        FOREIGN KEY (shipping_method_id) REFERENCES shipping_methods(id),
        FOREIGN KEY (discount_code_id) REFERENCES discount_codes(id)
    )"#,
    r#"CREATE TABLE order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        quantity INTEGER NOT NULL,
        unit_price REAL NOT NULL,
        discount_pct REAL DEFAULT 0,
        line_total REAL NOT NULL,
        FOREIGN KEY (order_id) REFERENCES orders(id),
        FOREIGN KEY (product_id) REFERENCES products(id)
    )"#,
    r#"CREATE TABLE reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL,
        customer_id INTEGER NOT NULL,
        rating INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
        title TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id),
        FOREIGN KEY (customer_id) REFERENCES customers(id)
    )"#,
    r#"CREATE TABLE inventory_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id INTEGER NOT NULL,
        change_type TEXT NOT NULL,
        quantity_change INTEGER NOT NULL,
        quantity_after INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (product_id) REFERENCES products(id)
    )"#,
    "CREATE INDEX idx_employees_department ON employees(department_id)",
    "CREATE INDEX idx_employees_manager ON employees(manager_id)",
    "CREATE INDEX idx_customers_city ON customers(city)",
    "CREATE INDEX idx_customers_tier ON customers(membership_tier)",
    "CREATE INDEX idx_products_category ON products(category_id)",
    "CREATE INDEX idx_products_price ON products(price)",
    "CREATE INDEX idx_orders_customer ON orders(customer_id)",
    "CREATE INDEX idx_orders_date ON orders(order_date)",
    "CREATE INDEX idx_orders_status ON orders(status)",
    "CREATE INDEX idx_order_items_order ON order_items(order_id)",
    "CREATE INDEX idx_order_items_product ON order_items(product_id)",
    "CREATE INDEX idx_orders_employee ON orders(employee_id)",
    "CREATE INDEX idx_reviews_product ON reviews(product_id)",
    "CREATE INDEX idx_inventory_product ON inventory_log(product_id)",
];

/// Derived columns, filled once the base rows exist
const DERIVED_UPDATES: &[&str] = &[
    r#"UPDATE orders SET
        subtotal = (SELECT ROUND(COALESCE(SUM(line_total), 0), 2)
                    FROM order_items WHERE order_items.order_id = orders.id),
        tax_amount = (SELECT ROUND(COALESCE(SUM(line_total), 0) * 0.08, 2)
                      FROM order_items WHERE order_items.order_id = orders.id)"#,
    r#"UPDATE orders SET
        shipping_cost = (SELECT price FROM shipping_methods
                         WHERE shipping_methods.id = orders.shipping_method_id),
        discount_amount = COALESCE((
            SELECT ROUND(CASE
                WHEN orders.subtotal < d.minimum_order THEN 0
                WHEN d.discount_type = 'percentage' THEN orders.subtotal * d.discount_value / 100.0
                ELSE MIN(d.discount_value, orders.subtotal)
            END, 2)
            FROM discount_codes d WHERE d.id = orders.discount_code_id), 0)"#,
    "UPDATE orders SET total_amount = ROUND(subtotal + shipping_cost + tax_amount - discount_amount, 2)",
    r#"UPDATE discount_codes SET
        usage_count = (SELECT COUNT(*) FROM orders WHERE orders.discount_code_id = discount_codes.id)"#,
    r#"UPDATE customers SET
        total_spent = (SELECT ROUND(COALESCE(SUM(total_amount), 0), 2) FROM orders
                       WHERE orders.customer_id = customers.id AND orders.status != 'cancelled'),
        order_count = (SELECT COUNT(*) FROM orders
                       WHERE orders.customer_id = customers.id AND orders.status != 'cancelled')"#,
    r#"UPDATE products SET
        rating = (SELECT ROUND(AVG(rating), 2) FROM reviews WHERE reviews.product_id = products.id),
        review_count = (SELECT COUNT(*) FROM reviews WHERE reviews.product_id = products.id)"#,
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Electronics", "Electronic devices and accessories"),
    ("Furniture", "Home and office furniture"),
    ("Office Supplies", "Office and stationery items"),
    ("Sports & Outdoors", "Sports equipment and outdoor gear"),
    ("Home & Kitchen", "Home goods and kitchen appliances"),
    ("Books", "Books, magazines and publications"),
    ("Garden", "Gardening tools and outdoor living"),
    ("Pet Supplies", "Pet food and accessories"),
];

/// (name, email, country, rating)
const SUPPLIERS: &[(&str, &str, &str, f64)] = &[
    ("TechCorp Distribution", "sales@techcorp.example", "USA", 4.6),
    ("Nordic Furnishings", "orders@nordic.example", "Sweden", 4.3),
    ("PaperCo Wholesale", "trade@paperco.example", "Canada", 4.1),
    ("Summit Outdoor Supply", "hello@summit.example", "Germany", 3.9),
    ("Shenzhen Components", "export@szcomp.example", "China", 3.6),
    ("GreenLeaf Imports", "info@greenleaf.example", "UK", 4.4),
];

/// (category, name, brand, price)
const PRODUCTS: &[(&str, &str, &str, f64)] = &[
    ("Electronics", "Laptop Pro 15", "TechCorp", 1299.99),
    ("Electronics", "Laptop Air 13", "TechCorp", 899.99),
    ("Electronics", "Wireless Mouse", "PeripheralCo", 29.99),
    ("Electronics", "Mechanical Keyboard", "PeripheralCo", 129.99),
    ("Electronics", "4K Monitor 27\"", "DisplayTech", 449.99),
    ("Electronics", "Wireless Headphones", "AudioMax", 249.99),
    ("Electronics", "USB-C Dock", "TechCorp", 199.99),
    ("Electronics", "External SSD 1TB", "StoragePro", 119.99),
    ("Furniture", "Mesh Office Chair", "OfficePro", 249.99),
    ("Furniture", "Standing Desk 60\"", "DeskMaster", 599.99),
    ("Furniture", "Bookshelf 5-Tier", "HomeFurn", 129.99),
    ("Furniture", "Desk Lamp LED", "LightWorks", 49.99),
    ("Furniture", "Coffee Table", "HomeFurn", 199.99),
    ("Office Supplies", "Notebook 3-Pack", "PaperCo", 9.99),
    ("Office Supplies", "Gel Pens 24-Pack", "WriteCo", 14.99),
    ("Office Supplies", "Sticky Notes 12-Pack", "PaperCo", 12.99),
    ("Office Supplies", "Stapler Heavy Duty", "OfficePro", 24.99),
    ("Office Supplies", "Printer Paper Ream", "PaperCo", 8.99),
    ("Sports & Outdoors", "Yoga Mat", "FitLife", 34.99),
    ("Sports & Outdoors", "Adjustable Dumbbells", "FitLife", 299.99),
    ("Sports & Outdoors", "Camping Tent 4-Person", "TrailBlazer", 189.99),
    ("Sports & Outdoors", "Hiking Backpack 40L", "TrailBlazer", 119.99),
    ("Sports & Outdoors", "Water Bottle Insulated", "HydroPeak", 24.99),
    ("Home & Kitchen", "Coffee Maker", "BrewMaster", 89.99),
    ("Home & Kitchen", "Chef's Knife 8\"", "EdgeCraft", 59.99),
    ("Home & Kitchen", "Nonstick Pan Set", "CookRight", 129.99),
    ("Home & Kitchen", "Blender Pro", "BrewMaster", 149.99),
    ("Books", "The Pragmatic Programmer", "Addison-Wesley", 44.99),
    ("Books", "Designing Data-Intensive Applications", "O'Reilly", 54.99),
    ("Books", "Cooking for Engineers", "Kitchen Press", 29.99),
    ("Books", "Field Guide to Birds", "Nature Books", 19.99),
    ("Garden", "Garden Hose 50ft", "GreenThumb", 39.99),
    ("Garden", "Pruning Shears", "GreenThumb", 24.99),
    ("Garden", "Raised Garden Bed", "YardWorks", 89.99),
    ("Garden", "Solar Path Lights 8-Pack", "YardWorks", 49.99),
    ("Pet Supplies", "Dog Bed Large", "PawComfort", 79.99),
    ("Pet Supplies", "Cat Scratching Post", "PawComfort", 39.99),
    ("Pet Supplies", "Automatic Pet Feeder", "SmartPet", 69.99),
];

const DEPARTMENTS: &[(&str, &str)] = &[
    ("Sales", "Customer sales and account management"),
    ("Customer Support", "Customer service and technical support"),
    ("Warehouse", "Inventory and order fulfillment"),
    ("Marketing", "Advertising and promotions"),
    ("IT", "Technology infrastructure"),
    ("Finance", "Accounting and financial operations"),
    ("HR", "Human resources and recruitment"),
    ("Logistics", "Shipping and delivery"),
];

/// (name, price, min_days, max_days)
const SHIPPING_METHODS: &[(&str, f64, i64, i64)] = &[
    ("Standard", 5.99, 5, 7),
    ("Express", 12.99, 2, 3),
    ("Overnight", 24.99, 1, 1),
    ("Economy", 3.99, 7, 14),
    ("Free Shipping", 0.0, 5, 10),
];

/// (code, value, type, valid_from, valid_until, minimum_order)
const DISCOUNT_CODES: &[(&str, f64, &str, &str, &str, f64)] = &[
    ("SAVE10", 10.0, "percentage", "2024-01-01", "2025-12-31", 100.0),
    ("SAVE20", 20.0, "percentage", "2024-01-01", "2025-12-31", 200.0),
    ("FLAT15", 15.0, "fixed", "2024-01-01", "2025-12-31", 75.0),
    ("FLAT25", 25.0, "fixed", "2024-01-01", "2025-12-31", 125.0),
    ("WELCOME5", 5.0, "percentage", "2024-01-01", "2025-12-31", 0.0),
    ("SUMMER15", 15.0, "percentage", "2024-06-01", "2024-08-31", 50.0),
    ("HOLIDAY20", 20.0, "percentage", "2024-11-01", "2024-12-31", 100.0),
    ("CLEARANCE30", 30.0, "percentage", "2024-01-01", "2025-12-31", 150.0),
];

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "William",
    "Elizabeth", "David", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Charles", "Karen", "Daniel", "Lisa", "Matthew", "Emily", "Andrew", "Olivia", "Nathan",
    "Grace", "Samuel", "Chloe",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Wilson", "Anderson", "Taylor", "Thomas", "Moore", "Jackson", "Martin", "Lee",
    "Thompson", "White", "Harris", "Clark", "Lewis", "Walker", "Young", "King", "Nguyen", "Patel",
];

/// (city, state, country)
const CITIES: &[(&str, &str, &str)] = &[
    ("New York", "NY", "USA"),
    ("Los Angeles", "CA", "USA"),
    ("Chicago", "IL", "USA"),
    ("Houston", "TX", "USA"),
    ("Phoenix", "AZ", "USA"),
    ("Seattle", "WA", "USA"),
    ("Denver", "CO", "USA"),
    ("Boston", "MA", "USA"),
    ("Austin", "TX", "USA"),
    ("Portland", "OR", "USA"),
    ("Toronto", "ON", "Canada"),
    ("Vancouver", "BC", "Canada"),
    ("London", "ENG", "UK"),
    ("Manchester", "ENG", "UK"),
    ("Sydney", "NSW", "Australia"),
];

const MEMBERSHIP_TIERS: &[&str] = &["bronze", "bronze", "bronze", "silver", "silver", "gold", "platinum"];

const ORDER_STATUSES: &[&str] = &[
    "pending",
    "processing",
    "shipped",
    "delivered",
    "delivered",
    "delivered",
    "delivered",
    "cancelled",
];

const PAYMENT_METHODS: &[&str] = &[
    "Credit Card",
    "Debit Card",
    "PayPal",
    "Apple Pay",
    "Google Pay",
    "Bank Transfer",
];

const REVIEW_TITLES: &[&str] = &[
    "Great product!",
    "Exactly what I needed",
    "Good value",
    "Highly recommend",
    "Decent quality",
    "Could be better",
    "Disappointed",
    "Works great",
    "Good but pricey",
    "Will buy again",
];

/// Options for [`bootstrap`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// PRNG seed
    pub seed: u64,
    pub customers: usize,
    pub orders: usize,
    pub reviews: usize,
    /// Replace an existing database file
    pub overwrite: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            customers: 200,
            orders: 1000,
            reviews: 600,
            overwrite: false,
        }
    }
}

/// What the bootstrapper created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// (table, row count) for every sample table
    pub tables: Vec<(String, i64)>,
    /// Number of column tags installed
    pub tags: usize,
}

impl BootstrapReport {
    pub fn row_count(&self, table: &str) -> Option<i64> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, count)| *count)
    }
}

/// Create the sample database file at `path`
///
/// An existing file is an error unless `options.overwrite` is set, in which
/// case the file and its journal side files are deleted first.
pub async fn bootstrap(path: &Path, options: &BootstrapOptions) -> Result<BootstrapReport> {
    if path.exists() {
        if !options.overwrite {
            return Err(AgentError::DatabaseExists(path.to_path_buf()));
        }
        remove_database_files(path)?;
        info!(path = %path.display(), "Removed existing database");
    }

    let db = Database::create(path).await?;
    let report = bootstrap_pool(db.pool(), options).await;
    db.close().await;

    report
}

fn remove_database_files(path: &Path) -> Result<()> {
    let mut side_files = Vec::new();
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        side_files.push(PathBuf::from(name));
    }

    fs::remove_file(path)?;
    for file in side_files {
        match fs::remove_file(&file) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
    }
    Ok(())
}

/// Create and fill the sample tables on an open pool
///
/// Everything runs in one transaction, so a failure leaves no partial data.
pub async fn bootstrap_pool(pool: &SqlitePool, options: &BootstrapOptions) -> Result<BootstrapReport> {
    if options.customers == 0 && (options.orders > 0 || options.reviews > 0) {
        return Err(AgentError::Config(
            "orders and reviews need at least one customer".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let anchor = anchor_date()?;
    let mut tx = pool.begin().await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    debug!("Created sample schema");

    let catalog = insert_catalog(&mut tx, &mut rng).await?;
    let staff = insert_staff(&mut tx, &mut rng, anchor).await?;
    let fulfillment = insert_fulfillment_options(&mut tx).await?;
    let customer_ids = insert_customers(&mut tx, &mut rng, anchor, options.customers).await?;
    let sales = SalesContext {
        customer_ids: &customer_ids,
        employee_ids: &staff,
        catalog: &catalog,
        fulfillment: &fulfillment,
    };
    insert_orders(&mut tx, &mut rng, anchor, &sales, options.orders).await?;
    insert_reviews(&mut tx, &mut rng, anchor, &customer_ids, &catalog, options.reviews).await?;
    insert_inventory_log(&mut tx, &mut rng, anchor, &catalog).await?;

    for statement in DERIVED_UPDATES {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    debug!("Filled derived columns");

    let tags = install_tags(&mut tx).await?;
    tx.commit().await?;

    let mut tables = Vec::with_capacity(SAMPLE_TABLES.len() + 1);
    for table in SAMPLE_TABLES.iter().chain(std::iter::once(&TAGS_TABLE)) {
        let query = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(pool).await?;
        tables.push((table.to_string(), count));
    }

    info!(seed = options.seed, tags, "Bootstrapped sample database");
    Ok(BootstrapReport { tables, tags })
}

/// Fixed "now" so generated dates do not depend on the clock
fn anchor_date() -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2025, 6, 30)
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .ok_or_else(|| AgentError::Internal("invalid anchor date".to_string()))
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pick from a non-empty constant table
fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn weights(values: &[u32]) -> Result<WeightedIndex<u32>> {
    WeightedIndex::new(values).map_err(|e| AgentError::Internal(format!("bad weights: {}", e)))
}

/// Product ids with their list prices
struct Catalog {
    products: Vec<(i64, f64)>,
}

/// Ids of the rows an order can point at
struct FulfillmentOptions {
    shipping_methods: Vec<i64>,
    discount_codes: Vec<i64>,
}

/// Everything an order is generated from
struct SalesContext<'a> {
    customer_ids: &'a [i64],
    employee_ids: &'a [i64],
    catalog: &'a Catalog,
    fulfillment: &'a FulfillmentOptions,
}

async fn insert_catalog(conn: &mut SqliteConnection, rng: &mut StdRng) -> Result<Catalog> {
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let id = sqlx::query("INSERT INTO categories (name, description) VALUES (?1, ?2)")
            .bind(*name)
            .bind(*description)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();
        category_ids.push((*name, id));
    }

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, email, country, rating) in SUPPLIERS {
        let id = sqlx::query(
            "INSERT INTO suppliers (name, email, country, rating) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(*name)
        .bind(*email)
        .bind(*country)
        .bind(*rating)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        supplier_ids.push(id);
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (index, (category, name, brand, price)) in PRODUCTS.iter().enumerate() {
        let category_id = category_ids
            .iter()
            .find(|(cat, _)| cat == category)
            .map(|(_, id)| *id)
            .ok_or_else(|| AgentError::Internal(format!("unknown category {}", category)))?;
        let supplier_id = *pick(rng, &supplier_ids);
        let cost = round2(price * rng.gen_range(0.4..0.7));
        let stock: i64 = rng.gen_range(0..=500);

        let id = sqlx::query(
            r#"INSERT INTO products (sku, name, category_id, supplier_id, brand, price, cost, stock)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(format!("SKU-{:02}-{:04}", category_id, index + 1))
        .bind(*name)
        .bind(category_id)
        .bind(supplier_id)
        .bind(*brand)
        .bind(*price)
        .bind(cost)
        .bind(stock)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        products.push((id, *price));
    }

    debug!(products = products.len(), "Inserted catalog");
    Ok(Catalog { products })
}

/// Departments and employees; returns the employee ids
///
/// Apart from the first few, every employee reports to someone hired earlier.
async fn insert_staff(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    anchor: NaiveDateTime,
) -> Result<Vec<i64>> {
    let mut department_ids = Vec::with_capacity(DEPARTMENTS.len());
    for (name, description) in DEPARTMENTS {
        let budget = rng.gen_range(50_000i64..=500_000) as f64;
        let id = sqlx::query("INSERT INTO departments (name, description, budget) VALUES (?1, ?2, ?3)")
            .bind(*name)
            .bind(*description)
            .bind(budget)
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();
        department_ids.push((*name, id));
    }

    let mut ids: Vec<i64> = Vec::with_capacity(EMPLOYEE_COUNT);
    for i in 0..EMPLOYEE_COUNT {
        let first_name = *pick(rng, FIRST_NAMES);
        let last_name = *pick(rng, LAST_NAMES);
        let (department, department_id) = *pick(rng, &department_ids);
        let manager_id = if i < TOP_LEVEL_EMPLOYEES {
            None
        } else {
            Some(*pick(rng, &ids))
        };
        let hired = anchor - Duration::days(rng.gen_range(0..5 * 365));
        let salary = round2(rng.gen_range(35_000.0..150_000.0));
        let commission_pct = if department == "Sales" {
            round2(rng.gen_range(0.0..0.15))
        } else {
            0.0
        };

        let id = sqlx::query(
            r#"INSERT INTO employees
               (first_name, last_name, email, department_id, manager_id, hire_date, salary, commission_pct)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(format!(
            "{}.{}{}@shop.example",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            i
        ))
        .bind(department_id)
        .bind(manager_id)
        .bind(hired.format("%Y-%m-%d").to_string())
        .bind(salary)
        .bind(commission_pct)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        ids.push(id);
    }

    debug!(departments = department_ids.len(), employees = ids.len(), "Inserted staff");
    Ok(ids)
}

async fn insert_fulfillment_options(conn: &mut SqliteConnection) -> Result<FulfillmentOptions> {
    let mut shipping_methods = Vec::with_capacity(SHIPPING_METHODS.len());
    for (name, price, min_days, max_days) in SHIPPING_METHODS {
        let id = sqlx::query(
            "INSERT INTO shipping_methods (name, price, min_days, max_days) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(*name)
        .bind(*price)
        .bind(*min_days)
        .bind(*max_days)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        shipping_methods.push(id);
    }

    let mut discount_codes = Vec::with_capacity(DISCOUNT_CODES.len());
    for (code, value, kind, valid_from, valid_until, minimum_order) in DISCOUNT_CODES {
        let id = sqlx::query(
            r#"INSERT INTO discount_codes
               (code, discount_value, discount_type, valid_from, valid_until, minimum_order)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(*code)
        .bind(*value)
        .bind(*kind)
        .bind(*valid_from)
        .bind(*valid_until)
        .bind(*minimum_order)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        discount_codes.push(id);
    }

    Ok(FulfillmentOptions {
        shipping_methods,
        discount_codes,
    })
}

async fn insert_customers(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    anchor: NaiveDateTime,
    count: usize,
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let first_name = *pick(rng, FIRST_NAMES);
        let last_name = *pick(rng, LAST_NAMES);
        let (city, state, country) = *pick(rng, CITIES);
        let tier = *pick(rng, MEMBERSHIP_TIERS);
        let created = anchor - Duration::days(rng.gen_range(0..730));

        let id = sqlx::query(
            r#"INSERT INTO customers
               (first_name, last_name, email, city, state, country, membership_tier, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(first_name)
        .bind(last_name)
        .bind(format!(
            "{}.{}{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            i
        ))
        .bind(city)
        .bind(state)
        .bind(country)
        .bind(tier)
        .bind(format_timestamp(created))
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        ids.push(id);
    }

    debug!(customers = ids.len(), "Inserted customers");
    Ok(ids)
}

async fn insert_orders(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    anchor: NaiveDateTime,
    sales: &SalesContext<'_>,
    count: usize,
) -> Result<()> {
    let line_counts = [1usize, 2, 3, 4, 5, 6];
    let line_weights = weights(&[20, 35, 25, 12, 5, 3])?;
    let quantity_weights = weights(&[50, 30, 12, 5, 3])?;
    let discounts = [0.0, 0.0, 0.0, 0.0, 0.05, 0.10, 0.15];

    let mut items = 0usize;
    for i in 0..count {
        let customer_id = *pick(rng, sales.customer_ids);
        let placed = anchor
            - Duration::days(rng.gen_range(0..730))
            - Duration::hours(rng.gen_range(0..24))
            - Duration::minutes(rng.gen_range(0..60));
        // About 30% of orders are placed online without a sales rep
        let employee_id = if rng.gen_bool(0.7) {
            Some(*pick(rng, sales.employee_ids))
        } else {
            None
        };
        let shipping_method_id = *pick(rng, &sales.fulfillment.shipping_methods);
        let discount_code_id = if rng.gen_bool(0.2) {
            Some(*pick(rng, &sales.fulfillment.discount_codes))
        } else {
            None
        };

        let order_id = sqlx::query(
            r#"INSERT INTO orders
               (order_number, customer_id, employee_id, order_date, status, payment_method,
                shipping_method_id, discount_code_id)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(format!("ORD-{}", 100_000 + i))
        .bind(customer_id)
        .bind(employee_id)
        .bind(format_timestamp(placed))
        .bind(*pick(rng, ORDER_STATUSES))
        .bind(*pick(rng, PAYMENT_METHODS))
        .bind(shipping_method_id)
        .bind(discount_code_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        let lines = line_counts[line_weights.sample(rng)];
        let chosen: Vec<(i64, f64)> = sales
            .catalog
            .products
            .choose_multiple(rng, lines)
            .copied()
            .collect();

        for (product_id, unit_price) in chosen {
            let quantity = quantity_weights.sample(rng) as i64 + 1;
            let discount_pct: f64 = *pick(rng, &discounts);
            let line_total = round2(quantity as f64 * unit_price * (1.0 - discount_pct));

            sqlx::query(
                r#"INSERT INTO order_items
                   (order_id, product_id, quantity, unit_price, discount_pct, line_total)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(discount_pct)
            .bind(line_total)
            .execute(&mut *conn)
            .await?;
            items += 1;
        }
    }

    debug!(orders = count, items, "Inserted orders");
    Ok(())
}

async fn insert_reviews(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    anchor: NaiveDateTime,
    customer_ids: &[i64],
    catalog: &Catalog,
    count: usize,
) -> Result<()> {
    let rating_weights = weights(&[5, 8, 15, 35, 37])?;

    for _ in 0..count {
        let (product_id, _) = *pick(rng, &catalog.products);
        let customer_id = *pick(rng, customer_ids);
        let rating = rating_weights.sample(rng) as i64 + 1;
        let created = anchor - Duration::days(rng.gen_range(0..365));

        sqlx::query(
            r#"INSERT INTO reviews (product_id, customer_id, rating, title, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(product_id)
        .bind(customer_id)
        .bind(rating)
        .bind(*pick(rng, REVIEW_TITLES))
        .bind(format_timestamp(created))
        .execute(&mut *conn)
        .await?;
    }

    debug!(reviews = count, "Inserted reviews");
    Ok(())
}

/// Stock movements per product, oldest first
async fn insert_inventory_log(
    conn: &mut SqliteConnection,
    rng: &mut StdRng,
    anchor: NaiveDateTime,
    catalog: &Catalog,
) -> Result<()> {
    let mut entries = 0usize;
    for (product_id, _) in &catalog.products {
        let mut days_ago: Vec<i64> = (0..rng.gen_range(5..=20))
            .map(|_| rng.gen_range(0..365))
            .collect();
        days_ago.sort_unstable_by(|a, b| b.cmp(a));

        let mut on_hand: i64 = rng.gen_range(100..=500);
        for days in days_ago {
            let (change_type, change) = if rng.gen_bool(0.4) {
                ("sale", -rng.gen_range(1i64..=10))
            } else {
                ("restock", rng.gen_range(20i64..=100))
            };
            on_hand = (on_hand + change).max(0);

            sqlx::query(
                r#"INSERT INTO inventory_log
                   (product_id, change_type, quantity_change, quantity_after, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
            )
            .bind(*product_id)
            .bind(change_type)
            .bind(change)
            .bind(on_hand)
            .bind(format_timestamp(anchor - Duration::days(days)))
            .execute(&mut *conn)
            .await?;
            entries += 1;
        }
    }

    debug!(entries, "Inserted inventory log");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_categories_exist() {
        for (category, name, _, _) in PRODUCTS {
            assert!(
                CATEGORIES.iter().any(|(c, _)| c == category),
                "{} has unknown category {}",
                name,
                category
            );
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.005_1), 10.01);
        assert_eq!(round2(59.98), 59.98);
    }

    #[tokio::test]
    async fn test_orders_need_customers() {
        let db = Database::in_memory().await.unwrap();
        let options = BootstrapOptions {
            customers: 0,
            ..BootstrapOptions::default()
        };
        let err = bootstrap_pool(db.pool(), &options).await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[tokio::test]
    async fn test_derived_totals() {
        let db = Database::in_memory().await.unwrap();
        let options = BootstrapOptions {
            customers: 10,
            orders: 40,
            reviews: 30,
            ..BootstrapOptions::default()
        };
        bootstrap_pool(db.pool(), &options).await.unwrap();

        let mismatched = db
            .run_query(
                r#"SELECT COUNT(*) FROM orders o
                   WHERE ABS(o.subtotal - (SELECT SUM(line_total) FROM order_items i
                                           WHERE i.order_id = o.id)) > 0.01
                      OR ABS(o.total_amount
                             - (o.subtotal + o.shipping_cost + o.tax_amount - o.discount_amount)) > 0.01
                      OR o.shipping_cost IS NULL"#,
            )
            .await
            .unwrap();
        assert_eq!(mismatched.rows[0][0], serde_json::Value::from(0));

        let reviewed = db
            .run_query("SELECT SUM(review_count) FROM products")
            .await
            .unwrap();
        assert_eq!(reviewed.rows[0][0], serde_json::Value::from(30));

        let usage = db
            .run_query(
                r#"SELECT COUNT(*) FROM discount_codes d
                   WHERE d.usage_count != (SELECT COUNT(*) FROM orders o
                                           WHERE o.discount_code_id = d.id)"#,
            )
            .await
            .unwrap();
        assert_eq!(usage.rows[0][0], serde_json::Value::from(0));
    }

    #[tokio::test]
    async fn test_employee_hierarchy() {
        let db = Database::in_memory().await.unwrap();
        let options = BootstrapOptions {
            customers: 5,
            orders: 10,
            reviews: 5,
            ..BootstrapOptions::default()
        };
        bootstrap_pool(db.pool(), &options).await.unwrap();

        let top_level = db
            .run_query("SELECT COUNT(*) FROM employees WHERE manager_id IS NULL")
            .await
            .unwrap();
        assert_eq!(
            top_level.rows[0][0],
            serde_json::Value::from(TOP_LEVEL_EMPLOYEES as i64)
        );

        // Managers are always hired into the table before their reports
        let later_managers = db
            .run_query("SELECT COUNT(*) FROM employees WHERE manager_id >= id")
            .await
            .unwrap();
        assert_eq!(later_managers.rows[0][0], serde_json::Value::from(0));
    }
}
