//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant menu and tax rules, then
//! prints a sample order quote.
//!
//! ## Usage
//! ```bash
//! # Seed ./tavola_dev.db and quote an order as of now
//! cargo run -p tavola-db --bin seed
//!
//! # Quote the same order before the FOOD rate change
//! cargo run -p tavola-db --bin seed -- --as-of 2022-06-01
//!
//! # Specify database path, with resolver debug logs
//! RUST_LOG=tavola=debug cargo run -p tavola-db --bin seed -- --db ./data/tavola.db
//! ```
//!
//! ## Seeded Rules
//! ```text
//! FOOD      12%  from 2022-01-01
//! FOOD      18%  from 2023-01-01
//! ALCOHOL   25%  from 2022-01-01
//! BEVERAGE   5%  from 2022-01-01
//! DESSERT   (no rules: unconfigured)
//! ```

use std::env;

use chrono::{DateTime, TimeZone, Utc};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use tavola_core::validation::parse_as_of;
use tavola_core::{Product, TaxCategory, TaxRate, TaxRule, TaxableLineItem};
use tavola_db::{Database, TavolaConfig};

/// (sku, name, price_cents, category)
const MENU: &[(&str, &str, i64, Option<&str>)] = &[
    ("STEAK-01", "Ribeye Steak", 8475, Some("FOOD")),
    ("BURGER-01", "House Burger", 2400, Some("FOOD")),
    ("FRIES-01", "Hand-cut Fries", 1500, Some("FOOD")),
    ("SALAD-01", "Caesar Salad", 1350, Some("FOOD")),
    ("WINE-01", "House Red (glass)", 900, Some("ALCOHOL")),
    ("BEER-01", "Draft Lager", 700, Some("ALCOHOL")),
    ("SODA-01", "Cola", 350, Some("BEVERAGE")),
    ("CAKE-01", "Chocolate Cake", 950, Some("DESSERT")),
    ("WATER-01", "Tap Water", 0, None),
    ("BREAD-01", "Bread Basket", 400, None),
];

/// (category, whole percent, effective year)
const RULES: &[(&str, u32, i32)] = &[
    ("FOOD", 12, 2022),
    ("FOOD", 18, 2023),
    ("ALCOHOL", 25, 2022),
    ("BEVERAGE", 5, 2022),
];

/// SKUs of the quoted sample order.
const SAMPLE_ORDER: &[&str] = &["STEAK-01", "BURGER-01", "FRIES-01", "WINE-01", "CAKE-01", "WATER-01"];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tavola=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

fn january_first(year: i32) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| format!("invalid year {year}").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = TavolaConfig::load()?;
    if env::var("TAVOLA_DB_PATH").is_err() {
        config.database_path = "./tavola_dev.db".into();
    }
    let mut as_of: Option<DateTime<Utc>> = None;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--as-of" | "-a" => {
                if i + 1 < args.len() {
                    as_of = Some(parse_as_of(&args[i + 1])?);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tavola Tax Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./tavola_dev.db)");
                println!("  -a, --as-of <DATE>   Quote date, YYYY-MM-DD or RFC 3339 (default: now)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {other}");
            }
        }
        i += 1;
    }

    println!("🌱 Tavola Tax Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database_path.display());
    println!("Rounding: {}", config.rounding);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed; quoting against existing data.");
    } else {
        seed(&db).await?;
    }

    quote(&db, &config, as_of).await?;

    db.close().await;
    Ok(())
}

async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("Seeding menu...");
    let products = db.products();
    for (sku, name, price_cents, category) in MENU {
        let category = category.map(TaxCategory::new).transpose()?;
        let product = Product::new(*sku, *name, *price_cents, category);
        if let Err(e) = products.insert(&product).await {
            eprintln!("Failed to insert {}: {}", sku, e);
        }
    }
    println!("✓ {} menu items", products.count().await?);

    println!("Seeding tax rules...");
    let rules = db.tax_rules();
    for (category, percent, year) in RULES {
        let rule = TaxRule::new(
            TaxCategory::new(category)?,
            TaxRate::from_whole_percent(*percent),
            january_first(*year)?,
        );
        if let Err(e) = rules.insert(&rule).await {
            eprintln!("Failed to insert {} rule: {}", category, e);
        }
    }
    println!("✓ {} tax rules", rules.count().await?);
    Ok(())
}

async fn quote(
    db: &Database,
    config: &TavolaConfig,
    as_of: Option<DateTime<Utc>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let products = db.products();
    let mut names = Vec::new();
    let mut items = Vec::new();
    for sku in SAMPLE_ORDER {
        match products.get_by_sku(sku).await? {
            Some(product) => {
                items.push(TaxableLineItem::new(product.id.clone(), product.price_cents));
                names.push(product.name);
            }
            None => eprintln!("Sample item {} missing, skipped", sku),
        }
    }

    let result = db.order_tax(config.rounding).compute(&items, as_of).await?;

    println!();
    println!("Sample order as of {}", result.as_of.format("%Y-%m-%d %H:%M UTC"));
    println!("{:-<60}", "");
    for (name, line) in names.iter().zip(&result.lines) {
        println!(
            "  {:<22} {:>9}  {:>7}  tax {:>7}",
            name,
            tavola_core::Money::from_cents(line.price_cents).to_string(),
            line.rate.to_string(),
            tavola_core::Money::from_cents(line.tax_cents).to_string(),
        );
    }
    println!("{:-<60}", "");
    println!("  Total tax: {}", result.total());

    let unconfigured: Vec<_> = result.unconfigured_lines().collect();
    if !unconfigured.is_empty() {
        println!();
        println!("⚠ {} line(s) have a category with no rule in force", unconfigured.len());
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
