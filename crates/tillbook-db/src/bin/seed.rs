//! # Seed Data Generator
//!
//! Populates a database with products, a till, and a run of sales pushed
//! through the sale engine, so every ledger has realistic rows.
//!
//! ## Usage
//! ```bash
//! # 200 products and 25 sales into the configured database
//! cargo run -p tillbook-db --bin seed
//!
//! # Custom amounts
//! cargo run -p tillbook-db --bin seed -- --count 1000 --sales 100
//!
//! # Specify database path
//! cargo run -p tillbook-db --bin seed -- --db ./data/tillbook.db
//! ```
//!
//! ## Generated Sales
//! ```text
//! every 5th sale   QUOTE, later converted to PAID through update_payment_status
//! every 3rd sale   PARTIAL, half paid into the till
//! others           PAID in full into the till
//! ```

use std::env;
use std::path::PathBuf;

use tillbook_core::{Discount, Money, PaymentStatus, Product, SaleInput, SaleItemInput, SaleSource};
use tillbook_db::{Database, DbConfig, DbError, NewProduct, TillbookConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BRANCH_ID: &str = "branch-main";
const SEED_USER: &str = "seed";

/// Product families for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "GRC",
        &[
            "Basmati Rice",
            "Wheat Flour",
            "Sugar",
            "Red Lentils",
            "Chickpeas",
            "Cooking Oil",
            "Salt",
            "Black Tea",
        ],
    ),
    (
        "BEV",
        &[
            "Mineral Water",
            "Orange Juice",
            "Cola",
            "Mango Nectar",
            "Ground Coffee",
        ],
    ),
    (
        "HHD",
        &[
            "Dish Soap",
            "Laundry Powder",
            "Bleach",
            "Paper Towels",
            "Trash Bags",
        ],
    ),
];

/// Pack sizes with the price added on top of the base price (cents)
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Medium", 250), ("Large", 600), ("Family", 1_200)];

/// Sales tax in basis points
const TAX_RATE_BPS: u32 = 1_800;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillbook=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut sales: usize = 25;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -s, --sales <N>    Number of sales to record (default: 25)");
                println!("  -d, --db <PATH>    Database file path (default: from tillbook.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = TillbookConfig::load(None)?;
    let db_config = match db_path {
        Some(path) => DbConfig::new(path).max_connections(config.database.max_connections),
        None => DbConfig::from_settings(&config.database),
    };

    println!("Tillbook Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_config.database_path.display());
    println!("Products: {}", count);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(db_config).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let till = db
        .cash_accounts()
        .create(BRANCH_ID, "Till 1", Money::from_cents(50_000), SEED_USER)
        .await?;
    println!("✓ Cash account '{}' opened with {}", till.name, till.balance());

    // Products
    let start = std::time::Instant::now();
    let mut products: Vec<Product> = Vec::with_capacity(count);

    'outer: for (category_idx, (category_code, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if products.len() >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 20 + size_idx;
                match db.products().create(generate_product(category_code, name, size, *price_addon, seed), SEED_USER).await {
                    Ok(product) => products.push(product),
                    Err(err) => warn!(error = %err, "Skipping product"),
                }
            }
        }
    }

    println!("✓ Generated {} products in {:?}", products.len(), start.elapsed());

    if products.is_empty() {
        return Ok(());
    }

    // Sales
    let engine = db.engine(config.engine);
    let mut recorded = 0;
    let mut rejected = 0;

    for n in 0..sales {
        let input = generate_sale(&products, &till.id, n);

        match engine.create(input, SEED_USER, BRANCH_ID).await {
            Ok(detail) => {
                recorded += 1;

                if detail.sale.payment_status == PaymentStatus::Quote {
                    let converted = engine
                        .update_payment_status(
                            &detail.sale.id,
                            PaymentStatus::Paid,
                            detail.sale.total_cents,
                            SEED_USER,
                        )
                        .await;
                    if let Err(err) = converted {
                        warn!(sale_number = %detail.sale.sale_number, error = %err, "Quote left unconverted");
                    }
                }
            }
            Err(DbError::Domain(err)) => {
                rejected += 1;
                info!(reason = %err, "Sale rejected");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let till = db
        .cash_accounts()
        .get_by_id(&till.id)
        .await?
        .ok_or_else(|| DbError::not_found("CashAccount", &till.id))?;

    println!("✓ Recorded {} sales ({} rejected)", recorded, rejected);
    println!("  Till balance: {}", till.balance());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one product with deterministic, realistic-looking data.
fn generate_product(category: &str, name: &str, size: &str, price_addon: i64, seed: usize) -> NewProduct {
    let code: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    // base 1.99 - 9.99 plus size addon
    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;
    // cost 60-80% of price
    let cost_cents = price_cents * (60 + (seed % 20) as i64) / 100;

    NewProduct {
        branch_id: BRANCH_ID.to_string(),
        sku: format!("{}-{}-{:03}", category, code, seed),
        name: format!("{} {}", name, size),
        price_cents,
        cost_cents,
        initial_stock: 20 + (seed % 81) as i64,
        allow_negative_stock: false,
    }
}

/// Builds the `n`th demo sale: one to three lines over the product list.
fn generate_sale(products: &[Product], till_id: &str, n: usize) -> SaleInput {
    let lines = 1 + n % 3;
    let items: Vec<SaleItemInput> = (0..lines)
        .map(|line| {
            let product = &products[(n * 7 + line * 13) % products.len()];
            SaleItemInput {
                product_id: Some(product.id.clone()),
                product_name: product.name.clone(),
                sku: Some(product.sku.clone()),
                quantity: 1 + ((n + line) % 4) as i64,
                unit_cost_cents: product.cost_cents,
                selling_price_cents: product.price_cents,
                discount: if line == 0 && n % 4 == 0 {
                    Discount::percentage(500)
                } else {
                    Discount::none()
                },
            }
        })
        .collect();

    let mut input = SaleInput {
        customer: Default::default(),
        source: if n % 2 == 0 { SaleSource::Pos } else { SaleSource::WalkIn },
        date: None,
        items,
        discount: Discount::none(),
        tax_rate_bps: TAX_RATE_BPS,
        payment_status: PaymentStatus::Paid,
        amount_paid_cents: 0,
        cash_account_id: Some(till_id.to_string()),
        notes: None,
    };

    let total = tillbook_core::calculator::calculate_input(&input).totals.total.cents();

    if n % 5 == 0 {
        input.payment_status = PaymentStatus::Quote;
    } else if n % 3 == 0 {
        input.payment_status = PaymentStatus::Partial;
        input.amount_paid_cents = total / 2;
    } else {
        input.amount_paid_cents = total;
    }

    input
}
