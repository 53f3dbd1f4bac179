//! # Seed Data Generator
//!
//! Populates a database with demo locations and products for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockcount_dev.db with 200 products (default)
//! cargo run -p stockcount-db --bin seed
//!
//! # Custom amount / path / company
//! cargo run -p stockcount-db --bin seed -- --count 1000 --db ./data/stockcount.db
//! ```
//!
//! Products get a barcode in the `789` EAN-13 prefix range so they can be
//! scanned from printed test labels. Every tenth product has no barcode,
//! which exercises the unknown-barcode flow.

use chrono::Utc;
use std::env;
use stockcount_core::{Location, LocationType, Product, ProductDraft, DEFAULT_COMPANY_ID};
use stockcount_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Demo counting sites.
const LOCATIONS: &[(&str, LocationType)] = &[
    ("Main Store", LocationType::Store),
    ("Downtown Store", LocationType::Store),
    ("Central Warehouse", LocationType::Warehouse),
    ("Returns Cage", LocationType::Other),
];

/// Product families and their unit label.
const FAMILIES: &[(&str, &str, &[&str])] = &[
    ("BEV", "un", &["Mineral Water", "Orange Juice", "Cola", "Iced Tea", "Coffee Beans"]),
    ("GRO", "un", &["Rice", "Black Beans", "Pasta", "Olive Oil", "Sugar"]),
    ("BLK", "kg", &["Flour", "Oats", "Lentils", "Cornmeal"]),
    ("HYG", "un", &["Soap Bar", "Toothpaste", "Shampoo", "Paper Towels"]),
    ("BOX", "box", &["Tea Bags", "Matches", "Napkins"]),
];

const SIZES: &[&str] = &["Small", "Medium", "Large", "Family"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockcount_dev.db");
    let mut company_id = String::from(DEFAULT_COMPANY_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--company" => {
                if i + 1 < args.len() {
                    company_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockCount Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>      Database file path (default: ./stockcount_dev.db)");
                println!("      --company <ID>   Company id (default: {DEFAULT_COMPANY_ID})");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, products = count, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let device_id = db.device().device_id().await?;
    info!(device_id = %device_id, "Database ready");

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    for (name, location_type) in LOCATIONS {
        let now = Utc::now();
        db.locations()
            .upsert(&Location {
                id: Uuid::new_v4().to_string(),
                company_id: company_id.clone(),
                name: name.to_string(),
                location_type: *location_type,
                active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }
    info!(locations = LOCATIONS.len(), "Locations created");

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (family_idx, (code, unit, names)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (size_idx, size) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = family_idx * 1000 + name_idx * 20 + size_idx;
                let product = generate_product(&company_id, code, unit, name, size, seed);

                if let Err(e) = db.products().insert(&product).await {
                    warn!(name = %product.name, error = %e, "Failed to insert product");
                    continue;
                }
                generated += 1;
            }
        }
    }

    info!(
        generated,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    Ok(())
}

/// Builds one demo product.
fn generate_product(
    company_id: &str,
    code: &str,
    unit: &str,
    name: &str,
    size: &str,
    seed: usize,
) -> Product {
    let barcode = if seed % 10 == 9 {
        None
    } else {
        Some(format!("789{:010}", seed))
    };

    Product::from_draft(
        ProductDraft {
            name: format!("{name} {size}"),
            barcode,
            sku: Some(format!("{code}-{seed:04}")),
            unit: Some(unit.to_string()),
            price: Some(1.99 + ((seed * 17) % 800) as f64 / 100.0),
        },
        company_id,
    )
}
