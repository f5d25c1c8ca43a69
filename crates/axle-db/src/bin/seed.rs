//! # Seed Data Generator
//!
//! Populates a development database with a realistic auto-parts
//! catalog plus a couple of customers.
//!
//! ## Usage
//! ```bash
//! # Default catalog into ./axle_dev.db
//! cargo run -p axle-db --bin seed
//!
//! # Custom size and path
//! cargo run -p axle-db --bin seed -- --count 200 --db ./data/axle.db
//! ```
//!
//! ## Generated Products
//! Parts across five categories (brakes, filters, electrical,
//! lubricants, suspension), each with:
//! - Unique SKU: `{CATEGORY}-{BRAND}-{INDEX}` (uppercase-normalized)
//! - Deterministic price and purchase cost (same seed, same catalog)
//! - Stock 0-60 units, a handful on standing discount

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use axle_core::{validation, Customer, Product};
use axle_db::{Database, DbConfig};

/// Part families for realistic test data: `(category code, parts)`.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BRK",
        &[
            "Ceramic Brake Pad Set",
            "Semi-Metallic Brake Pad Set",
            "Front Brake Disc",
            "Rear Brake Disc",
            "Brake Caliper",
            "Brake Hose",
            "Handbrake Cable",
            "Brake Fluid DOT4 1L",
        ],
    ),
    (
        "FLT",
        &[
            "Oil Filter",
            "Air Filter",
            "Cabin Filter",
            "Fuel Filter",
            "Transmission Filter",
        ],
    ),
    (
        "ELC",
        &[
            "Alternator 90A",
            "Starter Motor",
            "Spark Plug",
            "Glow Plug",
            "Ignition Coil",
            "Battery 60Ah",
            "Battery 74Ah",
            "Headlight Bulb H7",
            "Oxygen Sensor",
        ],
    ),
    (
        "LUB",
        &[
            "Engine Oil 5W30 5L",
            "Engine Oil 10W40 5L",
            "Gear Oil 75W90 1L",
            "Coolant Concentrate 5L",
            "Power Steering Fluid 1L",
        ],
    ),
    (
        "SUS",
        &[
            "Front Shock Absorber",
            "Rear Shock Absorber",
            "Coil Spring",
            "Control Arm",
            "Stabilizer Link",
            "Ball Joint",
            "Wheel Bearing Kit",
        ],
    ),
];

const BRANDS: &[&str] = &["BOSCH", "BREMBO", "MANN", "SACHS", "NGK", "MONROE"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 150;
    let mut db_path = String::from("./axle_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(150);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Axle POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 150)");
                println!("  -d, --db <PATH>    Database file path (default: ./axle_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Axle POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category, parts) in CATEGORIES {
        for part in *parts {
            for (brand_idx, brand) in BRANDS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(category, part, brand, generated + brand_idx);
                if let Err(e) = db.products().insert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }
                generated += 1;
            }
        }
    }

    for name in ["Garage Lemaire", "Taller Ruiz", "Fleet Services Ltd"] {
        let now = Utc::now();
        db.customers()
            .insert(&Customer {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                phone: None,
                total_purchases_cents: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products and 3 customers in {:?}", generated, elapsed);

    let low = db.products().list_low_stock().await?;
    println!("  {} products start below their reorder threshold", low.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product. Deterministic in `seed` so repeated
/// runs against a fresh file produce the same catalog.
fn generate_product(category: &str, name: &str, brand: &str, seed: usize) -> Product {
    let now = Utc::now();

    let sku = validation::validate_sku(&format!("{}-{}-{:03}", category, brand, seed))
        .expect("generated SKUs are well-formed");

    // $8.99 - $189.99 depending on the part
    let selling_price_cents = 899 + ((seed * 3571) % 18100) as i64;
    // Margin 35-55%
    let purchase_price_cents = selling_price_cents * (45 + (seed % 20) as i64) / 100;

    // Every ninth part is on clearance
    let discount_bps = if seed % 9 == 0 { 1000 } else { 0 };

    Product {
        id: Uuid::new_v4().to_string(),
        sku,
        name: format!("{} {}", brand, name),
        brand: Some(brand.to_string()),
        description: None,
        purchase_price_cents,
        selling_price_cents,
        discount_bps,
        stock: ((seed * 7) % 61) as i64,
        defective_stock: 0,
        low_stock_threshold: 5,
        sold_count: 0,
        is_archived: false,
        created_at: now,
        updated_at: now,
    }
}
