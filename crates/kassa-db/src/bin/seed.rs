//! # Seed Data Generator
//!
//! Populates a development database with registers, a small catalog,
//! customers and one discount of each kind.
//!
//! ## Usage
//! ```bash
//! cargo run -p kassa-db --bin seed
//! cargo run -p kassa-db --bin seed -- --db ./data/kassa.db
//! ```
//!
//! ## Generated Data
//! - Registers `REG-1`, `REG-2` at branch `main`, `REG-3` at branch `airport`
//! - Products per category (`drinks`, `snacks`, `dairy`), ids `{CAT}-{NN}`
//! - Two customers
//! - Discounts `SAVE10` (10 %, min $50), `FIVEOFF` ($5), `3FOR2` (buy 2 get 1
//!   on drinks), `AIRPORT15` (15 % on snacks, airport only)

use std::env;

use chrono::Utc;
use kassa_core::{
    AppliesTo, CreateDiscountRequest, Customer, DiscountRule, Product,
};
use kassa_db::{Database, DbConfig, Register};

/// Catalog for realistic test data: (category, id prefix, names)
const CATALOG: &[(&str, &str, &[&str])] = &[
    (
        "drinks",
        "DRK",
        &[
            "Coca-Cola 330ml",
            "Sprite 330ml",
            "Still Water 500ml",
            "Orange Juice 1L",
            "Iced Tea 500ml",
            "Cold Brew Coffee",
        ],
    ),
    (
        "snacks",
        "SNK",
        &[
            "Salted Chips",
            "Paprika Chips",
            "Pretzels",
            "Chocolate Bar",
            "Gummy Bears",
            "Trail Mix",
        ],
    ),
    (
        "dairy",
        "DRY",
        &[
            "Whole Milk 1L",
            "Oat Milk 1L",
            "Greek Yogurt",
            "Cheddar Slices",
            "Butter 250g",
        ],
    ),
];

/// Tax rates in basis points
const TAX_RATES: &[u32] = &[0, 500, 825, 1000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kassa_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kassa Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kassa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kassa Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (id, name, branch_id) in [
        ("REG-1", "Front counter", "main"),
        ("REG-2", "Express lane", "main"),
        ("REG-3", "Gate B kiosk", "airport"),
    ] {
        db.registers()
            .upsert(&Register {
                id: id.to_string(),
                name: name.to_string(),
                branch_id: branch_id.to_string(),
            })
            .await?;
    }
    println!("✓ 3 registers");

    let mut generated = 0;
    for (category_idx, (category, prefix, names)) in CATALOG.iter().enumerate() {
        for (product_idx, name) in names.iter().enumerate() {
            let product = generate_product(category, prefix, name, category_idx * 100 + product_idx);
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.id, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ {} products", generated);

    for (id, name, email) in [
        ("CUST-1", "Ada Lovelace", Some("ada@example.com")),
        ("CUST-2", "Grace Hopper", None),
    ] {
        db.customers()
            .insert(&Customer {
                id: id.to_string(),
                name: name.to_string(),
                email: email.map(str::to_string),
                phone: None,
            })
            .await?;
    }
    println!("✓ 2 customers");

    let drinks: Vec<String> = CATALOG[0]
        .2
        .iter()
        .enumerate()
        .map(|(idx, _)| format!("{}-{:02}", CATALOG[0].1, idx + 1))
        .collect();

    let discounts = [
        discount("Ten percent over fifty", "SAVE10", DiscountRule::Percentage { rate_bps: 1000 })
            .min_purchase(5000),
        discount("Five off", "FIVEOFF", DiscountRule::Fixed { amount_cents: 500 }),
        discount(
            "Three for two drinks",
            "3FOR2",
            DiscountRule::BuyXGetY {
                buy_quantity: 2,
                get_quantity: 1,
                reward_bps: 10000,
            },
        )
        .products(drinks),
        discount("Airport snacks", "AIRPORT15", DiscountRule::Percentage { rate_bps: 1500 })
            .categories(&["snacks"])
            .branch("airport"),
    ];

    let now = Utc::now();
    for request in discounts {
        let policy = request.into_policy(now)?;
        db.discounts().insert(&policy).await?;
        println!(
            "  {} {:<10} {}",
            policy.kind(),
            policy.code.as_deref().unwrap_or("-"),
            policy.name
        );
    }
    println!("✓ 4 discounts");

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with deterministic price and tax.
fn generate_product(category: &str, prefix: &str, name: &str, seed: usize) -> Product {
    let index = seed % 100 + 1;

    // $0.99 - $8.99
    let price_cents = 99 + ((seed * 37) % 800) as i64;

    Product {
        id: format!("{}-{:02}", prefix, index),
        name: name.to_string(),
        price_cents,
        tax_rate_bps: TAX_RATES[seed % TAX_RATES.len()],
        category_id: Some(category.to_string()),
        is_active: true,
    }
}

fn discount(name: &str, code: &str, rule: DiscountRule) -> CreateDiscountRequest {
    CreateDiscountRequest {
        name: name.to_string(),
        code: Some(code.to_string()),
        rule,
        applies_to: AppliesTo::EntireOrder,
        product_ids: Default::default(),
        category_ids: Default::default(),
        min_purchase_cents: None,
        starts_at: None,
        ends_at: None,
        max_uses: None,
        branch_id: None,
    }
}

/// Builder sugar for the seed list only.
trait SeedDiscount {
    fn min_purchase(self, cents: i64) -> Self;
    fn products(self, ids: Vec<String>) -> Self;
    fn categories(self, ids: &[&str]) -> Self;
    fn branch(self, branch_id: &str) -> Self;
}

impl SeedDiscount for CreateDiscountRequest {
    fn min_purchase(mut self, cents: i64) -> Self {
        self.min_purchase_cents = Some(cents);
        self
    }

    fn products(mut self, ids: Vec<String>) -> Self {
        self.product_ids = ids.into_iter().collect();
        self
    }

    fn categories(mut self, ids: &[&str]) -> Self {
        self.applies_to = AppliesTo::SpecificCategories;
        self.category_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    fn branch(mut self, branch_id: &str) -> Self {
        self.branch_id = Some(branch_id.to_string());
        self
    }
}
