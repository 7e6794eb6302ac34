//! # Kassa Checkout Entry Point
//!
//! Opens the configured database and prints the caller's active cart as
//! JSON. Useful for checking a register's setup from a terminal.
//!
//! ## Usage
//! ```bash
//! kassa-checkout --user u-1 --register REG-1
//! kassa-checkout --user u-1 --branch main --role manager
//! KASSA_DB_PATH=./kassa_dev.db kassa-checkout --user u-1 --register REG-3
//! ```

use std::env;

use tracing::info;

use kassa_checkout::{open_database, CartService, CheckoutConfig};
use kassa_core::Session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    kassa_checkout::telemetry::init_tracing();

    let mut session = Session {
        user_id: String::new(),
        role: "cashier".to_string(),
        register_id: None,
        branch_id: None,
    };

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match (args[i].as_str(), value) {
            ("--user" | "-u", Some(v)) => session.user_id = v,
            ("--role", Some(v)) => session.role = v,
            ("--register" | "-r", Some(v)) => session.register_id = Some(v),
            ("--branch" | "-b", Some(v)) => session.branch_id = Some(v),
            ("--help" | "-h", _) => {
                println!("Kassa Checkout");
                println!();
                println!("Usage: kassa-checkout --user <ID> [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --user <ID>        Signed-in user");
                println!("      --role <NAME>      Role name (default: cashier)");
                println!("  -r, --register <ID>    Register the user is signed in at");
                println!("  -b, --branch <ID>      Branch assignment when no register is known");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            (flag, _) => return Err(format!("Unknown or incomplete option: {}", flag).into()),
        }
        i += 2;
    }

    if session.user_id.is_empty() {
        return Err("--user is required".into());
    }

    let config = CheckoutConfig::from_env()?;
    let db = open_database(&config).await?;
    info!("Database connected and migrations applied");

    let carts = CartService::new(db, &config);
    let view = carts.get_or_create_active_cart(&session).await?;

    println!("{}", serde_json::to_string_pretty(&view)?);
    println!(
        "Total: {} ({} lines)",
        config.format_currency(view.totals.total_cents),
        view.totals.item_count
    );

    Ok(())
}
