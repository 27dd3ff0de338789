//! # Seed Data Generator
//!
//! Populates the database with sample detailing transactions for development.
//!
//! ## Usage
//! ```bash
//! # Generate 50 transactions (default)
//! cargo run -p ledger-db --bin seed
//!
//! # Generate custom amount into a specific file
//! cargo run -p ledger-db --bin seed -- --count 200 --db ./data/ledger.db
//! ```
//!
//! Each transaction has one service, zero to two add-ons, an occasional
//! discount, a preset tip, and either a single card payment or a card/cash
//! split.

use chrono::Utc;
use std::env;

use ledger_core::allocation::PaymentAllocation;
use ledger_core::draft::{ClientInfo, TransactionDraft};
use ledger_core::totals::{TipPreset, TipSelection};
use ledger_core::{ItemType, Money, PaymentMethod, TaxRate};
use ledger_db::{Database, DbConfig};

/// Detailing packages and their prices in cents.
const SERVICES: &[(&str, i64)] = &[
    ("Exterior Hand Wash", 6_000),
    ("Full Interior Detail", 18_900),
    ("Full Detail Package", 27_500),
    ("Paint Correction (1-step)", 39_900),
    ("Ceramic Coating", 89_900),
];

const ADDONS: &[(&str, i64)] = &[
    ("Pet Hair Removal", 4_000),
    ("Engine Bay Cleaning", 5_000),
    ("Headlight Restoration", 7_500),
    ("Clay Bar Treatment", 6_000),
    ("Odor Elimination", 3_500),
];

const VEHICLES: &[&str] = &[
    "2019 Toyota Tacoma",
    "2021 Tesla Model 3",
    "2016 Honda Odyssey",
    "2023 Ford F-150",
    "2018 Subaru Outback",
];

const TIPS: &[TipSelection] = &[
    TipSelection::NoTip,
    TipSelection::Preset(TipPreset::Fifteen),
    TipSelection::Preset(TipPreset::Twenty),
    TipSelection::Preset(TipPreset::TwentyFive),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./ledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--count" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Detail Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of transactions to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./ledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Detail Ledger Seed Data Generator");
    println!("=================================");
    println!("Database:     {}", db_path);
    println!("Transactions: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.transactions().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} transactions", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let draft = match sample_draft(seed) {
            Ok(draft) => draft,
            Err(e) => {
                eprintln!("Failed to build transaction {}: {}", seed, e);
                continue;
            }
        };

        let tx = draft.finalize(&format!("emp-{}", seed % 4 + 1), Utc::now())?;
        if let Err(e) = db.transactions().insert_finalized(&tx).await {
            eprintln!("Failed to insert {}: {}", tx.receipt_number, e);
            continue;
        }
        generated += 1;
    }

    println!();
    println!("✓ Generated {} transactions in {:?}", generated, start.elapsed());

    Ok(())
}

/// Builds one balanced sample draft.
fn sample_draft(seed: usize) -> ledger_core::CoreResult<TransactionDraft> {
    let mut draft = TransactionDraft::new(TaxRate::from_bps(825));

    let (service, price) = SERVICES[seed % SERVICES.len()];
    draft.add_item(service, Money::from_cents(price), ItemType::Service, 1)?;

    for n in 0..(seed % 3) {
        let (addon, price) = ADDONS[(seed + n) % ADDONS.len()];
        draft.add_item(addon, Money::from_cents(price), ItemType::Addon, 1)?;
    }

    if seed % 5 == 0 {
        draft.add_item("Returning Client", Money::from_cents(2_500), ItemType::Discount, 1)?;
    }

    draft.set_tip(TIPS[seed % TIPS.len()])?;
    draft.set_client(ClientInfo {
        client_id: Some(format!("client-{}", seed % 17)),
        client_name: None,
        vehicle: Some(VEHICLES[seed % VEHICLES.len()].to_string()),
        booking_id: None,
    })?;

    let card = PaymentAllocation::new(PaymentMethod::Card, Money::zero())
        .with_card(format!("{:04}", 1000 + seed % 9000), format!("pi_seed_{seed}"));

    if seed % 2 == 0 {
        draft.set_payments(vec![card])?;
    } else {
        draft.set_payments(vec![card, PaymentAllocation::new(PaymentMethod::Cash, Money::zero())])?;
        draft.auto_distribute();
    }

    Ok(draft)
}
