//! # seed
//!
//! Fills a catalog file with a demo store so the terminal has something to
//! scan against.
//!
//! ```bash
//! cargo run -p scanline-db --bin seed -- --store store-1 --extra 200 --db ./scanline_dev.db
//! ```
//!
//! The fixed shelf below covers the interesting cases: a product with two
//! barcodes, one with a non-EAN shelf label, one out of stock, and one with a
//! single unit. `--extra` appends generated filler products.

use scanline_core::checksum::ean13_check_digit;
use scanline_core::Money;
use scanline_db::{Database, DbConfig, NewProduct};

/// sku, name, price in cents, stock, extra non-EAN label
const SHELF: &[(&str, &str, i64, i64, Option<&str>)] = &[
    ("WTR-500", "Sparkling Water 500ml", 129, 48, None),
    ("WTR-1500", "Still Water 1.5l", 189, 24, None),
    ("CRS-SALT", "Salted Crisps 150g", 249, 12, Some("SHELF-0042")),
    ("CHO-DARK", "Dark Chocolate 100g", 319, 0, None),
    ("TEA-ICED", "Iced Tea Lemon 330ml", 159, 1, None),
    ("BRD-RYE", "Rye Bread 750g", 399, 6, Some("BAKERY-7")),
    ("MLK-OAT", "Oat Milk 1l", 279, 10, None),
    ("EGG-10", "Free Range Eggs x10", 459, 3, None),
];

struct Args {
    db: String,
    store: String,
    extra: usize,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        db: "./scanline_dev.db".into(),
        store: "store-1".into(),
        extra: 0,
    };

    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().ok_or_else(|| format!("{} needs a value", flag));
        match flag.as_str() {
            "-d" | "--db" => args.db = value()?,
            "-s" | "--store" => args.store = value()?,
            "-n" | "--extra" => {
                let raw = value()?;
                args.extra = raw
                    .parse()
                    .map_err(|_| format!("--extra expects a number, got {:?}", raw))?;
            }
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    Ok(Some(args))
}

/// `590` prefix, a running number, and the computed check digit.
fn ean13(n: usize) -> String {
    let body = format!("590{:09}", n % 1_000_000_000);
    let check = ean13_check_digit(&body).unwrap_or(0);
    format!("{}{}", body, check)
}

fn shelf_products(store: &str) -> Vec<NewProduct> {
    SHELF
        .iter()
        .enumerate()
        .map(|(n, &(sku, name, price, stock, label))| {
            let mut barcodes = vec![ean13(n + 1)];
            if sku == "WTR-500" {
                // multipack wrapper carries its own code
                barcodes.push(ean13(900 + n));
            }
            barcodes.extend(label.map(str::to_string));
            NewProduct {
                store_id: store.to_string(),
                sku: sku.to_string(),
                name: name.to_string(),
                buying_price: Money::from_cents(price * 3 / 5),
                selling_price: Money::from_cents(price),
                available_stock: stock,
                barcodes,
            }
        })
        .collect()
}

fn filler_product(store: &str, n: usize) -> NewProduct {
    let price = 99 + ((n * 53) % 1200) as i64;
    NewProduct {
        store_id: store.to_string(),
        sku: format!("GEN-{:05}", n),
        name: format!("Generic Item {}", n),
        buying_price: Money::from_cents(price / 2),
        selling_price: Money::from_cents(price),
        available_stock: if n % 13 == 0 { 0 } else { (n % 30) as i64 + 1 },
        barcodes: vec![ean13(10_000 + n)],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args()? else {
        println!("usage: seed [--db PATH] [--store ID] [--extra N]");
        return Ok(());
    };

    let db = Database::new(DbConfig::new(&args.db)).await?;
    let catalog = db.catalog();

    let existing = catalog.count(&args.store).await?;
    if existing > 0 {
        println!("{} already has {} products in {}, nothing to do", args.store, existing, args.db);
        return Ok(());
    }

    let products = shelf_products(&args.store)
        .into_iter()
        .chain((1..=args.extra).map(|n| filler_product(&args.store, n)));

    let mut inserted = 0usize;
    for product in products {
        match catalog.insert(&product).await {
            Ok(_) => inserted += 1,
            Err(e) => eprintln!("skipped {}: {}", product.sku, e),
        }
    }

    println!("seeded {} products into {} ({})", inserted, args.store, args.db);
    for entry in catalog.fetch_store_catalog(&args.store).await?.iter().take(3) {
        println!("  {:<24} {}", entry.name, entry.barcodes.join(" / "));
    }

    db.close().await;
    Ok(())
}
