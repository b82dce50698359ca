//! # Scanline Terminal
//!
//! Headless scan-to-cart till. Reads barcodes and commands from stdin.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Terminal Startup                                  │
//! │                                                                         │
//! │  1. Initialize logging (tracing)                                        │
//! │     └── RUST_LOG or "info,scanline=debug,sqlx=warn"                     │
//! │                                                                         │
//! │  2. Load configuration                                                  │
//! │     └── scanner.toml, then SCANLINE_* environment overrides             │
//! │                                                                         │
//! │  3. Open catalog database                                               │
//! │     └── Create pool, run migrations                                     │
//! │                                                                         │
//! │  4. Build controller, activate configured store                         │
//! │     └── Catalog refresh, camera start in camera mode                    │
//! │                                                                         │
//! │  5. Read stdin until :quit, EOF or Ctrl-C, then tear down               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod command;
mod console;

use std::sync::Arc;

use anyhow::{Context, Result};
use scanline_db::{Database, DbConfig};
use scanline_runtime::{ScanError, ScannerConfig, ScannerController, SqliteCatalog};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use command::Command;
use console::{ConsoleFeedback, NoCamera};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ScannerConfig::load_or_default(None);
    info!(
        device_id = %config.device_id(),
        store_id = %config.store_id(),
        mode = %config.scanner.default_mode,
        "Configuration loaded"
    );

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening catalog at {}", db_path.display()))?;
    info!(path = %db_path.display(), "Catalog database ready");

    let controller = ScannerController::builder(config.clone())
        .with_fetcher(Arc::new(SqliteCatalog::new(db.clone())))
        .with_decoder(Arc::new(NoCamera))
        .with_feedback(Arc::new(ConsoleFeedback))
        .build()?;

    controller.activate(config.store_id()).await?;
    print_status(&controller).await;
    println!("Type :help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(err) = execute(&controller, command).await {
                            report(&err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("✗ {}", err),
                }
            }
        }
    }

    controller.teardown().await;
    db.close().await;
    info!("Terminal stopped");
    Ok(())
}

async fn execute(controller: &ScannerController, command: Command) -> Result<(), ScanError> {
    match command {
        Command::Scan(input) => {
            controller.submit_manual(&input).await?;
        }
        Command::Mode(mode) => {
            controller.switch_mode(mode).await?;
            println!("Mode: {} ({:?})", mode, controller.session_state());
        }
        Command::Store(store_id) => {
            controller.switch_store(&store_id).await?;
            print_status(controller).await;
        }
        Command::Refresh => {
            let flagged = controller.force_refresh().await?;
            println!("✓ Catalog refreshed, {} line(s) over stock", flagged.len());
        }
        Command::Quantity {
            product_id,
            quantity,
        } => match controller.set_quantity(&product_id, quantity).await? {
            Some(line) => println!("✓ {} × {} = {}", line.quantity, line.name, line.total),
            None => println!("✓ Removed {}", product_id),
        },
        Command::Discount {
            product_id,
            discount,
        } => {
            let line = controller.set_discount(&product_id, discount).await?;
            println!("✓ {} discount {}% = {}", line.name, discount.percent(), line.total);
        }
        Command::Retry => {
            controller.retry_camera().await?;
        }
        Command::Cart => print_cart(controller).await,
        Command::Status => print_status(controller).await,
        Command::Help => println!("{}", command::HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn report(err: &ScanError) {
    if !err.is_expected() {
        warn!(error = %err, retryable = err.is_retryable(), "Command failed");
    }
    println!("✗ {}", err);
}

async fn print_cart(controller: &ScannerController) {
    let cart = controller.cart().snapshot().await;
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in &cart.lines {
        let flag = if line.over_allocated { " ⚠ over stock" } else { "" };
        println!(
            "  {:<12} {:<32} {:>3} × {} = {}{}",
            line.product_id, line.name, line.quantity, line.unit_price, line.total, flag
        );
    }
    let totals = controller.cart_totals().await;
    println!(
        "  {} item(s), subtotal {}, discount {}, total {}",
        totals.total_quantity, totals.subtotal, totals.discount, totals.total
    );
    let over = cart.over_allocated().count();
    if over > 0 {
        println!("  {} line(s) above current stock, lower with :qty", over);
    }
}

async fn print_status(controller: &ScannerController) {
    let status = controller.cache_status().await;
    println!(
        "Store: {} | catalog: {} product(s), {} barcode(s){} | mode: {} | camera: {:?}",
        status.active_store.as_deref().unwrap_or("-"),
        status.product_count,
        status.entry_count,
        status
            .error
            .as_deref()
            .map(|e| format!(" (last refresh failed: {})", e))
            .unwrap_or_default(),
        controller.mode(),
        controller.session_state(),
    );
}

/// Initializes the tracing subscriber for logging.
///
/// Set `RUST_LOG` to override, e.g. `RUST_LOG=scanline_runtime=trace`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scanline=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
