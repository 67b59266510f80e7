//! # Seed Report
//!
//! Runs a day of demo trading through the in-memory ledger and prints the
//! branch and shift-close summaries as JSON.
//!
//! ## Usage
//! ```bash
//! # Default config lookup (ledger.toml in the platform config dir)
//! cargo run -p tally-ledger --bin seed-report
//!
//! # Explicit config file, more verbose logs
//! RUST_LOG=debug cargo run -p tally-ledger --bin seed-report -- --config ./ledger.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tally_core::order::SaleContext;
use tally_core::refund::{RefundRequest, ReturnSelection};
use tally_core::{Cart, DiscountRule, Money, PaymentType};
use tally_ledger::{
    BranchReports, CheckoutService, InMemoryOrderStore, InMemoryRefundStore,
    InMemoryShiftSessionStore, LedgerConfig, RefundDesk, ShiftDesk,
};

/// Demo catalog: (product id, name, price in cents)
const CATALOG: &[(&str, &str, i64)] = &[
    ("BEV-001", "Cold Brew", 450),
    ("BEV-002", "Sparkling Water", 199),
    ("BAK-001", "Croissant", 325),
    ("BAK-002", "Sourdough Loaf", 899),
    ("GRO-001", "Olive Oil 500ml", 1299),
];

/// (catalog index, quantity) per sale, with payment code and whole-percent discount.
const SALES: &[(&[(usize, i64)], &str, u32)] = &[
    (&[(0, 2), (2, 2)], "card", 0),
    (&[(3, 1), (4, 1)], "cash", 10),
    (&[(1, 6)], "upi", 0),
    (&[(0, 1), (2, 1), (3, 1)], "card", 5),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Report");
                println!();
                println!("Usage: seed-report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  ledger.toml to load (default: config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = LedgerConfig::load_or_default(config_path);
    let branch_id = config.store_id().to_string();
    info!(branch_id = %branch_id, accepted = ?config.payments.accepted, "Ledger configured");

    let orders = Arc::new(InMemoryOrderStore::new());
    let refunds = Arc::new(InMemoryRefundStore::new());
    let sessions = Arc::new(InMemoryShiftSessionStore::new());

    let checkout = CheckoutService::new(orders.clone(), config.accepted_payments());
    let refund_desk = RefundDesk::new(orders.clone(), refunds.clone());
    let shift_desk = ShiftDesk::new(
        sessions,
        orders.clone(),
        refunds.clone(),
        config.aggregate_options(),
        config.staff_policy(),
    );
    let reports = BranchReports::new(orders, refunds, config.aggregate_options());

    let opened_at = Utc::now() - Duration::hours(SALES.len() as i64 + 2);
    let session = shift_desk.open_at("cashier-1", &branch_id, opened_at).await?;
    let ctx = SaleContext::new(&branch_id, "cashier-1");

    let mut cart = Cart::new(opened_at);
    let mut completed = Vec::new();
    for (n, (lines, payment, pct)) in SALES.iter().enumerate() {
        let sold_at = opened_at + Duration::hours(n as i64 + 1);
        for (idx, qty) in lines.iter() {
            let (product_id, name, cents) = CATALOG[*idx];
            cart.add_item(product_id, name, Money::from_cents(cents), *qty)?;
        }
        cart.set_discount(DiscountRule::percent(*pct))?;

        let payment = PaymentType::new(*payment);
        if !checkout.accepted_payments().accepts(&payment) {
            info!(payment = %payment, "Payment type not accepted here, skipping sale");
            cart.clear(sold_at);
            continue;
        }
        completed.push(checkout.complete_sale_at(&mut cart, payment, &ctx, sold_at).await?);
    }

    // Customer brings back one croissant from the first sale
    if let Some(first) = completed.first() {
        if let Some(line) = first.lines.iter().find(|l| l.product_id == "BAK-001") {
            let request = RefundRequest {
                order_id: first.id.clone(),
                selections: vec![ReturnSelection::new(&line.id, 1)],
                reason: "stale".into(),
                refund_payment_type: None,
                cashier_id: "cashier-1".into(),
                branch_id: branch_id.clone(),
                shift_report_id: Some(session.id.clone()),
            };
            let at = opened_at + Duration::hours(SALES.len() as i64 + 1);
            refund_desk.issue_at(&request, at).await?;
        }
    }

    let closed_at = opened_at + Duration::hours(SALES.len() as i64 + 2);
    shift_desk.close_at(&session.id, closed_at).await?;

    let day = opened_at.with_timezone(&config.aggregate_options().utc_offset).date_naive();
    let last_day = closed_at.with_timezone(&config.aggregate_options().utc_offset).date_naive();
    let branch_summary = reports.days(&branch_id, day, last_day).await?;
    let shift_summary = shift_desk.summary(&session.id, closed_at).await?;

    println!("{}", serde_json::to_string_pretty(&branch_summary)?);
    println!("{}", serde_json::to_string_pretty(&shift_summary)?);

    Ok(())
}
