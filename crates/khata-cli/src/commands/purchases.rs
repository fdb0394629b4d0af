//! Purchase bill command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use khata_core::models::PaymentStatus;
use khata_core::{PurchaseDraft, Session};

use super::{parse_items, price_type, resolve_vendor, transaction_type, truncate};

/// Arguments for `purchases new`
pub struct PurchaseArgs<'a> {
    pub vendor: &'a str,
    pub bill: &'a str,
    pub items: &'a [String],
    pub date: Option<NaiveDate>,
    pub inclusive: bool,
    pub inter_state: bool,
    pub paid: bool,
}

pub fn cmd_purchases_list(session: &Session, limit: usize) -> Result<()> {
    let settings = session.settings();
    let purchases = &session.books().purchases;

    if purchases.is_empty() {
        println!("No purchase bills found.");
        return Ok(());
    }

    println!(
        "{:16} {:10} {:26} {:>14} {:8}",
        "Bill", "Date", "Vendor", "Total", "Status"
    );
    println!("{}", "-".repeat(78));
    for purchase in purchases.iter().take(limit) {
        println!(
            "{:16} {:10} {:26} {:>14} {:8}",
            truncate(&purchase.bill_number, 16),
            purchase.date,
            truncate(&purchase.vendor.name, 26),
            settings.format_money(purchase.total_amount),
            purchase.status.as_str(),
        );
    }

    Ok(())
}

pub fn cmd_purchases_new(session: &mut Session, args: PurchaseArgs<'_>) -> Result<()> {
    let books = session.books();
    let draft = PurchaseDraft {
        bill_number: args.bill.trim().to_string(),
        vendor: resolve_vendor(books, args.vendor),
        items: parse_items(args.items, &books.products)?,
        date: args.date.unwrap_or_else(|| session.today()),
        price_type: price_type(args.inclusive),
        transaction_type: transaction_type(args.inter_state),
        status: if args.paid {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        },
    };

    let purchase = session
        .record_purchase(draft)
        .context("Failed to record purchase")?;
    println!(
        "✅ Recorded bill {} from {} for {} (ITC {})",
        purchase.bill_number,
        purchase.vendor.name,
        session.settings().format_money(purchase.total_amount),
        session
            .settings()
            .format_money(purchase.calculation_result.total_gst_amount)
    );

    Ok(())
}

pub fn cmd_purchases_paid(session: &mut Session, key: &str) -> Result<()> {
    let purchase = session
        .mark_purchase_paid(key)
        .with_context(|| format!("Failed to mark bill {} as paid", key))?;
    println!("✅ Bill {} marked as paid", purchase.bill_number);
    Ok(())
}
