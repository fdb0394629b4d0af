//! Status command implementation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use khata_core::db::DB_KEY_ENV;
use khata_core::records::{document_number, INVOICE_PREFIX};
use khata_core::Session;

pub fn cmd_status(session: &Session) -> Result<()> {
    let db = session.database();
    let books = session.books();
    let settings = session.settings();

    println!();
    println!("📊 Khata Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", db.path());

    if let Ok(metadata) = fs::metadata(Path::new(db.path())) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.1} MB", size_kb / 1024.0);
        }
    }

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    let snapshots = db
        .list_snapshots()
        .context("Failed to read stored collections")?;
    match snapshots.iter().map(|(_, updated_at)| updated_at).max() {
        Some(last) => println!("   Last saved: {} ({} collection(s))", last, snapshots.len()),
        None => println!("   Last saved: never"),
    }

    println!("   Today: {}", session.today());
    println!("   Currency: {} ({})", settings.currency, settings.currency_symbol());
    if settings.gateway.is_configured() {
        println!("   Payment links: enabled");
    }
    let accent = if settings.accent_color.is_empty() {
        "default"
    } else {
        settings.accent_color.as_str()
    };
    println!("   Template: {} (accent {})", settings.template.as_str(), accent);
    let fields: Vec<&str> = settings
        .enabled_custom_fields()
        .map(|f| f.label.as_str())
        .collect();
    if !fields.is_empty() {
        println!("   Custom fields: {}", fields.join(", "));
    }

    println!();
    let business = if books.business.name.is_empty() {
        "(not set)"
    } else {
        books.business.name.as_str()
    };
    println!("   Business: {}", business);
    println!(
        "   Invoices: {} (next {})",
        books.invoices.len(),
        document_number(INVOICE_PREFIX, books.invoice_counter)
    );
    println!("   Quotations: {}", books.quotations.len());
    println!("   Purchases: {}", books.purchases.len());
    println!("   Products: {}", books.products.len());
    println!("   Clients: {}  Vendors: {}", books.clients.len(), books.vendors.len());
    println!(
        "   Recurring profiles: {} ({} active)",
        books.recurring_profiles.len(),
        books.recurring_profiles.iter().filter(|p| p.is_active()).count()
    );
    println!(
        "   Bank transactions: {} ({} unreconciled)",
        books.bank_transactions.len(),
        books.unreconciled().count()
    );

    let boot = session.boot_outcome();
    if !boot.invoices.is_empty() || !boot.paused.is_empty() || !boot.diagnostics.is_empty() {
        println!();
        println!("   🔁 Recurring billing on start-up");
        for invoice in &boot.invoices {
            println!(
                "      Issued {} to {} dated {} ({})",
                invoice.invoice_number,
                invoice.client.name,
                invoice.date,
                settings.format_money(invoice.total_amount)
            );
        }
        for id in &boot.paused {
            println!("      Profile {} reached its end date and was paused", id);
        }
        for diagnostic in &boot.diagnostics {
            println!("      ⚠️  {}", diagnostic);
        }
    }

    println!();
    Ok(())
}
