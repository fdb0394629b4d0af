//! Invoice command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use khata_core::models::LogisticsDetails;
use khata_core::{DocumentDraft, Session};

use super::{document_parts, parse_custom_fields, print_calculation, truncate};
use crate::cli::DocumentArgs;

pub fn cmd_invoices_list(session: &Session, limit: usize, unpaid_only: bool) -> Result<()> {
    let settings = session.settings();
    let invoices: Vec<_> = session
        .books()
        .invoices
        .iter()
        .filter(|i| !unpaid_only || !i.is_paid())
        .take(limit)
        .collect();

    if invoices.is_empty() {
        println!("No invoices found.");
        return Ok(());
    }

    println!(
        "{:10} {:10} {:28} {:>14} {:8}",
        "Number", "Date", "Client", "Total", "Status"
    );
    println!("{}", "-".repeat(74));
    for invoice in invoices {
        println!(
            "{:10} {:10} {:28} {:>14} {:8}",
            invoice.invoice_number,
            invoice.date,
            truncate(&invoice.client.name, 28),
            settings.format_money(invoice.total_amount),
            invoice.status.as_str(),
        );
    }

    Ok(())
}

pub fn cmd_invoices_new(
    session: &mut Session,
    args: &DocumentArgs,
    date: Option<NaiveDate>,
    logistics: Option<LogisticsDetails>,
    fields: &[String],
) -> Result<()> {
    let (client, items, price_type, transaction_type) = document_parts(session.books(), args)?;
    let custom_field_values = parse_custom_fields(session.settings(), fields)?;
    let draft = DocumentDraft {
        client,
        items,
        date: date.unwrap_or_else(|| session.today()),
        price_type,
        transaction_type,
        logistics,
        custom_field_values,
    };

    let invoice = session
        .issue_invoice(draft)
        .context("Failed to issue invoice")?;

    println!(
        "✅ Issued {} to {} for {}",
        invoice.invoice_number,
        invoice.client.name,
        session.settings().format_money(invoice.total_amount)
    );
    if let Some(link) = &invoice.payment_link {
        println!("   Payment link: {}", link);
    }

    Ok(())
}

pub fn cmd_invoices_show(session: &Session, key: &str) -> Result<()> {
    let settings = session.settings();
    let invoice = session
        .books()
        .find_invoice(key)
        .with_context(|| format!("Invoice not found: {}", key))?;

    println!();
    println!("🧾 Invoice {}", invoice.invoice_number);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Date:     {}", invoice.date);
    println!("   From:     {}", invoice.business.name);
    if !invoice.business.gstin.is_empty() {
        println!("             GSTIN {}", invoice.business.gstin);
    }
    println!("   To:       {}", invoice.client.name);
    if !invoice.client.gstin.is_empty() {
        println!("             GSTIN {}", invoice.client.gstin);
    }
    println!(
        "   Pricing:  {} ({})",
        invoice.price_type, invoice.transaction_type
    );
    match invoice.payment_date {
        Some(paid) => println!("   Status:   {} on {}", invoice.status, paid.date_naive()),
        None => println!("   Status:   {}", invoice.status),
    }
    if let Some(link) = &invoice.payment_link {
        println!("   Pay at:   {}", link);
    }
    if let Some(logistics) = &invoice.logistics {
        println!(
            "   Shipping: {} {} vehicle {} e-way bill {}",
            logistics.transporter_name,
            logistics.transporter_id,
            logistics.vehicle_number,
            logistics.eway_bill_number
        );
    }
    if let Some(values) = &invoice.custom_field_values {
        for (id, value) in values {
            let label = settings
                .custom_fields
                .iter()
                .find(|f| &f.id == id)
                .map(|f| f.label.as_str())
                .unwrap_or(id.as_str());
            println!("   {}: {}", label, value);
        }
    }

    println!();
    println!(
        "   {:30} {:>8} {:>8} {:>12} {:>5}",
        "Item", "HSN", "Qty", "Price", "GST%"
    );
    for item in &invoice.items {
        println!(
            "   {:30} {:>8} {:>8} {:>12} {:>5}",
            truncate(&item.description, 30),
            item.hsn,
            item.quantity,
            settings.format_money(item.price),
            item.gst_rate
        );
    }
    println!();
    print_calculation(settings, &invoice.calculation_result, invoice.transaction_type);

    if !invoice.business.terms.is_empty() {
        println!();
        println!("   Terms: {}", invoice.business.terms);
    }
    println!();

    Ok(())
}

pub fn cmd_invoices_paid(session: &mut Session, key: &str) -> Result<()> {
    let invoice = session
        .mark_invoice_paid(key, Utc::now())
        .with_context(|| format!("Failed to mark invoice {} as paid", key))?;
    println!("✅ {} marked as paid", invoice.invoice_number);
    Ok(())
}

pub fn cmd_invoices_unpaid(session: &mut Session, key: &str) -> Result<()> {
    let invoice = session
        .mark_invoice_unpaid(key)
        .with_context(|| format!("Failed to mark invoice {} as unpaid", key))?;
    println!("↩️  {} marked as unpaid", invoice.invoice_number);
    Ok(())
}
