//! Quotation command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use khata_core::{DocumentDraft, Session};

use super::{document_parts, truncate};
use crate::cli::DocumentArgs;

pub fn cmd_quotes_list(session: &Session) -> Result<()> {
    let settings = session.settings();
    let quotations = &session.books().quotations;

    if quotations.is_empty() {
        println!("No quotations found.");
        return Ok(());
    }

    println!("{:10} {:10} {:28} {:>14}", "Number", "Date", "Client", "Total");
    println!("{}", "-".repeat(65));
    for quotation in quotations {
        println!(
            "{:10} {:10} {:28} {:>14}",
            quotation.quotation_number,
            quotation.date,
            truncate(&quotation.client.name, 28),
            settings.format_money(quotation.total_amount),
        );
    }

    Ok(())
}

pub fn cmd_quotes_new(session: &mut Session, args: &DocumentArgs, date: Option<NaiveDate>) -> Result<()> {
    let (client, items, price_type, transaction_type) = document_parts(session.books(), args)?;
    let draft = DocumentDraft {
        client,
        items,
        date: date.unwrap_or_else(|| session.today()),
        price_type,
        transaction_type,
        logistics: None,
        custom_field_values: None,
    };

    let quotation = session
        .issue_quotation(draft)
        .context("Failed to create quotation")?;
    println!(
        "✅ Created {} for {} ({})",
        quotation.quotation_number,
        quotation.client.name,
        session.settings().format_money(quotation.total_amount)
    );

    Ok(())
}

pub fn cmd_quotes_convert(session: &mut Session, key: &str, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| session.today());
    let invoice = session
        .convert_quotation(key, date)
        .with_context(|| format!("Failed to convert quotation {}", key))?;
    println!(
        "✅ Quotation {} issued as {} ({})",
        key,
        invoice.invoice_number,
        session.settings().format_money(invoice.total_amount)
    );
    Ok(())
}
