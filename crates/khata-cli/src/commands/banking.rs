//! Bank statement import and reconciliation commands

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use khata_core::import::parse_statement;
use khata_core::{MatchTarget, Session};

use super::truncate;

pub fn cmd_bank_import(session: &mut Session, file: &Path) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let transactions = parse_statement(reader).context("Failed to parse bank statement")?;
    let parsed = transactions.len();

    let summary = session
        .import_statement(transactions)
        .context("Failed to save bank transactions")?;

    println!("   Parsed:     {}", parsed);
    println!("   Added:      {}", summary.added);
    println!("   Duplicates: {}", summary.duplicates);
    println!("✅ Import complete");
    if summary.added > 0 {
        println!();
        println!("Next: khata bank list, then khata bank match <id>");
    }

    Ok(())
}

pub fn cmd_bank_list(session: &Session, include_reconciled: bool) -> Result<()> {
    let settings = session.settings();
    let transactions: Vec<_> = session
        .books()
        .bank_transactions
        .iter()
        .filter(|t| include_reconciled || !t.is_reconciled())
        .collect();

    if transactions.is_empty() {
        if include_reconciled {
            println!("No bank transactions. Import one with: khata bank import --file statement.csv");
        } else {
            println!("🎉 Everything is reconciled.");
        }
        return Ok(());
    }

    println!(
        "{:36} {:10} {:32} {:>14} {:6} {}",
        "ID", "Date", "Description", "Amount", "Kind", "Matches"
    );
    println!("{}", "-".repeat(110));
    for tx in transactions {
        let matches = if tx.is_reconciled() {
            "reconciled".to_string()
        } else {
            session
                .books()
                .matches_for(&tx.id)
                .map(|m| m.len().to_string())
                .unwrap_or_default()
        };
        println!(
            "{:36} {:10} {:32} {:>14} {:6} {}",
            tx.id,
            tx.date,
            truncate(&tx.description, 32),
            settings.format_money(tx.amount),
            tx.kind.as_str(),
            matches
        );
    }

    Ok(())
}

pub fn cmd_bank_match(session: &Session, id: &str) -> Result<()> {
    let settings = session.settings();
    let books = session.books();
    let tx = books
        .find_bank_transaction(id)
        .with_context(|| format!("Bank transaction not found: {}", id))?;
    let matches = books.matches_for(id)?;

    println!();
    println!(
        "🔗 {} {} {} on {}",
        tx.kind,
        settings.format_money(tx.amount),
        tx.description,
        tx.date
    );
    println!("   ─────────────────────────────────────────────────────────────");

    if matches.is_empty() {
        println!("   No unpaid invoice or bill for this amount.");
        if tx.kind == khata_core::models::TransactionKind::Debit {
            println!(
                "   Record it as an expense: khata bank expense {} --vendor <vendor> -d <description>",
                tx.id
            );
        }
        println!();
        return Ok(());
    }

    for invoice in &matches.invoices {
        println!(
            "   Invoice {:10} {} {:28} {:>14}",
            invoice.invoice_number,
            invoice.date,
            truncate(&invoice.client.name, 28),
            settings.format_money(invoice.total_amount)
        );
    }
    for purchase in &matches.purchases {
        println!(
            "   Bill    {:10} {} {:28} {:>14}",
            truncate(&purchase.bill_number, 10),
            purchase.date,
            truncate(&purchase.vendor.name, 28),
            settings.format_money(purchase.total_amount)
        );
    }
    println!();

    Ok(())
}

pub fn cmd_bank_reconcile(
    session: &mut Session,
    id: &str,
    invoice: Option<&str>,
    purchase: Option<&str>,
) -> Result<()> {
    let books = session.books();
    let target = match (invoice, purchase) {
        (Some(key), _) => MatchTarget::Invoice(
            books
                .find_invoice(key)
                .with_context(|| format!("Invoice not found: {}", key))?
                .id
                .clone(),
        ),
        (None, Some(key)) => MatchTarget::Purchase(
            books
                .find_purchase(key)
                .with_context(|| format!("Failed to look up bill {}", key))?
                .id
                .clone(),
        ),
        (None, None) => {
            // Without an explicit record, only an unambiguous match is accepted
            let mut targets = books.matches_for(id)?.targets();
            match targets.len() {
                1 => targets.remove(0),
                0 => bail!("No matching invoice or bill for transaction {}", id),
                n => bail!(
                    "{} candidates match transaction {}; pick one with --invoice or --purchase",
                    n,
                    id
                ),
            }
        }
    };

    session
        .reconcile(id, &target, Utc::now())
        .with_context(|| format!("Failed to reconcile transaction {}", id))?;
    println!("✅ Reconciled transaction {} with {}", id, target);
    Ok(())
}

pub fn cmd_bank_expense(session: &mut Session, id: &str, vendor: &str, description: &str) -> Result<()> {
    let expense = session
        .record_expense(id, description, vendor, Utc::now())
        .with_context(|| format!("Failed to record expense for transaction {}", id))?;
    println!(
        "✅ Recorded expense {} ({}) to {}",
        expense.bill_number,
        session.settings().format_money(expense.total_amount),
        expense.vendor.name
    );
    Ok(())
}
