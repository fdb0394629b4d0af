//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `open_session` - Shared utilities to open the books
//! - `parse_items` - Line items from `key=value;...` arguments
//! - `cmd_init` - Initialize the database
//! - `cmd_calc` - One-off GST calculation

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use khata_core::db::Database;
use khata_core::models::{
    CalculationResult, ClientDetails, LineItem, LogisticsDetails, PriceType, Product,
    TransactionType, Vendor, GST_RATES,
};
use khata_core::{tax, Books, Session, Settings};

use crate::cli::{finite_number, DocumentArgs};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Open the books, catching up recurring billing to `today`
pub fn open_session(db_path: &Path, no_encrypt: bool, today: NaiveDate) -> Result<Session> {
    let db = open_db(db_path, no_encrypt)?;
    let settings = Settings::load().context("Failed to load settings")?;
    Session::open(db, settings, today).context("Failed to load books")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let books = db.load_books().context("Failed to read books")?;
    println!(
        "   {} invoice(s), {} purchase(s) on file",
        books.invoices.len(),
        books.purchases.len()
    );

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set business details: khata business --name \"...\" --gstin ...");
    println!("  2. Add products: khata products add Widget --price 500 --gst 18 --stock 10");
    println!("  3. Issue an invoice: khata invoices new -c \"Client\" -i \"desc=Widget;qty=2\"");

    Ok(())
}

pub fn cmd_calc(settings: &Settings, items: &[String], inclusive: bool, inter_state: bool) -> Result<()> {
    let items = parse_items(items, &[])?;
    let price_type = price_type(inclusive);
    let transaction_type = transaction_type(inter_state);
    let result = tax::calculate(&items, price_type);

    println!();
    println!("🧮 GST Calculation ({}, {})", price_type, transaction_type);
    println!("   ─────────────────────────────────────────────────────────────");
    print_calculation(settings, &result, transaction_type);
    println!();

    Ok(())
}

/// Print the breakdown rows and totals of a calculation
pub fn print_calculation(
    settings: &Settings,
    result: &CalculationResult,
    transaction_type: TransactionType,
) {
    for line in tax::breakdown_lines(result, transaction_type) {
        match transaction_type {
            TransactionType::IntraState => println!(
                "   GST {:>4}% on {:>12} │ CGST {:>10} │ SGST {:>10}",
                line.rate,
                settings.format_money(line.taxable_amount),
                settings.format_money(line.amounts.cgst),
                settings.format_money(line.amounts.sgst),
            ),
            TransactionType::InterState => println!(
                "   GST {:>4}% on {:>12} │ IGST {:>10}",
                line.rate,
                settings.format_money(line.taxable_amount),
                settings.format_money(line.amounts.igst),
            ),
        }
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {:>14}", "Net amount", settings.format_money(result.total_net_amount));
    println!("   {:25} │ {:>14}", "GST", settings.format_money(result.total_gst_amount));
    println!("   {:25} │ {:>14}", "Grand total", settings.format_money(result.grand_total));
}

pub fn price_type(inclusive: bool) -> PriceType {
    if inclusive {
        PriceType::Inclusive
    } else {
        PriceType::Exclusive
    }
}

pub fn transaction_type(inter_state: bool) -> TransactionType {
    if inter_state {
        TransactionType::InterState
    } else {
        TransactionType::IntraState
    }
}

/// Parse one line item argument
///
/// Format: `desc=Widget;qty=2;price=150;gst=18;hsn=8471`. Quantity defaults
/// to 1. Price, rate and HSN fall back to the catalog product whose name
/// matches the description.
pub fn parse_item(raw: &str, products: &[Product]) -> Result<LineItem> {
    let mut description = None;
    let mut quantity = None;
    let mut price = None;
    let mut gst_rate = None;
    let mut hsn = None;

    for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .with_context(|| format!("Expected key=value in item '{}', got '{}'", raw, part))?;
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "desc" | "description" | "name" => description = Some(value.to_string()),
            "qty" | "quantity" => quantity = Some(parse_number(value, "quantity")?),
            "price" => price = Some(parse_number(value, "price")?),
            "gst" | "rate" => gst_rate = Some(parse_number(value, "GST rate")?),
            "hsn" | "sac" => hsn = Some(value.to_string()),
            other => bail!("Unknown item field '{}' (use desc, qty, price, gst, hsn)", other),
        }
    }

    let description = match description {
        Some(d) if !d.is_empty() => d,
        _ => bail!("Item '{}' needs a description (desc=...)", raw),
    };

    let lower = description.to_lowercase();
    let product = products.iter().find(|p| p.name.to_lowercase() == lower);

    let price = price
        .or_else(|| product.map(|p| p.price))
        .with_context(|| format!("Item '{}' needs a price (price=...)", description))?;
    let gst_rate = gst_rate
        .or_else(|| product.map(|p| p.gst_rate))
        .with_context(|| format!("Item '{}' needs a GST rate (gst=...)", description))?;
    if !GST_RATES.contains(&gst_rate) {
        bail!(
            "Invalid GST rate {} for '{}' (valid: 0, 5, 12, 18, 28)",
            gst_rate,
            description
        );
    }
    let hsn = hsn
        .or_else(|| product.map(|p| p.hsn.clone()))
        .unwrap_or_default();

    Ok(LineItem::new(description, quantity.unwrap_or(1.0), price, gst_rate).with_hsn(hsn))
}

pub fn parse_items(raws: &[String], products: &[Product]) -> Result<Vec<LineItem>> {
    raws.iter().map(|s| parse_item(s, products)).collect()
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    finite_number(value).map_err(|e| anyhow!("Invalid {}: {}", what, e))
}

/// A client from the list, or a one-off client with just a name
pub fn resolve_client(books: &Books, name: &str) -> ClientDetails {
    books.find_client(name).cloned().unwrap_or_else(|| ClientDetails {
        name: name.trim().to_string(),
        ..Default::default()
    })
}

pub fn resolve_vendor(books: &Books, name: &str) -> Vendor {
    books.find_vendor(name).cloned().unwrap_or_else(|| Vendor {
        name: name.trim().to_string(),
        ..Default::default()
    })
}

/// Client, items and pricing from shared document arguments
pub fn document_parts(
    books: &Books,
    args: &DocumentArgs,
) -> Result<(ClientDetails, Vec<LineItem>, PriceType, TransactionType)> {
    Ok((
        resolve_client(books, &args.client),
        parse_items(&args.items, &books.products)?,
        price_type(args.inclusive),
        transaction_type(args.inter_state),
    ))
}

/// Shipping details, or `None` when no logistics flag was given
pub fn logistics_from_args(
    transporter: Option<String>,
    transporter_id: Option<String>,
    vehicle: Option<String>,
    eway_bill: Option<String>,
) -> Option<LogisticsDetails> {
    if transporter.is_none() && transporter_id.is_none() && vehicle.is_none() && eway_bill.is_none()
    {
        return None;
    }
    Some(LogisticsDetails {
        transporter_name: transporter.unwrap_or_default(),
        transporter_id: transporter_id.unwrap_or_default(),
        vehicle_number: vehicle.unwrap_or_default(),
        eway_bill_number: eway_bill.unwrap_or_default(),
    })
}

/// Custom field values from `id=value` arguments
///
/// Only fields enabled in settings are accepted.
pub fn parse_custom_fields(
    settings: &Settings,
    fields: &[String],
) -> Result<Option<BTreeMap<String, String>>> {
    if fields.is_empty() {
        return Ok(None);
    }

    let mut values = BTreeMap::new();
    for field in fields {
        let (id, value) = field
            .split_once('=')
            .with_context(|| format!("Expected id=value, got '{}'", field))?;
        let id = id.trim();
        if !settings.enabled_custom_fields().any(|f| f.id == id) {
            bail!(
                "Custom field '{}' is not enabled (enabled: {})",
                id,
                settings
                    .enabled_custom_fields()
                    .map(|f| f.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        values.insert(id.to_string(), value.trim().to_string());
    }
    Ok(Some(values))
}
