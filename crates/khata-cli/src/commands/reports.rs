//! Dashboard, GST return and business report commands

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, Months, NaiveDate};
use khata_core::reports::{self, DateRange, ItemTotal, PartyTotal};
use khata_core::{Session, Settings};
use serde::Serialize;

use super::truncate;
use crate::cli::PeriodArgs;

/// Turn a named period (or explicit dates) into an inclusive date range
pub fn resolve_period(
    period: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange> {
    // Custom dates override the named period; a missing end means today
    if custom_from.is_some() || custom_to.is_some() {
        let from = match custom_from {
            Some(from) => NaiveDate::parse_from_str(from, "%Y-%m-%d")
                .context("Invalid --from date format (use YYYY-MM-DD)")?,
            None => DateRange::all_time().from,
        };
        let to = match custom_to {
            Some(to) => NaiveDate::parse_from_str(to, "%Y-%m-%d")
                .context("Invalid --to date format (use YYYY-MM-DD)")?,
            None => today,
        };
        return Ok(DateRange::new(from, to)?);
    }

    let this_month = reports::filing_period_of(today)?;

    let range = match period.to_lowercase().as_str() {
        "this-month" => DateRange::new(this_month.from, today)?,
        "last-month" => {
            let previous = this_month
                .from
                .pred_opt()
                .context("No month before the earliest date")?;
            reports::filing_period_of(previous)?
        }
        "this-year" => {
            let from = NaiveDate::from_ymd_opt(today.year(), 1, 1)
                .context("Invalid start of year")?;
            DateRange::new(from, today)?
        }
        "this-fy" => {
            // Indian financial year runs April to March
            let year = if today.month() >= 4 {
                today.year()
            } else {
                today.year() - 1
            };
            let from = NaiveDate::from_ymd_opt(year, 4, 1)
                .context("Invalid start of financial year")?;
            DateRange::new(from, today)?
        }
        "last-30-days" => DateRange::new(today - Duration::days(30), today)?,
        "last-90-days" => DateRange::new(today - Duration::days(90), today)?,
        "last-12-months" => {
            let from = this_month
                .from
                .checked_sub_months(Months::new(12))
                .context("Date out of range")?;
            DateRange::new(from, today)?
        }
        "all" => DateRange::all_time(),
        _ => bail!(
            "Unknown period: {}. Available: this-month, last-month, this-year, this-fy, last-30-days, last-90-days, last-12-months, all",
            period
        ),
    };

    Ok(range)
}

fn range_from_args(session: &Session, args: &PeriodArgs) -> Result<DateRange> {
    resolve_period(
        &args.period,
        args.from.as_deref(),
        args.to.as_deref(),
        session.today(),
    )
}

/// Filing month from `YYYY-MM`, or the month containing `today`
pub fn resolve_month(month: Option<&str>, today: NaiveDate) -> Result<DateRange> {
    let Some(month) = month else {
        return Ok(reports::filing_period_of(today)?);
    };

    let (year, month_num) = month
        .trim()
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
        .with_context(|| format!("Invalid month '{}' (use YYYY-MM)", month))?;
    Ok(reports::filing_period(year, month_num)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_period(range: &DateRange) {
    if *range == DateRange::all_time() {
        println!("   Period: all time");
    } else {
        println!("   Period: {} to {}", range.from, range.to);
    }
}

// ========== Dashboard ==========

pub fn cmd_dashboard(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let books = session.books();
    let report = reports::dashboard(&books.invoices, &books.purchases, &books.products, range);

    if args.json {
        return print_json(&report);
    }

    let settings = session.settings();
    let money = |amount: f64| settings.format_money(amount);

    println!();
    println!("📊 Khata Dashboard");
    print_period(&range);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {:>14}", "Invoices issued", report.invoice_count);
    println!("   {:25} │ {:>14}", "Total invoiced", money(report.total_invoiced));
    println!("   {:25} │ {:>14}", "Collected", money(report.total_collected));
    println!("   {:25} │ {:>14}", "Outstanding", money(report.total_outstanding));
    println!("   {:25} │ {:>14}", "GST collected", money(report.total_tax));
    println!();
    println!("   {:25} │ {:>14}", "Purchase bills", report.purchase_count);
    println!("   {:25} │ {:>14}", "Total payables", money(report.total_payables));
    println!("   {:25} │ {:>14}", "Input tax credit", money(report.input_tax_credit));
    println!();
    println!("   {:25} │ {:>14}", "Stock value", money(report.stock_value));
    if report.low_stock_items > 0 {
        println!("   ⚠️  {} product(s) running low", report.low_stock_items);
    }
    if report.out_of_stock_items > 0 {
        println!("   ❌ {} product(s) out of stock", report.out_of_stock_items);
    }
    let unreconciled = books.unreconciled().count();
    if unreconciled > 0 {
        println!("   🏦 {} bank transaction(s) to reconcile", unreconciled);
    }
    println!();

    Ok(())
}

// ========== GST ==========

pub fn cmd_gst_summary(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let books = session.books();
    let report = reports::dashboard(&books.invoices, &books.purchases, &books.products, range);

    if args.json {
        return print_json(&report.tax_by_rate);
    }

    let settings = session.settings();
    let money = |amount: f64| settings.format_money(amount);

    println!();
    println!("🧾 GST Summary");
    print_period(&range);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.tax_by_rate.is_empty() {
        println!("   No invoices in this period.");
        return Ok(());
    }

    println!(
        "   {:>5} │ {:>14} │ {:>12} │ {:>12} │ {:>12}",
        "Rate", "Taxable", "CGST", "SGST", "IGST"
    );
    println!("   ──────┼────────────────┼──────────────┼──────────────┼──────────────");
    for row in &report.tax_by_rate {
        println!(
            "   {:>4}% │ {:>14} │ {:>12} │ {:>12} │ {:>12}",
            row.rate,
            money(row.taxable_amount),
            money(row.cgst),
            money(row.sgst),
            money(row.igst)
        );
    }
    println!("   ──────┼────────────────┼──────────────┼──────────────┼──────────────");
    println!(
        "   {:>5} │ {:>14} │ {:>12} │ {:>12} │ {:>12}",
        "Total",
        "",
        money(report.tax_heads.cgst),
        money(report.tax_heads.sgst),
        money(report.tax_heads.igst)
    );
    println!();

    Ok(())
}

pub fn cmd_gstr1(session: &Session, month: Option<&str>, json: bool) -> Result<()> {
    let range = resolve_month(month, session.today())?;
    let report = reports::gstr1(&session.books().invoices, range);

    if json {
        return print_json(&report);
    }

    let settings = session.settings();
    let money = |amount: f64| settings.format_money(amount);

    println!();
    println!("📄 GSTR-1");
    print_period(&range);
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   B2B invoices ({})", report.b2b.len());
    for entry in &report.b2b {
        println!(
            "   {:10} {} {:16} {:>14} {:>12}",
            entry.invoice_number,
            entry.date,
            entry.client_gstin,
            money(entry.taxable_value),
            money(entry.tax)
        );
    }

    println!();
    println!("   B2C by rate");
    for entry in &report.b2c {
        println!("   {:>4}% {:>14}", entry.rate, money(entry.taxable_value));
    }

    println!();
    println!("   HSN summary");
    for entry in &report.hsn {
        println!(
            "   {:8} {:24} {:>8} {:>14} {:>12}",
            entry.hsn,
            truncate(&entry.description, 24),
            entry.quantity,
            money(entry.taxable_value),
            money(entry.tax)
        );
    }
    println!();

    Ok(())
}

pub fn cmd_gstr3b(session: &Session, month: Option<&str>, json: bool) -> Result<()> {
    let range = resolve_month(month, session.today())?;
    let books = session.books();
    let report = reports::gstr3b(&books.invoices, &books.purchases, range);

    if json {
        return print_json(&report);
    }

    let settings = session.settings();
    let money = |amount: f64| settings.format_money(amount);

    println!();
    println!("📄 GSTR-3B");
    print_period(&range);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {:>14}", "Outward taxable value", money(report.taxable_value));
    println!();
    println!(
        "   {:25} │ {:>12} │ {:>12} │ {:>12}",
        "", "CGST", "SGST", "IGST"
    );
    println!(
        "   {:25} │ {:>12} │ {:>12} │ {:>12}",
        "Output tax",
        money(report.output_tax.cgst),
        money(report.output_tax.sgst),
        money(report.output_tax.igst)
    );
    println!(
        "   {:25} │ {:>12} │ {:>12} │ {:>12}",
        "Input tax credit",
        money(report.input_tax_credit.cgst),
        money(report.input_tax_credit.sgst),
        money(report.input_tax_credit.igst)
    );
    println!("   ─────────────────────────────────────────────────────────────");
    let net = report.net_payable();
    if net >= 0.0 {
        println!("   {:25} │ {:>14}", "Net tax payable", money(net));
    } else {
        println!("   {:25} │ {:>14}", "Credit carried forward", money(-net));
    }
    println!();

    Ok(())
}

// ========== Reports ==========

pub fn cmd_report_pnl(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let books = session.books();
    let report = reports::profit_and_loss(&books.invoices, &books.purchases, range);

    if args.json {
        return print_json(&report);
    }

    let settings = session.settings();
    println!();
    println!("💰 Profit & Loss");
    print_period(&range);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:25} │ {:>14}", "Revenue (paid invoices)", settings.format_money(report.revenue));
    println!("   {:25} │ {:>14}", "Expenses", settings.format_money(report.expenses));
    println!("   ─────────────────────────────────────────────────────────────");
    let profit = report.profit();
    let label = if profit >= 0.0 { "Net profit" } else { "Net loss" };
    println!("   {:25} │ {:>14}", label, settings.format_money(profit.abs()));
    println!();

    Ok(())
}

fn print_party_totals(settings: &Settings, title: &str, range: &DateRange, rows: &[PartyTotal]) {
    println!();
    println!("{}", title);
    print_period(range);
    println!("   ─────────────────────────────────────────────────────────────");
    if rows.is_empty() {
        println!("   Nothing recorded in this period.");
        return;
    }
    println!("   {:30} │ {:>5} │ {:>14}", "Name", "Docs", "Total");
    for row in rows {
        println!(
            "   {:30} │ {:>5} │ {:>14}",
            truncate(&row.name, 30),
            row.documents,
            settings.format_money(row.total)
        );
    }
    println!();
}

fn print_item_totals(settings: &Settings, title: &str, range: &DateRange, rows: &[ItemTotal]) {
    println!();
    println!("{}", title);
    print_period(range);
    println!("   ─────────────────────────────────────────────────────────────");
    if rows.is_empty() {
        println!("   Nothing recorded in this period.");
        return;
    }
    println!("   {:30} │ {:>9} │ {:>14}", "Item", "Qty", "Value");
    for row in rows {
        println!(
            "   {:30} │ {:>9} │ {:>14}",
            truncate(&row.name, 30),
            row.quantity,
            settings.format_money(row.total)
        );
    }
    println!();
}

pub fn cmd_report_sales_by_client(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let rows = reports::sales_by_client(&session.books().invoices, range);
    if args.json {
        return print_json(&rows);
    }
    print_party_totals(session.settings(), "👥 Sales by Client", &range, &rows);
    Ok(())
}

pub fn cmd_report_sales_by_item(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let rows = reports::sales_by_item(&session.books().invoices, range);
    if args.json {
        return print_json(&rows);
    }
    print_item_totals(session.settings(), "📦 Sales by Item", &range, &rows);
    Ok(())
}

pub fn cmd_report_purchases_by_vendor(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let rows = reports::purchases_by_vendor(&session.books().purchases, range);
    if args.json {
        return print_json(&rows);
    }
    print_party_totals(session.settings(), "🏭 Purchases by Vendor", &range, &rows);
    Ok(())
}

pub fn cmd_report_purchases_by_item(session: &Session, args: &PeriodArgs) -> Result<()> {
    let range = range_from_args(session, args)?;
    let rows = reports::purchases_by_item(&session.books().purchases, range);
    if args.json {
        return print_json(&rows);
    }
    print_item_totals(session.settings(), "📦 Purchases by Item", &range, &rows);
    Ok(())
}

pub fn cmd_report_stock(session: &Session, json: bool) -> Result<()> {
    let rows = reports::stock_summary(&session.books().products);
    if json {
        return print_json(&rows);
    }

    let settings = session.settings();
    println!();
    println!("📦 Stock Summary");
    println!("   ─────────────────────────────────────────────────────────────");
    if rows.is_empty() {
        println!("   No stock-tracked products.");
        return Ok(());
    }
    println!(
        "   {:28} │ {:>9} │ {:>14} │ {}",
        "Product", "Stock", "Value", "Status"
    );
    for row in &rows {
        println!(
            "   {:28} │ {:>9} │ {:>14} │ {}",
            truncate(&row.name, 28),
            row.stock,
            settings.format_money(row.value),
            row.status
        );
    }
    let total: f64 = rows.iter().map(|r| r.value).sum();
    println!("   {:28} │ {:>9} │ {:>14} │", "Total", "", settings.format_money(total));
    println!();

    Ok(())
}
