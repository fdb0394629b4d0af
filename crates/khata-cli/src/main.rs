//! Khata CLI - GST bookkeeping for small businesses
//!
//! Usage:
//!   khata init                            Initialize database
//!   khata invoices new -c Acme -i "..."   Issue an invoice
//!   khata bank import --file CSV          Import a bank statement
//!   khata gst gstr3b --month 2024-03      Monthly GSTR-3B summary

mod cli;
mod commands;


use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use khata_core::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let open = || commands::open_session(&cli.db, cli.no_encrypt, today);

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&open()?),
        Commands::Dashboard { period } => commands::cmd_dashboard(&open()?, &period),
        Commands::Calc {
            items,
            inclusive,
            inter_state,
        } => {
            let settings = Settings::load().context("Failed to load settings")?;
            commands::cmd_calc(&settings, &items, inclusive, inter_state)
        }
        Commands::Business {
            name,
            gstin,
            address,
            terms,
            bank_details,
        } => commands::cmd_business(
            &mut open()?,
            commands::BusinessUpdate {
                name,
                gstin,
                address,
                terms,
                bank_details,
            },
        ),
        Commands::Invoices { action } => {
            let mut session = open()?;
            match action {
                None => commands::cmd_invoices_list(&session, 20, false),
                Some(InvoicesAction::List { limit, unpaid }) => {
                    commands::cmd_invoices_list(&session, limit, unpaid)
                }
                Some(InvoicesAction::New {
                    document,
                    date,
                    transporter,
                    transporter_id,
                    vehicle,
                    eway_bill,
                    fields,
                }) => {
                    let logistics = commands::logistics_from_args(
                        transporter,
                        transporter_id,
                        vehicle,
                        eway_bill,
                    );
                    commands::cmd_invoices_new(&mut session, &document, date, logistics, &fields)
                }
                Some(InvoicesAction::Show { invoice }) => {
                    commands::cmd_invoices_show(&session, &invoice)
                }
                Some(InvoicesAction::Paid { invoice }) => {
                    commands::cmd_invoices_paid(&mut session, &invoice)
                }
                Some(InvoicesAction::Unpaid { invoice }) => {
                    commands::cmd_invoices_unpaid(&mut session, &invoice)
                }
            }
        }
        Commands::Quotes { action } => {
            let mut session = open()?;
            match action {
                None | Some(QuotesAction::List) => commands::cmd_quotes_list(&session),
                Some(QuotesAction::New { document, date }) => {
                    commands::cmd_quotes_new(&mut session, &document, date)
                }
                Some(QuotesAction::Convert { quotation, date }) => {
                    commands::cmd_quotes_convert(&mut session, &quotation, date)
                }
            }
        }
        Commands::Purchases { action } => {
            let mut session = open()?;
            match action {
                None => commands::cmd_purchases_list(&session, 20),
                Some(PurchasesAction::List { limit }) => {
                    commands::cmd_purchases_list(&session, limit)
                }
                Some(PurchasesAction::New {
                    vendor,
                    bill,
                    items,
                    date,
                    inclusive,
                    inter_state,
                    paid,
                }) => commands::cmd_purchases_new(
                    &mut session,
                    commands::PurchaseArgs {
                        vendor: &vendor,
                        bill: &bill,
                        items: &items,
                        date,
                        inclusive,
                        inter_state,
                        paid,
                    },
                ),
                Some(PurchasesAction::Paid { bill }) => {
                    commands::cmd_purchases_paid(&mut session, &bill)
                }
            }
        }
        Commands::Products { action } => {
            let mut session = open()?;
            match action {
                None | Some(ProductsAction::List) => commands::cmd_products_list(&session),
                Some(ProductsAction::Add {
                    name,
                    price,
                    gst,
                    hsn,
                    stock,
                    threshold,
                }) => commands::cmd_products_add(
                    &mut session,
                    &name,
                    price,
                    gst,
                    &hsn,
                    stock,
                    threshold,
                ),
                Some(ProductsAction::Update {
                    product,
                    price,
                    gst,
                    hsn,
                    stock,
                    threshold,
                }) => commands::cmd_products_update(
                    &mut session,
                    &product,
                    commands::ProductUpdate {
                        price,
                        gst_rate: gst,
                        hsn,
                        stock,
                        low_stock_threshold: threshold,
                    },
                ),
                Some(ProductsAction::Remove { product }) => {
                    commands::cmd_products_remove(&mut session, &product)
                }
            }
        }
        Commands::Clients { action } => {
            let mut session = open()?;
            match action {
                None | Some(PartyAction::List) => commands::cmd_clients_list(&session),
                Some(PartyAction::Add {
                    name,
                    gstin,
                    address,
                }) => commands::cmd_clients_add(&mut session, &name, &gstin, &address),
            }
        }
        Commands::Vendors { action } => {
            let mut session = open()?;
            match action {
                None | Some(PartyAction::List) => commands::cmd_vendors_list(&session),
                Some(PartyAction::Add {
                    name,
                    gstin,
                    address,
                }) => commands::cmd_vendors_add(&mut session, &name, &gstin, &address),
            }
        }
        Commands::Recurring { action } => {
            let mut session = open()?;
            match action {
                None | Some(RecurringAction::List) => commands::cmd_recurring_list(&session),
                Some(RecurringAction::Add {
                    document,
                    frequency,
                    start,
                    end,
                }) => commands::cmd_recurring_add(&mut session, &document, &frequency, start, end),
                Some(RecurringAction::Pause { id }) => {
                    commands::cmd_recurring_pause(&mut session, &id)
                }
                Some(RecurringAction::Resume { id }) => {
                    commands::cmd_recurring_resume(&mut session, &id)
                }
                Some(RecurringAction::Toggle { id }) => {
                    commands::cmd_recurring_toggle(&mut session, &id)
                }
                Some(RecurringAction::Delete { id }) => {
                    commands::cmd_recurring_delete(&mut session, &id)
                }
            }
        }
        Commands::Bank { action } => {
            let mut session = open()?;
            match action {
                None => commands::cmd_bank_list(&session, false),
                Some(BankAction::List { all }) => commands::cmd_bank_list(&session, all),
                Some(BankAction::Import { file }) => commands::cmd_bank_import(&mut session, &file),
                Some(BankAction::Match { id }) => commands::cmd_bank_match(&session, &id),
                Some(BankAction::Reconcile {
                    id,
                    invoice,
                    purchase,
                }) => commands::cmd_bank_reconcile(
                    &mut session,
                    &id,
                    invoice.as_deref(),
                    purchase.as_deref(),
                ),
                Some(BankAction::Expense {
                    id,
                    vendor,
                    description,
                }) => commands::cmd_bank_expense(&mut session, &id, &vendor, &description),
            }
        }
        Commands::Gst { action } => {
            let session = open()?;
            match action {
                GstAction::Summary { period } => commands::cmd_gst_summary(&session, &period),
                GstAction::Gstr1 { month, json } => {
                    commands::cmd_gstr1(&session, month.as_deref(), json)
                }
                GstAction::Gstr3b { month, json } => {
                    commands::cmd_gstr3b(&session, month.as_deref(), json)
                }
            }
        }
        Commands::Report { report_type } => {
            let session = open()?;
            match report_type {
                ReportType::Pnl { period } => commands::cmd_report_pnl(&session, &period),
                ReportType::SalesByClient { period } => {
                    commands::cmd_report_sales_by_client(&session, &period)
                }
                ReportType::SalesByItem { period } => {
                    commands::cmd_report_sales_by_item(&session, &period)
                }
                ReportType::PurchasesByVendor { period } => {
                    commands::cmd_report_purchases_by_vendor(&session, &period)
                }
                ReportType::PurchasesByItem { period } => {
                    commands::cmd_report_purchases_by_item(&session, &period)
                }
                ReportType::Stock { json } => commands::cmd_report_stock(&session, json),
            }
        }
    }
}
