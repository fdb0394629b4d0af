//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Khata - GST bookkeeping for small businesses
#[derive(Parser)]
#[command(name = "khata")]
#[command(about = "Invoices, purchases, GST returns and bank reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "khata.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set KHATA_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Treat this date (YYYY-MM-DD) as today for recurring billing and reports
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Reporting window shared by dashboard and report commands
#[derive(Args, Clone, Debug)]
pub struct PeriodArgs {
    /// Period: this-month, last-month, this-year, this-fy, last-30-days,
    /// last-90-days, last-12-months, all
    #[arg(short, long, default_value = "this-month")]
    pub period: String,

    /// Custom start date (YYYY-MM-DD), overrides --period
    #[arg(long)]
    pub from: Option<String>,

    /// Custom end date (YYYY-MM-DD), overrides --period
    #[arg(long)]
    pub to: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Fields shared by invoices, quotations and recurring profiles
#[derive(Args, Clone, Debug)]
pub struct DocumentArgs {
    /// Client name (looked up in the client list, otherwise used as-is)
    #[arg(short, long)]
    pub client: String,

    /// Line item: "desc=Widget;qty=2;price=150;gst=18;hsn=8471"
    ///
    /// Price, GST rate and HSN default to the catalog product with the
    /// same name when omitted.
    #[arg(short, long = "item", required = true)]
    pub items: Vec<String>,

    /// Prices already include GST
    #[arg(long)]
    pub inclusive: bool,

    /// Inter-state supply (IGST instead of CGST + SGST)
    #[arg(long)]
    pub inter_state: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status and what start-up billing did
    Status,

    /// Show the dashboard
    Dashboard {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Calculate GST for a set of line items without saving anything
    Calc {
        /// Line item: "desc=Widget;qty=2;price=150;gst=18"
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// Prices already include GST
        #[arg(long)]
        inclusive: bool,

        /// Inter-state supply (IGST instead of CGST + SGST)
        #[arg(long)]
        inter_state: bool,
    },

    /// Show or update the business details printed on documents
    Business {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        gstin: Option<String>,

        #[arg(long)]
        address: Option<String>,

        /// Terms and conditions
        #[arg(long)]
        terms: Option<String>,

        /// Bank details for payment
        #[arg(long)]
        bank_details: Option<String>,
    },

    /// Manage invoices (list, new, show, paid, unpaid)
    Invoices {
        #[command(subcommand)]
        action: Option<InvoicesAction>,
    },

    /// Manage quotations (list, new, convert)
    Quotes {
        #[command(subcommand)]
        action: Option<QuotesAction>,
    },

    /// Manage purchase bills (list, new, paid)
    Purchases {
        #[command(subcommand)]
        action: Option<PurchasesAction>,
    },

    /// Manage the product catalog
    Products {
        #[command(subcommand)]
        action: Option<ProductsAction>,
    },

    /// Manage clients
    Clients {
        #[command(subcommand)]
        action: Option<PartyAction>,
    },

    /// Manage vendors
    Vendors {
        #[command(subcommand)]
        action: Option<PartyAction>,
    },

    /// Manage recurring invoice profiles
    Recurring {
        #[command(subcommand)]
        action: Option<RecurringAction>,
    },

    /// Bank statement import and reconciliation
    Bank {
        #[command(subcommand)]
        action: Option<BankAction>,
    },

    /// GST return summaries
    Gst {
        #[command(subcommand)]
        action: GstAction,
    },

    /// Business reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum InvoicesAction {
    /// List invoices, newest first
    List {
        /// Maximum number of invoices to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only unpaid invoices
        #[arg(long)]
        unpaid: bool,
    },

    /// Issue a new invoice
    New {
        #[command(flatten)]
        document: DocumentArgs,

        /// Invoice date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Transporter name
        #[arg(long)]
        transporter: Option<String>,

        /// Transporter ID
        #[arg(long)]
        transporter_id: Option<String>,

        /// Vehicle number
        #[arg(long)]
        vehicle: Option<String>,

        /// E-way bill number
        #[arg(long)]
        eway_bill: Option<String>,

        /// Custom field value: "custom_field_1=PO-4411"
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Show an invoice with its GST breakdown
    Show {
        /// Invoice number or ID
        invoice: String,
    },

    /// Mark an invoice as paid
    Paid {
        /// Invoice number or ID
        invoice: String,
    },

    /// Mark an invoice as unpaid
    Unpaid {
        /// Invoice number or ID
        invoice: String,
    },
}

#[derive(Subcommand)]
pub enum QuotesAction {
    /// List quotations
    List,

    /// Create a quotation
    New {
        #[command(flatten)]
        document: DocumentArgs,

        /// Quotation date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Issue an invoice from a quotation
    Convert {
        /// Quotation number or ID
        quotation: String,

        /// Invoice date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
pub enum PurchasesAction {
    /// List purchase bills, newest first
    List {
        /// Maximum number of bills to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Record a purchase bill (adds to stock)
    New {
        /// Vendor name (looked up in the vendor list, otherwise used as-is)
        #[arg(long)]
        vendor: String,

        /// Supplier's bill number
        #[arg(short, long)]
        bill: String,

        /// Line item: "desc=Widget;qty=10;price=300;gst=18"
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// Bill date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Prices already include GST
        #[arg(long)]
        inclusive: bool,

        /// Inter-state supply (IGST instead of CGST + SGST)
        #[arg(long)]
        inter_state: bool,

        /// Bill is already paid
        #[arg(long)]
        paid: bool,
    },

    /// Mark a purchase bill as paid
    Paid {
        /// Bill number or ID
        bill: String,
    },
}

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products with stock levels
    List,

    /// Add a product or service
    Add {
        /// Product name
        name: String,

        /// Unit price
        #[arg(long, value_parser = finite_number)]
        price: f64,

        /// GST rate (0, 5, 12, 18 or 28)
        #[arg(long, default_value = "18", value_parser = finite_number)]
        gst: f64,

        /// HSN/SAC code
        #[arg(long, default_value = "")]
        hsn: String,

        /// Opening stock; omit for services
        #[arg(long, value_parser = finite_number)]
        stock: Option<f64>,

        /// Low-stock warning threshold
        #[arg(long, default_value = "0", value_parser = finite_number)]
        threshold: f64,
    },

    /// Set a product's price, rate or stock
    Update {
        /// Product name or ID
        product: String,

        #[arg(long, value_parser = finite_number)]
        price: Option<f64>,

        #[arg(long, value_parser = finite_number)]
        gst: Option<f64>,

        #[arg(long)]
        hsn: Option<String>,

        /// Stock on hand
        #[arg(long, value_parser = finite_number)]
        stock: Option<f64>,

        #[arg(long, value_parser = finite_number)]
        threshold: Option<f64>,
    },

    /// Remove a product
    Remove {
        /// Product name or ID
        product: String,
    },
}

#[derive(Subcommand)]
pub enum PartyAction {
    /// List entries
    List,

    /// Add an entry
    Add {
        /// Name
        name: String,

        /// GSTIN (leave empty for unregistered)
        #[arg(long, default_value = "")]
        gstin: String,

        /// Address
        #[arg(long, default_value = "")]
        address: String,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// List recurring profiles
    List,

    /// Add a recurring profile
    Add {
        #[command(flatten)]
        document: DocumentArgs,

        /// Frequency: monthly, quarterly, yearly
        #[arg(short, long, default_value = "monthly")]
        frequency: String,

        /// First billing date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last date a cycle may fall on (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Pause a profile
    Pause {
        /// Profile ID
        id: String,
    },

    /// Resume a paused profile
    Resume {
        /// Profile ID
        id: String,
    },

    /// Switch a profile between active and paused
    Toggle {
        /// Profile ID
        id: String,
    },

    /// Delete a profile (issued invoices are kept)
    Delete {
        /// Profile ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum BankAction {
    /// Import a bank statement CSV
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List bank transactions
    List {
        /// Include reconciled transactions
        #[arg(short, long)]
        all: bool,
    },

    /// Show invoices and bills whose amount matches a transaction
    Match {
        /// Bank transaction ID
        id: String,
    },

    /// Reconcile a transaction against an invoice or purchase bill
    Reconcile {
        /// Bank transaction ID
        id: String,

        /// Invoice number or ID (for credits)
        #[arg(long, conflicts_with = "purchase")]
        invoice: Option<String>,

        /// Bill number or ID (for debits)
        #[arg(long)]
        purchase: Option<String>,
    },

    /// Record an unmatched debit as a paid expense
    Expense {
        /// Bank transaction ID
        id: String,

        /// Vendor name or ID
        #[arg(long)]
        vendor: String,

        /// Expense description
        #[arg(short, long)]
        description: String,
    },
}

#[derive(Subcommand)]
pub enum GstAction {
    /// Tax collected per rate with the CGST/SGST/IGST split
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// GSTR-1 outward supplies summary for one month
    Gstr1 {
        /// Filing month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// GSTR-3B summary return for one month
    Gstr3b {
        /// Filing month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Profit and loss
    Pnl {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Invoiced totals per client
    SalesByClient {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Quantity and value sold per item
    SalesByItem {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Purchase totals per vendor
    PurchasesByVendor {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Quantity and value bought per item
    PurchasesByItem {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Stock on hand and value per tracked product
    Stock {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Amounts and stock levels; `inf` and `NaN` parse as `f64` but cannot be stored
pub fn finite_number(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", raw))
    }
}
