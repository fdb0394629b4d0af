//! Khata Core Library
//!
//! Bookkeeping for a single GST-registered business:
//! - GST calculation (tax-exclusive and tax-inclusive pricing, CGST/SGST/IGST split)
//! - Invoices, quotations and purchase bills
//! - Recurring billing with start-up catch-up
//! - Inventory stock adjustment
//! - Bank statement import and reconciliation
//! - Dashboard, GST return summaries and business reports
//! - Encrypted SQLite persistence

pub mod books;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod reconcile;
pub mod records;
pub mod reports;
pub mod scheduler;
pub mod session;
pub mod stock;
pub mod tax;

pub use books::{Books, ImportSummary, ProfileDraft};
pub use config::{Settings, Template};
pub use db::{Collection, Database};
pub use error::{Error, Result};
pub use reconcile::{MatchTarget, Matches};
pub use records::{DocumentDraft, PurchaseDraft};
pub use reports::DateRange;
pub use scheduler::{SchedulerDiagnostic, SchedulerInput, SchedulerOutcome};
pub use session::Session;
pub use stock::{StockDirection, StockStatus};
pub use tax::{RateSummary, TaxHeads};
