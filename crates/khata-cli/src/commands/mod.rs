//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `banking` - Statement import, matching, reconciliation and expenses
//! - `catalog` - Business details, products, clients and vendors
//! - `core` - Init, calc and shared utilities (open_db, open_session, item parsing)
//! - `invoices` - Invoice commands (list, new, show, paid, unpaid)
//! - `purchases` - Purchase bill commands
//! - `quotations` - Quotation commands (list, new, convert)
//! - `recurring` - Recurring profile commands
//! - `reports` - Dashboard, GST returns and business reports
//! - `status` - Database status and start-up billing summary

pub mod banking;
pub mod catalog;
pub mod core;
pub mod invoices;
pub mod purchases;
pub mod quotations;
pub mod recurring;
pub mod reports;
pub mod status;

// Re-export command functions for main.rs
pub use banking::*;
pub use catalog::*;
pub use core::*;
pub use invoices::*;
pub use purchases::*;
pub use quotations::*;
pub use recurring::*;
pub use reports::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
