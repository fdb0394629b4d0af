//! Typed load/save of the books

use tracing::debug;

use super::{write_counter, write_snapshot, Database};
use crate::books::Books;
use crate::error::Result;

pub const INVOICE_COUNTER: &str = "invoice";
pub const QUOTATION_COUNTER: &str = "quotation";

/// A persisted part of the books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Business,
    Clients,
    Vendors,
    Products,
    Invoices,
    Quotations,
    Purchases,
    RecurringProfiles,
    BankTransactions,
    /// Both document counters
    Counters,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Clients => "clients",
            Self::Vendors => "vendors",
            Self::Products => "products",
            Self::Invoices => "invoices",
            Self::Quotations => "quotations",
            Self::Purchases => "purchases",
            Self::RecurringProfiles => "recurring_profiles",
            Self::BankTransactions => "bank_transactions",
            Self::Counters => "counters",
        }
    }

    pub fn all() -> &'static [Collection] {
        &[
            Self::Business,
            Self::Clients,
            Self::Vendors,
            Self::Products,
            Self::Invoices,
            Self::Quotations,
            Self::Purchases,
            Self::RecurringProfiles,
            Self::BankTransactions,
            Self::Counters,
        ]
    }
}

impl Database {
    /// Load the whole books; missing collections start empty
    pub fn load_books(&self) -> Result<Books> {
        let books = Books {
            business: self.load_snapshot(Collection::Business.as_str())?.unwrap_or_default(),
            clients: self.load_snapshot(Collection::Clients.as_str())?.unwrap_or_default(),
            vendors: self.load_snapshot(Collection::Vendors.as_str())?.unwrap_or_default(),
            products: self.load_snapshot(Collection::Products.as_str())?.unwrap_or_default(),
            invoices: self.load_snapshot(Collection::Invoices.as_str())?.unwrap_or_default(),
            quotations: self.load_snapshot(Collection::Quotations.as_str())?.unwrap_or_default(),
            purchases: self.load_snapshot(Collection::Purchases.as_str())?.unwrap_or_default(),
            recurring_profiles: self
                .load_snapshot(Collection::RecurringProfiles.as_str())?
                .unwrap_or_default(),
            bank_transactions: self
                .load_snapshot(Collection::BankTransactions.as_str())?
                .unwrap_or_default(),
            invoice_counter: self.counter(INVOICE_COUNTER)?,
            quotation_counter: self.counter(QUOTATION_COUNTER)?,
        };

        debug!(
            "Loaded books: {} invoices, {} purchases, {} products, {} recurring profiles",
            books.invoices.len(),
            books.purchases.len(),
            books.products.len(),
            books.recurring_profiles.len()
        );
        Ok(books)
    }

    /// Write the given collections in a single transaction
    pub fn save_collections(&self, books: &Books, collections: &[Collection]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for collection in collections {
            let key = collection.as_str();
            match collection {
                Collection::Business => write_snapshot(&tx, key, &books.business)?,
                Collection::Clients => write_snapshot(&tx, key, &books.clients)?,
                Collection::Vendors => write_snapshot(&tx, key, &books.vendors)?,
                Collection::Products => write_snapshot(&tx, key, &books.products)?,
                Collection::Invoices => write_snapshot(&tx, key, &books.invoices)?,
                Collection::Quotations => write_snapshot(&tx, key, &books.quotations)?,
                Collection::Purchases => write_snapshot(&tx, key, &books.purchases)?,
                Collection::RecurringProfiles => {
                    write_snapshot(&tx, key, &books.recurring_profiles)?
                }
                Collection::BankTransactions => {
                    write_snapshot(&tx, key, &books.bank_transactions)?
                }
                Collection::Counters => {
                    write_counter(&tx, INVOICE_COUNTER, books.invoice_counter)?;
                    write_counter(&tx, QUOTATION_COUNTER, books.quotation_counter)?;
                }
            }
        }

        tx.commit()?;
        debug!("Saved {} collection(s)", collections.len());
        Ok(())
    }

    /// Write every collection
    #[cfg(test)]
    pub(crate) fn save_books(&self, books: &Books) -> Result<()> {
        self.save_collections(books, Collection::all())
    }
}
