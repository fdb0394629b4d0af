//! A running Khata session
//!
//! Opening a session loads the books, runs the recurring catch-up exactly
//! once and persists what it generated. Every later change goes through a
//! `Session` method that writes the touched collections straight away.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::books::{Books, ImportSummary, ProfileDraft};
use crate::config::Settings;
use crate::db::{Collection, Database};
use crate::error::Result;
use crate::models::{
    BankTransaction, BusinessDetails, ClientDetails, InvoiceRecord, Product, ProfileStatus,
    PurchaseRecord, QuotationRecord, RecurringProfile, Vendor,
};
use crate::reconcile::MatchTarget;
use crate::records::{DocumentDraft, PurchaseDraft};
use crate::scheduler::SchedulerOutcome;

pub struct Session {
    db: Database,
    settings: Settings,
    books: Books,
    today: NaiveDate,
    boot: SchedulerOutcome,
}

impl Session {
    /// Load the books and bring recurring profiles up to `today`
    pub fn open(db: Database, settings: Settings, today: NaiveDate) -> Result<Self> {
        let mut books = db.load_books()?;
        let boot = books.run_scheduler(today, &settings.gateway);

        for diagnostic in &boot.diagnostics {
            warn!("Recurring billing: {}", diagnostic);
        }

        if boot.has_changes() {
            db.save_collections(
                &books,
                &[
                    Collection::Invoices,
                    Collection::RecurringProfiles,
                    Collection::Products,
                    Collection::Counters,
                ],
            )?;
            info!(
                "Recurring billing caught up: {} invoice(s), {} profile(s) paused",
                boot.invoices.len(),
                boot.paused.len()
            );
        }

        Ok(Self {
            db,
            settings,
            books,
            today,
            boot,
        })
    }

    pub fn books(&self) -> &Books {
        &self.books
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The reference date this session was opened with
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// What the start-up catch-up did
    pub fn boot_outcome(&self) -> &SchedulerOutcome {
        &self.boot
    }

    fn persist(&self, collections: &[Collection]) -> Result<()> {
        self.db.save_collections(&self.books, collections)
    }

    // ========== Documents ==========

    pub fn issue_invoice(&mut self, draft: DocumentDraft) -> Result<InvoiceRecord> {
        let invoice = self.books.issue_invoice(draft, &self.settings.gateway)?;
        self.persist(&[
            Collection::Invoices,
            Collection::Products,
            Collection::Counters,
        ])?;
        Ok(invoice)
    }

    pub fn mark_invoice_paid(&mut self, key: &str, now: DateTime<Utc>) -> Result<InvoiceRecord> {
        let invoice = self.books.mark_invoice_paid(key, now)?.clone();
        self.persist(&[Collection::Invoices])?;
        Ok(invoice)
    }

    pub fn mark_invoice_unpaid(&mut self, key: &str) -> Result<InvoiceRecord> {
        let invoice = self.books.mark_invoice_unpaid(key)?.clone();
        self.persist(&[Collection::Invoices])?;
        Ok(invoice)
    }

    pub fn issue_quotation(&mut self, draft: DocumentDraft) -> Result<QuotationRecord> {
        let quotation = self.books.issue_quotation(draft)?;
        self.persist(&[Collection::Quotations, Collection::Counters])?;
        Ok(quotation)
    }

    pub fn convert_quotation(&mut self, key: &str, date: NaiveDate) -> Result<InvoiceRecord> {
        let invoice = self
            .books
            .convert_quotation(key, date, &self.settings.gateway)?;
        self.persist(&[
            Collection::Invoices,
            Collection::Products,
            Collection::Counters,
        ])?;
        Ok(invoice)
    }

    pub fn record_purchase(&mut self, draft: PurchaseDraft) -> Result<PurchaseRecord> {
        let purchase = self.books.record_purchase(draft)?;
        self.persist(&[Collection::Purchases, Collection::Products])?;
        Ok(purchase)
    }

    pub fn mark_purchase_paid(&mut self, key: &str) -> Result<PurchaseRecord> {
        let purchase = self.books.mark_purchase_paid(key)?.clone();
        self.persist(&[Collection::Purchases])?;
        Ok(purchase)
    }

    // ========== Catalog ==========

    pub fn set_business(&mut self, business: BusinessDetails) -> Result<()> {
        self.books.set_business(business);
        self.persist(&[Collection::Business])
    }

    pub fn add_product(&mut self, product: Product) -> Result<Product> {
        let product = self.books.add_product(product)?;
        self.persist(&[Collection::Products])?;
        Ok(product)
    }

    pub fn update_product(&mut self, product: Product) -> Result<()> {
        self.books.update_product(product)?;
        self.persist(&[Collection::Products])
    }

    pub fn remove_product(&mut self, key: &str) -> Result<Product> {
        let product = self.books.remove_product(key)?;
        self.persist(&[Collection::Products])?;
        Ok(product)
    }

    pub fn add_client(&mut self, client: ClientDetails) -> Result<ClientDetails> {
        let client = self.books.add_client(client)?;
        self.persist(&[Collection::Clients])?;
        Ok(client)
    }

    pub fn add_vendor(&mut self, vendor: Vendor) -> Result<Vendor> {
        let vendor = self.books.add_vendor(vendor)?;
        self.persist(&[Collection::Vendors])?;
        Ok(vendor)
    }

    // ========== Recurring profiles ==========

    pub fn add_recurring_profile(&mut self, draft: ProfileDraft) -> Result<RecurringProfile> {
        let profile = self.books.add_recurring_profile(draft)?;
        self.persist(&[Collection::RecurringProfiles])?;
        Ok(profile)
    }

    pub fn set_profile_status(&mut self, id: &str, status: ProfileStatus) -> Result<()> {
        self.books.set_profile_status(id, status)?;
        self.persist(&[Collection::RecurringProfiles])
    }

    pub fn toggle_profile(&mut self, id: &str) -> Result<ProfileStatus> {
        let status = self.books.toggle_profile(id)?;
        self.persist(&[Collection::RecurringProfiles])?;
        Ok(status)
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<RecurringProfile> {
        let profile = self.books.delete_profile(id)?;
        self.persist(&[Collection::RecurringProfiles])?;
        Ok(profile)
    }

    // ========== Banking ==========

    pub fn import_statement(&mut self, transactions: Vec<BankTransaction>) -> Result<ImportSummary> {
        let summary = self.books.add_bank_transactions(transactions);
        if summary.added > 0 {
            self.persist(&[Collection::BankTransactions])?;
        }
        Ok(summary)
    }

    pub fn reconcile(&mut self, tx_id: &str, target: &MatchTarget, now: DateTime<Utc>) -> Result<()> {
        self.books.reconcile(tx_id, target, now)?;
        let record = match target {
            MatchTarget::Invoice(_) => Collection::Invoices,
            MatchTarget::Purchase(_) => Collection::Purchases,
        };
        self.persist(&[Collection::BankTransactions, record])
    }

    pub fn record_expense(
        &mut self,
        tx_id: &str,
        description: &str,
        vendor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PurchaseRecord> {
        let expense = self.books.record_expense(tx_id, description, vendor_id, now)?;
        self.persist(&[Collection::BankTransactions, Collection::Purchases])?;
        Ok(expense)
    }
}
