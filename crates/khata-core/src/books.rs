//! The in-memory books and every operation that changes them
//!
//! `Books` holds all collections plus the document counters. Methods here
//! keep cross-record rules in one place: issuing an invoice consumes a number
//! and moves stock, reconciling a bank line settles the record it matched,
//! and so on. Persisting is left to [`crate::session::Session`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GatewaySettings;
use crate::error::{Error, Result};
use crate::models::{
    new_id, BankTransaction, BusinessDetails, CalculationResult, ClientDetails, Frequency,
    InvoiceRecord, LineItem, PaymentStatus, PriceType, Product, ProfileStatus, PurchaseRecord,
    QuotationRecord, ReconciliationStatus, RecurringProfile, TransactionType, Vendor,
};
use crate::reconcile::{self, MatchTarget, Matches};
use crate::records::{self, DocumentDraft, PurchaseDraft};
use crate::scheduler::{self, SchedulerInput, SchedulerOutcome};
use crate::stock::{self, StockDirection};
use crate::tax;

/// Every collection of a single business
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Books {
    pub business: BusinessDetails,
    pub clients: Vec<ClientDetails>,
    pub vendors: Vec<Vendor>,
    pub products: Vec<Product>,
    /// Newest first
    pub invoices: Vec<InvoiceRecord>,
    /// Newest first
    pub quotations: Vec<QuotationRecord>,
    /// Newest first
    pub purchases: Vec<PurchaseRecord>,
    pub recurring_profiles: Vec<RecurringProfile>,
    /// Newest import first
    pub bank_transactions: Vec<BankTransaction>,
    /// Invoices issued so far
    pub invoice_counter: u64,
    /// Quotations issued so far
    pub quotation_counter: u64,
}

/// What the user fills in for a recurring profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub client: ClientDetails,
    pub items: Vec<LineItem>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Defaults to the start date
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    pub price_type: PriceType,
    pub transaction_type: TransactionType,
}

/// Outcome of adding a statement's transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub duplicates: usize,
}

/// Totals that overflowed to infinity cannot be stored and are refused
fn ensure_finite(result: &CalculationResult, document: &str) -> Result<()> {
    if result.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "Totals for {} are out of range",
            document
        )))
    }
}

fn ensure_finite_product(product: &Product) -> Result<()> {
    if product.has_finite_amounts() {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "Product '{}' has a price, rate or stock that is not a number",
            product.name
        )))
    }
}

impl Books {
    // ========== Invoices ==========

    /// Issue an invoice: number it, take its items out of stock, file it
    pub fn issue_invoice(
        &mut self,
        draft: DocumentDraft,
        gateway: &GatewaySettings,
    ) -> Result<InvoiceRecord> {
        let invoice = records::build_invoice(draft, &self.business, self.invoice_counter, gateway);
        ensure_finite(&invoice.calculation_result, &invoice.invoice_number)?;
        self.invoice_counter += 1;
        self.products =
            stock::apply_stock_delta(&self.products, &invoice.items, StockDirection::Decrement);
        self.invoices.insert(0, invoice.clone());
        info!("Issued invoice {}", invoice.invoice_number);
        Ok(invoice)
    }

    /// Find an invoice by id or invoice number
    pub fn find_invoice(&self, key: &str) -> Option<&InvoiceRecord> {
        self.invoices
            .iter()
            .find(|i| i.id == key || i.invoice_number.eq_ignore_ascii_case(key))
    }

    fn invoice_mut(&mut self, key: &str) -> Result<&mut InvoiceRecord> {
        self.invoices
            .iter_mut()
            .find(|i| i.id == key || i.invoice_number.eq_ignore_ascii_case(key))
            .ok_or_else(|| Error::NotFound(format!("Invoice {}", key)))
    }

    pub fn mark_invoice_paid(&mut self, key: &str, now: DateTime<Utc>) -> Result<&InvoiceRecord> {
        let invoice = self.invoice_mut(key)?;
        invoice.mark_paid(now);
        Ok(&*invoice)
    }

    pub fn mark_invoice_unpaid(&mut self, key: &str) -> Result<&InvoiceRecord> {
        let invoice = self.invoice_mut(key)?;
        invoice.mark_unpaid();
        Ok(&*invoice)
    }

    // ========== Quotations ==========

    pub fn issue_quotation(&mut self, draft: DocumentDraft) -> Result<QuotationRecord> {
        let quotation = records::build_quotation(draft, &self.business, self.quotation_counter);
        ensure_finite(&quotation.calculation_result, &quotation.quotation_number)?;
        self.quotation_counter += 1;
        self.quotations.insert(0, quotation.clone());
        info!("Issued quotation {}", quotation.quotation_number);
        Ok(quotation)
    }

    pub fn find_quotation(&self, key: &str) -> Option<&QuotationRecord> {
        self.quotations
            .iter()
            .find(|q| q.id == key || q.quotation_number.eq_ignore_ascii_case(key))
    }

    /// Turn a quotation into an invoice dated `date`. The quotation is kept.
    pub fn convert_quotation(
        &mut self,
        key: &str,
        date: NaiveDate,
        gateway: &GatewaySettings,
    ) -> Result<InvoiceRecord> {
        let quotation = self
            .find_quotation(key)
            .ok_or_else(|| Error::NotFound(format!("Quotation {}", key)))?;
        let draft = records::invoice_draft_from_quotation(quotation, date);
        debug!("Converting quotation {}", quotation.quotation_number);
        self.issue_invoice(draft, gateway)
    }

    // ========== Purchases ==========

    /// Record a purchase bill and add its items to stock
    pub fn record_purchase(&mut self, draft: PurchaseDraft) -> Result<PurchaseRecord> {
        let purchase = records::build_purchase(draft)?;
        ensure_finite(&purchase.calculation_result, &purchase.bill_number)?;
        self.products =
            stock::apply_stock_delta(&self.products, &purchase.items, StockDirection::Increment);
        self.purchases.insert(0, purchase.clone());
        info!("Recorded purchase {}", purchase.bill_number);
        Ok(purchase)
    }

    /// Position of a purchase by id, or by a bill number only one purchase carries
    fn purchase_index(&self, key: &str) -> Result<usize> {
        if let Some(idx) = self.purchases.iter().position(|p| p.id == key) {
            return Ok(idx);
        }
        let mut found = self
            .purchases
            .iter()
            .enumerate()
            .filter(|(_, p)| p.bill_number == key)
            .map(|(idx, _)| idx);
        match (found.next(), found.count()) {
            (Some(idx), 0) => Ok(idx),
            (Some(_), more) => Err(Error::InvalidData(format!(
                "Bill number {} is shared by {} purchases; use the purchase id",
                key,
                more + 1
            ))),
            (None, _) => Err(Error::NotFound(format!("Purchase {}", key))),
        }
    }

    /// Find a purchase by id or bill number
    pub fn find_purchase(&self, key: &str) -> Result<&PurchaseRecord> {
        let idx = self.purchase_index(key)?;
        Ok(&self.purchases[idx])
    }

    pub fn mark_purchase_paid(&mut self, key: &str) -> Result<&PurchaseRecord> {
        let idx = self.purchase_index(key)?;
        let purchase = &mut self.purchases[idx];
        purchase.status = PaymentStatus::Paid;
        Ok(&*purchase)
    }

    // ========== Catalog ==========

    pub fn set_business(&mut self, business: BusinessDetails) {
        self.business = business;
    }

    pub fn add_product(&mut self, mut product: Product) -> Result<Product> {
        product.name = product.name.trim().to_string();
        if product.name.is_empty() {
            return Err(Error::InvalidData("Product name is required".to_string()));
        }
        ensure_finite_product(&product)?;
        if self.find_product(&product.name).is_some() {
            return Err(Error::InvalidData(format!(
                "Product '{}' already exists",
                product.name
            )));
        }
        if product.id.is_empty() {
            product.id = new_id();
        }
        self.products.push(product.clone());
        Ok(product)
    }

    pub fn update_product(&mut self, product: Product) -> Result<()> {
        ensure_finite_product(&product)?;
        let existing = self
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| Error::NotFound(format!("Product {}", product.id)))?;
        *existing = product;
        Ok(())
    }

    pub fn remove_product(&mut self, key: &str) -> Result<Product> {
        let idx = self
            .products
            .iter()
            .position(|p| p.id == key || p.name.to_lowercase() == key.to_lowercase())
            .ok_or_else(|| Error::NotFound(format!("Product {}", key)))?;
        Ok(self.products.remove(idx))
    }

    /// Find a product by id or name (case-insensitive)
    pub fn find_product(&self, key: &str) -> Option<&Product> {
        let lower = key.to_lowercase();
        self.products
            .iter()
            .find(|p| p.id == key || p.name.to_lowercase() == lower)
    }

    pub fn add_client(&mut self, mut client: ClientDetails) -> Result<ClientDetails> {
        client.name = client.name.trim().to_string();
        if client.name.is_empty() {
            return Err(Error::InvalidData("Client name is required".to_string()));
        }
        if client.id.is_empty() {
            client.id = new_id();
        }
        self.clients.push(client.clone());
        Ok(client)
    }

    /// Find a client by id or name (case-insensitive)
    pub fn find_client(&self, key: &str) -> Option<&ClientDetails> {
        let lower = key.to_lowercase();
        self.clients
            .iter()
            .find(|c| c.id == key || c.name.to_lowercase() == lower)
    }

    pub fn add_vendor(&mut self, mut vendor: Vendor) -> Result<Vendor> {
        vendor.name = vendor.name.trim().to_string();
        if vendor.name.is_empty() {
            return Err(Error::InvalidData("Vendor name is required".to_string()));
        }
        if vendor.id.is_empty() {
            vendor.id = new_id();
        }
        self.vendors.push(vendor.clone());
        Ok(vendor)
    }

    /// Find a vendor by id or name (case-insensitive)
    pub fn find_vendor(&self, key: &str) -> Option<&Vendor> {
        let lower = key.to_lowercase();
        self.vendors
            .iter()
            .find(|v| v.id == key || v.name.to_lowercase() == lower)
    }

    // ========== Recurring profiles ==========

    pub fn add_recurring_profile(&mut self, draft: ProfileDraft) -> Result<RecurringProfile> {
        if let Frequency::Unrecognized(raw) = &draft.frequency {
            return Err(Error::InvalidData(format!("Unknown frequency: {}", raw)));
        }
        if let Some(end_date) = draft.end_date {
            if end_date < draft.start_date {
                return Err(Error::InvalidData(format!(
                    "End date {} is before start date {}",
                    end_date, draft.start_date
                )));
            }
        }

        ensure_finite(
            &tax::calculate(&draft.items, draft.price_type),
            "the recurring profile",
        )?;

        let profile = RecurringProfile {
            id: new_id(),
            client: draft.client,
            items: draft.items,
            frequency: draft.frequency,
            start_date: draft.start_date,
            end_date: draft.end_date,
            last_generated_date: None,
            next_due_date: draft.next_due_date.unwrap_or(draft.start_date),
            status: ProfileStatus::Active,
            price_type: draft.price_type,
            transaction_type: draft.transaction_type,
        };
        self.recurring_profiles.push(profile.clone());
        Ok(profile)
    }

    pub fn find_profile(&self, id: &str) -> Option<&RecurringProfile> {
        self.recurring_profiles.iter().find(|p| p.id == id)
    }

    pub fn set_profile_status(&mut self, id: &str, status: ProfileStatus) -> Result<()> {
        let profile = self
            .recurring_profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("Recurring profile {}", id)))?;
        profile.status = status;
        Ok(())
    }

    /// Flip a profile between active and paused, returning the new status
    pub fn toggle_profile(&mut self, id: &str) -> Result<ProfileStatus> {
        let status = match self.find_profile(id) {
            Some(p) if p.is_active() => ProfileStatus::Paused,
            Some(_) => ProfileStatus::Active,
            None => return Err(Error::NotFound(format!("Recurring profile {}", id))),
        };
        self.set_profile_status(id, status)?;
        Ok(status)
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<RecurringProfile> {
        let idx = self
            .recurring_profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("Recurring profile {}", id)))?;
        Ok(self.recurring_profiles.remove(idx))
    }

    /// Run the recurring catch-up and fold its outcome into the books
    pub(crate) fn run_scheduler(
        &mut self,
        reference_date: NaiveDate,
        gateway: &GatewaySettings,
    ) -> SchedulerOutcome {
        let outcome = scheduler::advance_profiles(SchedulerInput {
            profiles: &self.recurring_profiles,
            products: &self.products,
            business: &self.business,
            invoice_counter: self.invoice_counter,
            gateway,
            reference_date,
        });

        if outcome.has_changes() {
            self.recurring_profiles = outcome.profiles.clone();
            self.products = outcome.products.clone();
            self.invoice_counter = outcome.invoice_counter;
            // Generated oldest first; history is newest first
            for invoice in &outcome.invoices {
                self.invoices.insert(0, invoice.clone());
            }
        }

        outcome
    }

    // ========== Banking ==========

    /// Add imported transactions, skipping any already imported
    pub fn add_bank_transactions(&mut self, transactions: Vec<BankTransaction>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let existing: std::collections::HashSet<String> = self
            .bank_transactions
            .iter()
            .filter_map(|t| t.import_hash.clone())
            .collect();

        let mut fresh = Vec::with_capacity(transactions.len());
        for tx in transactions {
            match &tx.import_hash {
                Some(hash) if existing.contains(hash) => summary.duplicates += 1,
                _ => {
                    summary.added += 1;
                    fresh.push(tx);
                }
            }
        }

        fresh.append(&mut self.bank_transactions);
        self.bank_transactions = fresh;

        info!(
            "Imported {} bank transaction(s), {} duplicate(s) skipped",
            summary.added, summary.duplicates
        );
        summary
    }

    pub fn find_bank_transaction(&self, id: &str) -> Option<&BankTransaction> {
        self.bank_transactions.iter().find(|t| t.id == id)
    }

    fn open_transaction(&self, id: &str) -> Result<&BankTransaction> {
        let tx = self
            .find_bank_transaction(id)
            .ok_or_else(|| Error::NotFound(format!("Bank transaction {}", id)))?;
        if tx.is_reconciled() {
            return Err(Error::Reconciliation(format!(
                "Bank transaction {} is already reconciled",
                id
            )));
        }
        Ok(tx)
    }

    /// Candidate records a bank transaction could settle
    pub fn matches_for(&self, tx_id: &str) -> Result<Matches<'_>> {
        let tx = self
            .find_bank_transaction(tx_id)
            .ok_or_else(|| Error::NotFound(format!("Bank transaction {}", tx_id)))?;
        Ok(reconcile::find_matches(tx, &self.invoices, &self.purchases))
    }

    /// Settle a record with a bank transaction
    ///
    /// The target has to be one of the transaction's current candidates.
    pub fn reconcile(&mut self, tx_id: &str, target: &MatchTarget, now: DateTime<Utc>) -> Result<()> {
        let tx = self.open_transaction(tx_id)?;
        let matches = reconcile::find_matches(tx, &self.invoices, &self.purchases);
        if !matches.contains(target) {
            return Err(Error::Reconciliation(format!(
                "{} is not a match for bank transaction {}",
                target, tx_id
            )));
        }

        match target {
            MatchTarget::Invoice(id) => {
                let invoice = self.invoice_mut(id)?;
                invoice.mark_paid(now);
                invoice.reconciliation_status = Some(ReconciliationStatus::Reconciled);
                invoice.reconciled_date = Some(now);
            }
            MatchTarget::Purchase(id) => {
                let purchase = self
                    .purchases
                    .iter_mut()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| Error::NotFound(format!("Purchase {}", id)))?;
                purchase.status = PaymentStatus::Paid;
                purchase.reconciliation_status = Some(ReconciliationStatus::Reconciled);
                purchase.reconciled_date = Some(now);
            }
        }

        if let Some(tx) = self.bank_transactions.iter_mut().find(|t| t.id == tx_id) {
            tx.status = ReconciliationStatus::Reconciled;
        }
        info!("Reconciled bank transaction {} with {}", tx_id, target);
        Ok(())
    }

    /// Record an unbilled bank debit as a paid expense and reconcile it
    pub fn record_expense(
        &mut self,
        tx_id: &str,
        description: &str,
        vendor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PurchaseRecord> {
        let vendor = self
            .find_vendor(vendor_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Vendor {}", vendor_id)))?;
        let tx = self.open_transaction(tx_id)?;
        let expense = records::expense_from_transaction(tx, description, vendor, now)?;

        self.purchases.insert(0, expense.clone());
        if let Some(tx) = self.bank_transactions.iter_mut().find(|t| t.id == tx_id) {
            tx.status = ReconciliationStatus::Reconciled;
        }
        info!("Recorded expense {} from bank transaction {}", expense.bill_number, tx_id);
        Ok(expense)
    }

    /// Transactions still waiting to be reconciled
    pub fn unreconciled(&self) -> impl Iterator<Item = &BankTransaction> {
        self.bank_transactions.iter().filter(|t| !t.is_reconciled())
    }
}
