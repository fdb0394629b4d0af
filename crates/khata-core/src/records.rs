//! Building invoices, quotations and purchases from drafts
//!
//! Counters are passed in and the next value is implied by the returned
//! document number; persisting the counter is the caller's job.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::GatewaySettings;
use crate::error::{Error, Result};
use crate::models::{
    new_id, BankTransaction, BusinessDetails, ClientDetails, InvoiceRecord, LineItem,
    LogisticsDetails, PaymentStatus, PriceType, PurchaseRecord, QuotationRecord,
    ReconciliationStatus, TransactionKind, TransactionType, Vendor,
};
use crate::tax;

pub const INVOICE_PREFIX: &str = "INV";
pub const QUOTATION_PREFIX: &str = "QTN";
pub const EXPENSE_PREFIX: &str = "EXP";

const PAYMENT_LINK_BASE: &str = "https://rzp.io/i/";
const PAYMENT_LINK_SLUG_LEN: usize = 14;

/// What the user fills in for an invoice or quotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub client: ClientDetails,
    pub items: Vec<LineItem>,
    pub date: NaiveDate,
    pub price_type: PriceType,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub logistics: Option<LogisticsDetails>,
    #[serde(default)]
    pub custom_field_values: Option<BTreeMap<String, String>>,
}

/// What the user fills in for a purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub bill_number: String,
    pub vendor: Vendor,
    pub items: Vec<LineItem>,
    pub date: NaiveDate,
    pub price_type: PriceType,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Document number for the document issued after `counter` earlier ones
pub fn document_number(prefix: &str, counter: u64) -> String {
    format!("{}-{:03}", prefix, counter + 1)
}

/// Placeholder payment link, only when gateway credentials are configured
pub fn payment_link(gateway: &GatewaySettings) -> Option<String> {
    if !gateway.is_configured() {
        return None;
    }
    let slug: String = uuid::Uuid::new_v4()
        .to_string()
        .chars()
        .take(PAYMENT_LINK_SLUG_LEN)
        .collect();
    Some(format!("{}{}", PAYMENT_LINK_BASE, slug))
}

/// Issue an invoice from a draft. Returns the record; the new counter is `counter + 1`.
pub fn build_invoice(
    draft: DocumentDraft,
    business: &BusinessDetails,
    counter: u64,
    gateway: &GatewaySettings,
) -> InvoiceRecord {
    let calculation_result = tax::calculate(&draft.items, draft.price_type);
    InvoiceRecord {
        id: new_id(),
        invoice_number: document_number(INVOICE_PREFIX, counter),
        client: draft.client,
        business: business.clone(),
        items: draft.items,
        date: draft.date,
        total_amount: calculation_result.grand_total,
        calculation_result,
        transaction_type: draft.transaction_type,
        price_type: draft.price_type,
        status: PaymentStatus::Unpaid,
        payment_date: None,
        payment_link: payment_link(gateway),
        logistics: draft.logistics,
        custom_field_values: draft.custom_field_values,
        reconciliation_status: None,
        reconciled_date: None,
    }
}

pub fn build_quotation(
    draft: DocumentDraft,
    business: &BusinessDetails,
    counter: u64,
) -> QuotationRecord {
    let calculation_result = tax::calculate(&draft.items, draft.price_type);
    QuotationRecord {
        id: new_id(),
        quotation_number: document_number(QUOTATION_PREFIX, counter),
        client: draft.client,
        business: business.clone(),
        items: draft.items,
        date: draft.date,
        total_amount: calculation_result.grand_total,
        calculation_result,
        transaction_type: draft.transaction_type,
        price_type: draft.price_type,
        custom_field_values: draft.custom_field_values,
    }
}

pub fn build_purchase(draft: PurchaseDraft) -> Result<PurchaseRecord> {
    let bill_number = draft.bill_number.trim().to_string();
    if bill_number.is_empty() {
        return Err(Error::InvalidData("Bill number is required".to_string()));
    }

    let calculation_result = tax::calculate(&draft.items, draft.price_type);
    Ok(PurchaseRecord {
        id: new_id(),
        bill_number,
        vendor: draft.vendor,
        items: draft.items,
        date: draft.date,
        total_amount: calculation_result.grand_total,
        calculation_result,
        transaction_type: draft.transaction_type,
        price_type: draft.price_type,
        status: draft.status,
        reconciliation_status: None,
        reconciled_date: None,
    })
}

/// Start an invoice from a quotation; the quotation itself is left alone
pub fn invoice_draft_from_quotation(quotation: &QuotationRecord, date: NaiveDate) -> DocumentDraft {
    DocumentDraft {
        client: quotation.client.clone(),
        items: quotation.items.iter().map(LineItem::with_fresh_id).collect(),
        date,
        price_type: quotation.price_type,
        transaction_type: quotation.transaction_type,
        logistics: None,
        custom_field_values: quotation.custom_field_values.clone(),
    }
}

/// A zero-tax, already-paid purchase recording an unbilled bank debit
///
/// Dated on the transaction but numbered by the day it was captured.
pub fn expense_from_transaction(
    tx: &BankTransaction,
    description: &str,
    vendor: Vendor,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<PurchaseRecord> {
    if tx.kind != TransactionKind::Debit {
        return Err(Error::Reconciliation(format!(
            "Only debit transactions can be recorded as expenses ({} is a {})",
            tx.id, tx.kind
        )));
    }

    let description = if description.trim().is_empty() {
        tx.description.clone()
    } else {
        description.trim().to_string()
    };
    let items = vec![LineItem::new(description, 1.0, tx.amount, 0.0).with_hsn("N/A")];
    let calculation_result = tax::calculate(&items, PriceType::Exclusive);

    Ok(PurchaseRecord {
        id: new_id(),
        bill_number: format!("{}-{}", EXPENSE_PREFIX, now.date_naive().format("%Y-%m-%d")),
        vendor,
        items,
        date: tx.date,
        total_amount: calculation_result.grand_total,
        calculation_result,
        transaction_type: TransactionType::IntraState,
        price_type: PriceType::Exclusive,
        status: PaymentStatus::Paid,
        reconciliation_status: Some(ReconciliationStatus::Reconciled),
        reconciled_date: Some(now),
    })
}
