//! Bank reconciliation matching
//!
//! A bank credit can settle an unpaid invoice and a bank debit can settle an
//! unpaid purchase when the amounts agree to within a paisa. Matching is a
//! pure lookup; applying a match is done by [`crate::books::Books::reconcile`].

use serde::{Deserialize, Serialize};

use crate::models::{BankTransaction, InvoiceRecord, PurchaseRecord, TransactionKind};

/// Amounts closer than this are treated as equal
pub const MATCH_TOLERANCE: f64 = 0.01;

pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < MATCH_TOLERANCE
}

/// The record a bank transaction settles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum MatchTarget {
    Invoice(String),
    Purchase(String),
}

impl MatchTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::Invoice(id) | Self::Purchase(id) => id,
        }
    }
}

impl std::fmt::Display for MatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoice(id) => write!(f, "invoice {}", id),
            Self::Purchase(id) => write!(f, "purchase {}", id),
        }
    }
}

/// Candidate records for one bank transaction, in book order
#[derive(Debug, Clone, Default)]
pub struct Matches<'a> {
    pub invoices: Vec<&'a InvoiceRecord>,
    pub purchases: Vec<&'a PurchaseRecord>,
}

impl<'a> Matches<'a> {
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty() && self.purchases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.invoices.len() + self.purchases.len()
    }

    pub fn targets(&self) -> Vec<MatchTarget> {
        self.invoices
            .iter()
            .map(|i| MatchTarget::Invoice(i.id.clone()))
            .chain(self.purchases.iter().map(|p| MatchTarget::Purchase(p.id.clone())))
            .collect()
    }

    pub fn contains(&self, target: &MatchTarget) -> bool {
        match target {
            MatchTarget::Invoice(id) => self.invoices.iter().any(|i| &i.id == id),
            MatchTarget::Purchase(id) => self.purchases.iter().any(|p| &p.id == id),
        }
    }
}

/// Unpaid records whose total agrees with the transaction amount
///
/// Credits only look at invoices and debits only at purchases. An empty
/// result is normal and not an error.
pub fn find_matches<'a>(
    tx: &BankTransaction,
    invoices: &'a [InvoiceRecord],
    purchases: &'a [PurchaseRecord],
) -> Matches<'a> {
    match tx.kind {
        TransactionKind::Credit => Matches {
            invoices: invoices
                .iter()
                .filter(|i| !i.is_paid() && amounts_match(i.total_amount, tx.amount))
                .collect(),
            purchases: Vec::new(),
        },
        TransactionKind::Debit => Matches {
            invoices: Vec::new(),
            purchases: purchases
                .iter()
                .filter(|p| !p.is_paid() && amounts_match(p.total_amount, tx.amount))
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewaySettings;
    use crate::models::{
        new_id, BusinessDetails, ClientDetails, LineItem, PaymentStatus, PriceType,
        ReconciliationStatus, TransactionType, Vendor,
    };
    use crate::records::{self, DocumentDraft, PurchaseDraft};
    use chrono::{NaiveDate, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn invoice(price: f64) -> InvoiceRecord {
        records::build_invoice(
            DocumentDraft {
                client: ClientDetails::default(),
                items: vec![LineItem::new("Service", 1.0, price, 0.0)],
                date: date(),
                price_type: PriceType::Exclusive,
                transaction_type: TransactionType::IntraState,
                logistics: None,
                custom_field_values: None,
            },
            &BusinessDetails::default(),
            0,
            &GatewaySettings::default(),
        )
    }

    fn purchase(price: f64) -> PurchaseRecord {
        records::build_purchase(PurchaseDraft {
            bill_number: "B-1".to_string(),
            vendor: Vendor::default(),
            items: vec![LineItem::new("Stock", 1.0, price, 0.0)],
            date: date(),
            price_type: PriceType::Exclusive,
            transaction_type: TransactionType::IntraState,
            status: PaymentStatus::Unpaid,
        })
        .unwrap()
    }

    fn tx(amount: f64, kind: TransactionKind) -> BankTransaction {
        BankTransaction {
            id: new_id(),
            date: date(),
            description: "NEFT".to_string(),
            amount,
            kind,
            status: ReconciliationStatus::Unreconciled,
            import_hash: None,
        }
    }

    #[test]
    fn test_tolerance() {
        let invoices = vec![invoice(1000.004), invoice(1000.02)];
        let matches = find_matches(&tx(1000.00, TransactionKind::Credit), &invoices, &[]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches.invoices[0].id, invoices[0].id);
    }

    #[test]
    fn test_credit_only_matches_unpaid_invoices() {
        let mut paid = invoice(500.0);
        paid.mark_paid(Utc::now());
        let invoices = vec![paid, invoice(500.0)];
        let purchases = vec![purchase(500.0)];

        let matches = find_matches(&tx(500.0, TransactionKind::Credit), &invoices, &purchases);
        assert_eq!(matches.invoices.len(), 1);
        assert_eq!(matches.invoices[0].id, invoices[1].id);
        assert!(matches.purchases.is_empty());
        assert!(matches.contains(&MatchTarget::Invoice(invoices[1].id.clone())));
        assert!(!matches.contains(&MatchTarget::Invoice(invoices[0].id.clone())));
    }

    #[test]
    fn test_debit_only_matches_purchases() {
        let invoices = vec![invoice(250.0)];
        let purchases = vec![purchase(250.0), purchase(999.0)];

        let matches = find_matches(&tx(250.0, TransactionKind::Debit), &invoices, &purchases);
        assert!(matches.invoices.is_empty());
        assert_eq!(
            matches.targets(),
            vec![MatchTarget::Purchase(purchases[0].id.clone())]
        );
    }

    #[test]
    fn test_no_candidates_is_empty() {
        let matches = find_matches(&tx(42.0, TransactionKind::Credit), &[], &[]);
        assert!(matches.is_empty());
    }
}
