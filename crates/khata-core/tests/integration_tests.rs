//! Integration tests for khata-core
//!
//! These tests exercise the full boot → invoice → import → reconcile → report workflow.

use chrono::{NaiveDate, Utc};
use khata_core::{
    config::Settings,
    db::Database,
    import::parse_statement,
    models::{
        ClientDetails, Frequency, LineItem, PaymentStatus, PriceType, Product,
        ReconciliationStatus, TransactionType, Vendor,
    },
    reports, DocumentDraft, MatchTarget, ProfileDraft, PurchaseDraft, Session,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Statement with one customer receipt, one supplier payment and one
/// unbilled expense
fn statement_csv() -> &'static str {
    r#"Date,Narration,Debit,Credit,Balance
05/03/2024,NEFT CR ACME CORP,,"1,180.00",101180.00
06/03/2024,IMPS DR WIDGET SUPPLIES,"3,540.00",,97640.00
07/03/2024,BESCOM ELECTRICITY,"2,450.00",,95190.00
08/03/2024,OPENING BALANCE NOTE,,,95190.00"#
}

fn open(db: &Database, today: NaiveDate) -> Session {
    Session::open(
        db.clone(),
        Settings::defaults().expect("Failed to load default settings"),
        today,
    )
    .expect("Failed to open session")
}

fn widget(stock: f64) -> Product {
    Product {
        id: String::new(),
        name: "Widget".to_string(),
        hsn: "8471".to_string(),
        price: 500.0,
        gst_rate: 18.0,
        track_stock: true,
        stock,
        low_stock_threshold: 5.0,
    }
}

// =============================================================================
// Billing
// =============================================================================

#[test]
fn test_invoice_import_reconcile_workflow() {
    let db = Database::in_memory().expect("Failed to create database");
    let mut session = open(&db, date(2024, 3, 1));

    session.add_product(widget(10.0)).unwrap();
    let client = session
        .add_client(ClientDetails {
            name: "Acme Corp".to_string(),
            gstin: "29ABCDE1234F1Z5".to_string(),
            ..Default::default()
        })
        .unwrap();
    let vendor = session
        .add_vendor(Vendor {
            name: "Widget Supplies".to_string(),
            ..Default::default()
        })
        .unwrap();
    let utility = session
        .add_vendor(Vendor {
            name: "BESCOM".to_string(),
            ..Default::default()
        })
        .unwrap();

    let invoice = session
        .issue_invoice(DocumentDraft {
            client,
            items: vec![LineItem::new("widget", 2.0, 500.0, 18.0).with_hsn("8471")],
            date: date(2024, 3, 1),
            price_type: PriceType::Exclusive,
            transaction_type: TransactionType::IntraState,
            logistics: None,
            custom_field_values: None,
        })
        .unwrap();
    assert_eq!(invoice.invoice_number, "INV-001");
    assert_eq!(session.books().products[0].stock, 8.0);

    let purchase = session
        .record_purchase(PurchaseDraft {
            bill_number: "WS-778".to_string(),
            vendor,
            items: vec![LineItem::new("Widget", 10.0, 300.0, 18.0)],
            date: date(2024, 3, 2),
            price_type: PriceType::Exclusive,
            transaction_type: TransactionType::InterState,
            status: PaymentStatus::Unpaid,
        })
        .unwrap();
    assert_eq!(session.books().products[0].stock, 18.0);

    // Import the statement twice; the second import adds nothing
    let parsed = parse_statement(statement_csv().as_bytes()).expect("Failed to parse statement");
    assert_eq!(parsed.len(), 3);
    let first = session.import_statement(parsed).unwrap();
    assert_eq!(first.added, 3);
    let again = session
        .import_statement(parse_statement(statement_csv().as_bytes()).unwrap())
        .unwrap();
    assert_eq!(again.added, 0);
    assert_eq!(again.duplicates, 3);

    let txs = session.books().bank_transactions.clone();
    let receipt = txs.iter().find(|t| t.description.contains("ACME")).unwrap();
    let payment = txs.iter().find(|t| t.description.contains("WIDGET")).unwrap();
    let bill = txs.iter().find(|t| t.description.contains("BESCOM")).unwrap();

    let matches = session.books().matches_for(&receipt.id).unwrap().targets();
    assert_eq!(matches, vec![MatchTarget::Invoice(invoice.id.clone())]);
    let now = Utc::now();
    session
        .reconcile(&receipt.id, &MatchTarget::Invoice(invoice.id.clone()), now)
        .unwrap();
    session
        .reconcile(&payment.id, &MatchTarget::Purchase(purchase.id.clone()), now)
        .unwrap();
    session
        .record_expense(&bill.id, "Electricity for March", &utility.id, now)
        .unwrap();

    // Everything survives a restart
    drop(session);
    let session = open(&db, date(2024, 3, 31));
    let books = session.books();

    let settled = books.find_invoice("INV-001").unwrap();
    assert_eq!(settled.status, PaymentStatus::Paid);
    assert_eq!(
        settled.reconciliation_status,
        Some(ReconciliationStatus::Reconciled)
    );
    assert!(books.find_purchase("WS-778").unwrap().is_paid());
    let expense_number = format!("EXP-{}", now.date_naive().format("%Y-%m-%d"));
    assert_eq!(books.find_purchase(&expense_number).unwrap().date, date(2024, 3, 7));
    assert_eq!(books.unreconciled().count(), 0);

    let march = reports::filing_period(2024, 3).unwrap();
    let pnl = reports::profit_and_loss(&books.invoices, &books.purchases, march);
    assert!((pnl.revenue - 1180.0).abs() < 1e-9);
    assert!((pnl.expenses - (3540.0 + 2450.0)).abs() < 1e-9);

    let gstr3b = reports::gstr3b(&books.invoices, &books.purchases, march);
    assert!((gstr3b.output_tax.cgst - 90.0).abs() < 1e-9);
    assert!((gstr3b.input_tax_credit.igst - 540.0).abs() < 1e-9);

    let gstr1 = reports::gstr1(&books.invoices, march);
    assert_eq!(gstr1.b2b.len(), 1);
    assert!(gstr1.b2c.is_empty());
}

// =============================================================================
// Recurring billing
// =============================================================================

#[test]
fn test_recurring_catch_up_on_boot() {
    let db = Database::in_memory().expect("Failed to create database");
    let mut session = open(&db, date(2024, 1, 1));
    session.add_product(widget(20.0)).unwrap();

    let profile = session
        .add_recurring_profile(ProfileDraft {
            client: ClientDetails {
                name: "Acme Corp".to_string(),
                ..Default::default()
            },
            items: vec![LineItem::new("Widget", 2.0, 500.0, 18.0)],
            frequency: Frequency::Quarterly,
            start_date: date(2024, 1, 15),
            end_date: Some(date(2024, 9, 30)),
            next_due_date: None,
            price_type: PriceType::Inclusive,
            transaction_type: TransactionType::InterState,
        })
        .unwrap();
    drop(session);

    // A year later: Jan, Apr and Jul cycles, then the profile ends
    let session = open(&db, date(2025, 1, 20));
    let boot = session.boot_outcome();
    assert_eq!(boot.invoices.len(), 3);
    assert_eq!(boot.paused, vec![profile.id.clone()]);

    let books = session.books();
    let numbers: Vec<&str> = books
        .invoices
        .iter()
        .map(|i| i.invoice_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["INV-003", "INV-002", "INV-001"]);
    assert_eq!(books.invoices[2].date, date(2024, 1, 15));
    assert!((books.invoices[0].total_amount - 1000.0).abs() < 1e-9);
    assert_eq!(books.products[0].stock, 14.0);

    let stored = books.find_profile(&profile.id).unwrap();
    assert!(!stored.is_active());
    assert_eq!(stored.last_generated_date, Some(date(2024, 7, 15)));
    assert_eq!(stored.next_due_date, date(2024, 10, 15));
    drop(session);

    // Paused profiles stay quiet on later boots
    let later = open(&db, date(2025, 6, 1));
    assert!(later.boot_outcome().invoices.is_empty());
    assert_eq!(later.books().invoice_counter, 3);
}

#[test]
fn test_quotation_conversion_shares_invoice_sequence() {
    let db = Database::in_memory().expect("Failed to create database");
    let mut session = open(&db, date(2024, 5, 1));

    let draft = DocumentDraft {
        client: ClientDetails {
            name: "Walk-in".to_string(),
            ..Default::default()
        },
        items: vec![LineItem::new("Installation", 1.0, 2000.0, 18.0)],
        date: date(2024, 5, 1),
        price_type: PriceType::Exclusive,
        transaction_type: TransactionType::IntraState,
        logistics: None,
        custom_field_values: None,
    };
    session.issue_invoice(draft.clone()).unwrap();
    let quotation = session.issue_quotation(draft).unwrap();
    assert_eq!(quotation.quotation_number, "QTN-001");

    let invoice = session
        .convert_quotation(&quotation.quotation_number, date(2024, 5, 3))
        .unwrap();
    assert_eq!(invoice.invoice_number, "INV-002");
    assert_eq!(session.books().quotations.len(), 1);
    assert_eq!(db.counter("quotation").unwrap(), 1);
    assert_eq!(db.counter("invoice").unwrap(), 2);
}
