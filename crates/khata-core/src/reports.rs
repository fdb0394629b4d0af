//! Dashboard, GST return summaries and business reports
//!
//! Every report reads invoice and purchase history over an inclusive date
//! range. Nothing here mutates the books.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{InvoiceRecord, LineItem, PriceType, Product, PurchaseRecord};
use crate::stock::{stock_status, StockStatus};
use crate::tax::{self, RateSummary, TaxHeads};

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidData(format!(
                "Start date {} is after end date {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Every date the books can hold
    pub fn all_time() -> Self {
        Self {
            from: NaiveDate::MIN,
            to: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// The calendar month a GST return covers
pub fn filing_period(year: i32, month: u32) -> Result<DateRange> {
    let from = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidData(format!("Invalid filing period {}-{}", year, month)))?;
    let to = from
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| Error::InvalidData(format!("Invalid filing period {}-{}", year, month)))?;
    Ok(DateRange { from, to })
}

/// Filing period containing a date
pub fn filing_period_of(date: NaiveDate) -> Result<DateRange> {
    filing_period(date.year(), date.month())
}

fn invoices_in<'a>(
    invoices: &'a [InvoiceRecord],
    range: &'a DateRange,
) -> impl Iterator<Item = &'a InvoiceRecord> + 'a {
    invoices.iter().filter(move |i| range.contains(i.date))
}

fn purchases_in<'a>(
    purchases: &'a [PurchaseRecord],
    range: &'a DateRange,
) -> impl Iterator<Item = &'a PurchaseRecord> + 'a {
    purchases.iter().filter(move |p| range.contains(p.date))
}

/// Taxable value of one item under its document's pricing
fn taxable_value(item: &LineItem, price_type: PriceType) -> f64 {
    let gross = item.quantity * item.price;
    match price_type {
        PriceType::Exclusive => gross,
        PriceType::Inclusive => gross / (1.0 + item.gst_rate / 100.0),
    }
}

/// Dashboard figures
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub period: Option<DateRange>,
    pub invoice_count: usize,
    pub total_invoiced: f64,
    pub total_collected: f64,
    pub total_outstanding: f64,
    pub total_tax: f64,
    /// Output tax per rate, sorted by rate
    pub tax_by_rate: Vec<RateSummary>,
    pub tax_heads: TaxHeads,
    pub purchase_count: usize,
    pub total_payables: f64,
    pub input_tax_credit: f64,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub stock_value: f64,
}

pub fn dashboard(
    invoices: &[InvoiceRecord],
    purchases: &[PurchaseRecord],
    products: &[Product],
    range: DateRange,
) -> Dashboard {
    let mut report = Dashboard {
        period: Some(range),
        ..Default::default()
    };

    let sales: Vec<&InvoiceRecord> = invoices_in(invoices, &range).collect();
    for invoice in &sales {
        report.invoice_count += 1;
        report.total_invoiced += invoice.total_amount;
        if invoice.is_paid() {
            report.total_collected += invoice.total_amount;
        } else {
            report.total_outstanding += invoice.total_amount;
        }
        report.total_tax += invoice.calculation_result.total_gst_amount;
    }

    let mut by_rate = tax::aggregate_breakdowns(
        sales
            .iter()
            .map(|i| (&i.calculation_result, i.transaction_type)),
    );
    by_rate.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    report.tax_heads = TaxHeads {
        cgst: by_rate.iter().map(|r| r.cgst).sum(),
        sgst: by_rate.iter().map(|r| r.sgst).sum(),
        igst: by_rate.iter().map(|r| r.igst).sum(),
    };
    report.tax_by_rate = by_rate;

    for purchase in purchases_in(purchases, &range) {
        report.purchase_count += 1;
        report.total_payables += purchase.total_amount;
        report.input_tax_credit += purchase.calculation_result.total_gst_amount;
    }

    for product in products.iter().filter(|p| p.track_stock) {
        match stock_status(product) {
            StockStatus::Low => report.low_stock_items += 1,
            StockStatus::Out => report.out_of_stock_items += 1,
            _ => {}
        }
        report.stock_value += product.stock * product.price;
    }

    report
}

/// Summary for the monthly GSTR-3B return
#[derive(Debug, Clone, Default, Serialize)]
pub struct Gstr3b {
    pub period: Option<DateRange>,
    /// Outward taxable supplies
    pub taxable_value: f64,
    pub output_tax: TaxHeads,
    /// Eligible input tax credit from purchases
    pub input_tax_credit: TaxHeads,
}

impl Gstr3b {
    /// Output tax less input credit, across all heads
    pub fn net_payable(&self) -> f64 {
        self.output_tax.total() - self.input_tax_credit.total()
    }
}

pub fn gstr3b(invoices: &[InvoiceRecord], purchases: &[PurchaseRecord], range: DateRange) -> Gstr3b {
    let mut report = Gstr3b {
        period: Some(range),
        ..Default::default()
    };

    for invoice in invoices_in(invoices, &range) {
        report.taxable_value += invoice.calculation_result.total_net_amount;
        for b in &invoice.calculation_result.gst_breakdown {
            add_heads(
                &mut report.output_tax,
                tax::split_tax(b.gst_amount, invoice.transaction_type),
            );
        }
    }

    for purchase in purchases_in(purchases, &range) {
        for b in &purchase.calculation_result.gst_breakdown {
            add_heads(
                &mut report.input_tax_credit,
                tax::split_tax(b.gst_amount, purchase.transaction_type),
            );
        }
    }

    report
}

fn add_heads(total: &mut TaxHeads, heads: TaxHeads) {
    total.cgst += heads.cgst;
    total.sgst += heads.sgst;
    total.igst += heads.igst;
}

/// An invoice to a registered business, listed individually in GSTR-1
#[derive(Debug, Clone, Serialize)]
pub struct B2bEntry {
    pub invoice_number: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub client_gstin: String,
    pub taxable_value: f64,
    pub tax: f64,
    pub total: f64,
}

/// Unregistered-customer sales at one rate
#[derive(Debug, Clone, Serialize)]
pub struct B2cEntry {
    pub rate: f64,
    pub taxable_value: f64,
}

/// Goods and services sold under one HSN/SAC code
#[derive(Debug, Clone, Serialize)]
pub struct HsnEntry {
    pub hsn: String,
    /// Description of the first item seen with this code
    pub description: String,
    pub quantity: f64,
    pub taxable_value: f64,
    pub tax: f64,
}

/// Summary for the monthly GSTR-1 return
#[derive(Debug, Clone, Default, Serialize)]
pub struct Gstr1 {
    pub period: Option<DateRange>,
    pub b2b: Vec<B2bEntry>,
    pub b2c: Vec<B2cEntry>,
    pub hsn: Vec<HsnEntry>,
}

pub fn gstr1(invoices: &[InvoiceRecord], range: DateRange) -> Gstr1 {
    let mut report = Gstr1 {
        period: Some(range),
        ..Default::default()
    };

    for invoice in invoices_in(invoices, &range) {
        let result = &invoice.calculation_result;
        if invoice.client.gstin.trim().is_empty() {
            for b in &result.gst_breakdown {
                match report.b2c.iter_mut().find(|e| e.rate == b.rate) {
                    Some(entry) => entry.taxable_value += b.taxable_amount,
                    None => report.b2c.push(B2cEntry {
                        rate: b.rate,
                        taxable_value: b.taxable_amount,
                    }),
                }
            }
        } else {
            report.b2b.push(B2bEntry {
                invoice_number: invoice.invoice_number.clone(),
                date: invoice.date,
                client_name: invoice.client.name.clone(),
                client_gstin: invoice.client.gstin.clone(),
                taxable_value: result.total_net_amount,
                tax: result.total_gst_amount,
                total: invoice.total_amount,
            });
        }

        for item in invoice.items.iter().filter(|i| i.is_billable()) {
            let hsn = if item.hsn.trim().is_empty() {
                "N/A".to_string()
            } else {
                item.hsn.trim().to_string()
            };
            let taxable = taxable_value(item, invoice.price_type);
            let tax = taxable * item.gst_rate / 100.0;

            match report.hsn.iter_mut().find(|e| e.hsn == hsn) {
                Some(entry) => {
                    entry.quantity += item.quantity;
                    entry.taxable_value += taxable;
                    entry.tax += tax;
                }
                None => report.hsn.push(HsnEntry {
                    hsn,
                    description: item.description.clone(),
                    quantity: item.quantity,
                    taxable_value: taxable,
                    tax,
                }),
            }
        }
    }

    report.b2c.sort_by(|a, b| a.rate.total_cmp(&b.rate));
    report
}

/// Profit and loss
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfitAndLoss {
    pub period: Option<DateRange>,
    /// Paid invoices only
    pub revenue: f64,
    /// Every purchase and expense
    pub expenses: f64,
}

impl ProfitAndLoss {
    pub fn profit(&self) -> f64 {
        self.revenue - self.expenses
    }
}

pub fn profit_and_loss(
    invoices: &[InvoiceRecord],
    purchases: &[PurchaseRecord],
    range: DateRange,
) -> ProfitAndLoss {
    ProfitAndLoss {
        period: Some(range),
        revenue: invoices_in(invoices, &range)
            .filter(|i| i.is_paid())
            .map(|i| i.total_amount)
            .sum(),
        expenses: purchases_in(purchases, &range)
            .map(|p| p.total_amount)
            .sum(),
    }
}

/// Totals for one client or vendor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyTotal {
    pub name: String,
    pub documents: usize,
    pub total: f64,
}

/// Quantity and value moved for one item description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTotal {
    pub name: String,
    pub quantity: f64,
    /// Quantity times unit price as entered
    pub total: f64,
}

fn add_party(totals: &mut Vec<PartyTotal>, name: &str, amount: f64) {
    match totals.iter_mut().find(|t| t.name == name) {
        Some(t) => {
            t.documents += 1;
            t.total += amount;
        }
        None => totals.push(PartyTotal {
            name: name.to_string(),
            documents: 1,
            total: amount,
        }),
    }
}

fn add_items<'a>(totals: &mut Vec<ItemTotal>, items: impl Iterator<Item = &'a LineItem>) {
    for item in items.filter(|i| i.is_billable()) {
        let value = item.quantity * item.price;
        match totals.iter_mut().find(|t| t.name == item.description) {
            Some(t) => {
                t.quantity += item.quantity;
                t.total += value;
            }
            None => totals.push(ItemTotal {
                name: item.description.clone(),
                quantity: item.quantity,
                total: value,
            }),
        }
    }
}

pub fn sales_by_client(invoices: &[InvoiceRecord], range: DateRange) -> Vec<PartyTotal> {
    let mut totals = Vec::new();
    for invoice in invoices_in(invoices, &range) {
        add_party(&mut totals, &invoice.client.name, invoice.total_amount);
    }
    totals
}

pub fn sales_by_item(invoices: &[InvoiceRecord], range: DateRange) -> Vec<ItemTotal> {
    let mut totals = Vec::new();
    add_items(
        &mut totals,
        invoices_in(invoices, &range).flat_map(|i| i.items.iter()),
    );
    totals
}

pub fn purchases_by_vendor(purchases: &[PurchaseRecord], range: DateRange) -> Vec<PartyTotal> {
    let mut totals = Vec::new();
    for purchase in purchases_in(purchases, &range) {
        add_party(&mut totals, &purchase.vendor.name, purchase.total_amount);
    }
    totals
}

pub fn purchases_by_item(purchases: &[PurchaseRecord], range: DateRange) -> Vec<ItemTotal> {
    let mut totals = Vec::new();
    add_items(
        &mut totals,
        purchases_in(purchases, &range).flat_map(|p| p.items.iter()),
    );
    totals
}

/// One tracked product in the stock summary
#[derive(Debug, Clone, Serialize)]
pub struct StockLine {
    pub product_id: String,
    pub name: String,
    pub stock: f64,
    pub value: f64,
    pub status: StockStatus,
}

pub fn stock_summary(products: &[Product]) -> Vec<StockLine> {
    products
        .iter()
        .filter(|p| p.track_stock)
        .map(|p| StockLine {
            product_id: p.id.clone(),
            name: p.name.clone(),
            stock: p.stock,
            value: p.stock * p.price,
            status: stock_status(p),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewaySettings;
    use crate::models::{
        new_id, BusinessDetails, ClientDetails, PaymentStatus, TransactionType, Vendor,
    };
    use crate::records::{self, DocumentDraft, PurchaseDraft};
    use chrono::Utc;

    const EPS: f64 = 1e-9;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(name: &str, gstin: &str) -> ClientDetails {
        ClientDetails {
            id: new_id(),
            name: name.to_string(),
            gstin: gstin.to_string(),
            address: String::new(),
        }
    }

    fn invoice(
        client: ClientDetails,
        items: Vec<LineItem>,
        on: NaiveDate,
        transaction_type: TransactionType,
    ) -> InvoiceRecord {
        records::build_invoice(
            DocumentDraft {
                client,
                items,
                date: on,
                price_type: PriceType::Exclusive,
                transaction_type,
                logistics: None,
                custom_field_values: None,
            },
            &BusinessDetails::default(),
            0,
            &GatewaySettings::default(),
        )
    }

    fn purchase(vendor: &str, items: Vec<LineItem>, on: NaiveDate) -> PurchaseRecord {
        records::build_purchase(PurchaseDraft {
            bill_number: "B-1".to_string(),
            vendor: Vendor {
                id: new_id(),
                name: vendor.to_string(),
                ..Default::default()
            },
            items,
            date: on,
            price_type: PriceType::Exclusive,
            transaction_type: TransactionType::InterState,
            status: PaymentStatus::Unpaid,
        })
        .unwrap()
    }

    fn sample_invoices() -> Vec<InvoiceRecord> {
        let mut paid = invoice(
            client("Acme", "29ABCDE1234F1Z5"),
            vec![LineItem::new("Widget", 2.0, 500.0, 18.0).with_hsn("8471")],
            date(2024, 3, 5),
            TransactionType::IntraState,
        );
        paid.mark_paid(Utc::now());
        let walk_in = invoice(
            client("Walk-in", ""),
            vec![
                LineItem::new("Widget", 1.0, 500.0, 18.0).with_hsn("8471"),
                LineItem::new("Cable", 4.0, 25.0, 5.0),
            ],
            date(2024, 3, 20),
            TransactionType::InterState,
        );
        let april = invoice(
            client("Acme", "29ABCDE1234F1Z5"),
            vec![LineItem::new("Widget", 1.0, 500.0, 18.0)],
            date(2024, 4, 1),
            TransactionType::IntraState,
        );
        vec![paid, walk_in, april]
    }

    #[test]
    fn test_filing_period() {
        let feb = filing_period(2024, 2).unwrap();
        assert_eq!(feb.from, date(2024, 2, 1));
        assert_eq!(feb.to, date(2024, 2, 29));
        let dec = filing_period(2023, 12).unwrap();
        assert_eq!(dec.to, date(2023, 12, 31));
        assert!(filing_period(2024, 13).is_err());
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_dashboard() {
        let invoices = sample_invoices();
        let purchases = vec![purchase(
            "Supplier",
            vec![LineItem::new("Widget", 10.0, 300.0, 18.0)],
            date(2024, 3, 2),
        )];
        let products = vec![
            Product {
                id: new_id(),
                name: "Widget".to_string(),
                hsn: String::new(),
                price: 500.0,
                gst_rate: 18.0,
                track_stock: true,
                stock: 3.0,
                low_stock_threshold: 5.0,
            },
            Product {
                id: new_id(),
                name: "Cable".to_string(),
                hsn: String::new(),
                price: 25.0,
                gst_rate: 5.0,
                track_stock: true,
                stock: -1.0,
                low_stock_threshold: 5.0,
            },
        ];

        let report = dashboard(&invoices, &purchases, &products, filing_period(2024, 3).unwrap());

        assert_eq!(report.invoice_count, 2);
        assert!((report.total_invoiced - 1180.0 - 695.0).abs() < EPS);
        assert!((report.total_collected - 1180.0).abs() < EPS);
        assert!((report.total_outstanding - 695.0).abs() < EPS);
        assert!((report.total_tax - 275.0).abs() < EPS);
        assert_eq!(report.tax_by_rate.len(), 2);
        assert_eq!(report.tax_by_rate[0].rate, 5.0);
        assert!((report.tax_heads.cgst - 90.0).abs() < EPS);
        assert!((report.tax_heads.igst - 95.0).abs() < EPS);
        assert!((report.total_payables - 3540.0).abs() < EPS);
        assert!((report.input_tax_credit - 540.0).abs() < EPS);
        assert_eq!(report.low_stock_items, 1);
        assert_eq!(report.out_of_stock_items, 1);
        assert!((report.stock_value - (1500.0 - 25.0)).abs() < EPS);
    }

    #[test]
    fn test_gstr3b() {
        let invoices = sample_invoices();
        let purchases = vec![purchase(
            "Supplier",
            vec![LineItem::new("Widget", 10.0, 300.0, 18.0)],
            date(2024, 3, 2),
        )];

        let report = gstr3b(&invoices, &purchases, filing_period(2024, 3).unwrap());
        assert!((report.taxable_value - 1600.0).abs() < EPS);
        assert!((report.output_tax.cgst - 90.0).abs() < EPS);
        assert!((report.output_tax.sgst - 90.0).abs() < EPS);
        assert!((report.output_tax.igst - 95.0).abs() < EPS);
        assert!((report.input_tax_credit.igst - 540.0).abs() < EPS);
        assert!((report.net_payable() - (275.0 - 540.0)).abs() < EPS);
    }

    #[test]
    fn test_gstr1() {
        let report = gstr1(&sample_invoices(), filing_period(2024, 3).unwrap());

        assert_eq!(report.b2b.len(), 1);
        assert_eq!(report.b2b[0].client_gstin, "29ABCDE1234F1Z5");
        assert_eq!(report.b2c.len(), 2);
        assert_eq!(report.b2c[0].rate, 5.0);
        assert!((report.b2c[0].taxable_value - 100.0).abs() < EPS);
        assert!((report.b2c[1].taxable_value - 500.0).abs() < EPS);

        assert_eq!(report.hsn.len(), 2);
        assert_eq!(report.hsn[0].hsn, "8471");
        assert_eq!(report.hsn[0].quantity, 3.0);
        assert!((report.hsn[0].taxable_value - 1500.0).abs() < EPS);
        assert!((report.hsn[0].tax - 270.0).abs() < EPS);
        assert_eq!(report.hsn[1].hsn, "N/A");
        assert_eq!(report.hsn[1].description, "Cable");
    }

    #[test]
    fn test_business_reports() {
        let invoices = sample_invoices();
        let purchases = vec![
            purchase("Supplier", vec![LineItem::new("Widget", 10.0, 300.0, 18.0)], date(2024, 3, 2)),
            purchase("Supplier", vec![LineItem::new("Cable", 20.0, 10.0, 5.0)], date(2024, 3, 9)),
        ];
        let range = DateRange::all_time();

        let pnl = profit_and_loss(&invoices, &purchases, range);
        assert!((pnl.revenue - 1180.0).abs() < EPS);
        assert!((pnl.expenses - (3540.0 + 210.0)).abs() < EPS);
        assert!((pnl.profit() - (1180.0 - 3750.0)).abs() < EPS);

        let by_client = sales_by_client(&invoices, range);
        assert_eq!(by_client.len(), 2);
        assert_eq!(by_client[0].name, "Acme");
        assert_eq!(by_client[0].documents, 2);

        let by_item = sales_by_item(&invoices, range);
        assert_eq!(by_item[0].name, "Widget");
        assert_eq!(by_item[0].quantity, 4.0);
        assert!((by_item[0].total - 2000.0).abs() < EPS);

        let by_vendor = purchases_by_vendor(&purchases, range);
        assert_eq!(by_vendor.len(), 1);
        assert_eq!(by_vendor[0].documents, 2);

        let bought = purchases_by_item(&purchases, range);
        assert_eq!(bought.len(), 2);
        assert_eq!(bought[1].quantity, 20.0);
    }

    #[test]
    fn test_stock_summary_lists_tracked_only() {
        let products = vec![
            Product {
                id: new_id(),
                name: "Widget".to_string(),
                hsn: String::new(),
                price: 10.0,
                gst_rate: 18.0,
                track_stock: true,
                stock: 4.0,
                low_stock_threshold: 2.0,
            },
            Product {
                id: new_id(),
                name: "Consulting".to_string(),
                hsn: String::new(),
                price: 1000.0,
                gst_rate: 18.0,
                track_stock: false,
                stock: 0.0,
                low_stock_threshold: 0.0,
            },
        ];

        let summary = stock_summary(&products);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].value, 40.0);
        assert_eq!(summary[0].status, StockStatus::InStock);
    }
}
