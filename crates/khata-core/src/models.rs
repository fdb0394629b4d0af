//! Domain models for Khata

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GST slabs offered when entering items
pub const GST_RATES: [f64; 5] = [0.0, 5.0, 12.0, 18.0, 28.0];

/// Generate a fresh record identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Numbers that may be left unset (NaN) on a work-in-progress line item.
/// JSON has no NaN, so unset values are stored as `null`.
mod unset_number {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Whether stored unit prices already contain tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceType {
    #[default]
    Exclusive,
    Inclusive,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Inclusive => "inclusive",
        }
    }
}

impl std::str::FromStr for PriceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclusive" | "excl" => Ok(Self::Exclusive),
            "inclusive" | "incl" => Ok(Self::Inclusive),
            _ => Err(format!("Unknown price type: {}", s)),
        }
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supply convention: same state (CGST + SGST) or across states (IGST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    IntraState,
    InterState,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntraState => "intra_state",
            Self::InterState => "inter_state",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "intra_state" | "intra" => Ok(Self::IntraState),
            "inter_state" | "inter" => Ok(Self::InterState),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state shared by invoices and purchases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurring billing cadence
///
/// Values written by older or hand-edited data files that do not name a known
/// cadence are kept as `Unrecognized` so the rest of the books still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
    Unrecognized(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Calendar months in one billing cycle, `None` when unrecognized
    pub fn months(&self) -> Option<u32> {
        match self {
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::Yearly => Some(12),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for Frequency {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "monthly" => Self::Monthly,
            "quarterly" => Self::Quarterly,
            "yearly" | "annually" => Self::Yearly,
            _ => Self::Unrecognized(s),
        }
    }
}

impl From<Frequency> for String {
    fn from(f: Frequency) -> Self {
        f.as_str().to_string()
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match Frequency::from(s.to_string()) {
            Frequency::Unrecognized(_) => Err(format!("Unknown frequency: {}", s)),
            f => Ok(f),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurring profile status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    Active,
    Paused,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
        }
    }
}

/// Direction of money on a bank statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money in, settles invoices
    Credit,
    /// Money out, settles purchases
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation state of a bank line or the record it settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationStatus {
    #[default]
    Unreconciled,
    Reconciled,
}

/// One line on an invoice, quotation, purchase or recurring template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub description: String,
    /// HSN/SAC classification code, opaque text
    #[serde(default)]
    pub hsn: String,
    #[serde(with = "unset_number")]
    pub quantity: f64,
    #[serde(with = "unset_number")]
    pub price: f64,
    /// GST percentage (e.g. 18 for 18%)
    pub gst_rate: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, price: f64, gst_rate: f64) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            hsn: String::new(),
            quantity,
            price,
            gst_rate,
        }
    }

    pub fn with_hsn(mut self, hsn: impl Into<String>) -> Self {
        self.hsn = hsn.into();
        self
    }

    /// Items with a zero, negative, unset or infinite quantity or price are left out of totals
    pub fn is_billable(&self) -> bool {
        self.quantity.is_finite()
            && self.price.is_finite()
            && self.gst_rate.is_finite()
            && self.quantity > 0.0
            && self.price > 0.0
    }

    /// Copy of this item under a new identifier
    pub fn with_fresh_id(&self) -> Self {
        Self {
            id: new_id(),
            ..self.clone()
        }
    }
}

/// Tax collected at a single GST rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub rate: f64,
    pub taxable_amount: f64,
    pub gst_amount: f64,
}

/// Totals for a list of line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalculationResult {
    pub total_net_amount: f64,
    pub total_gst_amount: f64,
    pub grand_total: f64,
    /// One entry per rate, in the order rates were first seen
    pub gst_breakdown: Vec<GstBreakdown>,
}

impl CalculationResult {
    /// Whether every amount can be stored; JSON has no infinity
    pub fn is_finite(&self) -> bool {
        self.total_net_amount.is_finite()
            && self.total_gst_amount.is_finite()
            && self.grand_total.is_finite()
            && self
                .gst_breakdown
                .iter()
                .all(|b| b.taxable_amount.is_finite() && b.gst_amount.is_finite())
    }
}

/// The business issuing documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BusinessDetails {
    pub name: String,
    pub gstin: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub bank_details: String,
}

/// A customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClientDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gstin: String,
    #[serde(default)]
    pub address: String,
}

/// A supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gstin: String,
    #[serde(default)]
    pub address: String,
}

/// Shipping details printed on an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogisticsDetails {
    pub transporter_name: String,
    pub transporter_id: String,
    pub vehicle_number: String,
    pub eway_bill_number: String,
}

/// An issued sales invoice
///
/// Client, business and items are snapshots taken when the invoice was issued;
/// later edits to the client list do not reach back into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    pub invoice_number: String,
    pub client: ClientDetails,
    pub business: BusinessDetails,
    pub items: Vec<LineItem>,
    pub date: NaiveDate,
    pub total_amount: f64,
    pub calculation_result: CalculationResult,
    pub transaction_type: TransactionType,
    pub price_type: PriceType,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    /// Placeholder gateway link, present when gateway credentials are configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistics: Option<LogisticsDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_values: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation_status: Option<ReconciliationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_date: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    pub fn mark_paid(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Paid;
        self.payment_date = Some(now);
    }

    pub fn mark_unpaid(&mut self) {
        self.status = PaymentStatus::Unpaid;
        self.payment_date = None;
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// A quotation; can later be turned into an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotationRecord {
    pub id: String,
    pub quotation_number: String,
    pub client: ClientDetails,
    pub business: BusinessDetails,
    pub items: Vec<LineItem>,
    pub date: NaiveDate,
    pub total_amount: f64,
    pub calculation_result: CalculationResult,
    pub transaction_type: TransactionType,
    pub price_type: PriceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_values: Option<BTreeMap<String, String>>,
}

/// A recorded purchase bill or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: String,
    pub bill_number: String,
    pub vendor: Vendor,
    pub items: Vec<LineItem>,
    pub date: NaiveDate,
    pub total_amount: f64,
    pub calculation_result: CalculationResult,
    pub transaction_type: TransactionType,
    pub price_type: PriceType,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation_status: Option<ReconciliationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_date: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// A template that spawns invoices on a fixed cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringProfile {
    pub id: String,
    pub client: ClientDetails,
    pub items: Vec<LineItem>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_date: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub status: ProfileStatus,
    pub price_type: PriceType,
    pub transaction_type: TransactionType,
}

impl RecurringProfile {
    pub fn is_active(&self) -> bool {
        self.status == ProfileStatus::Active
    }
}

/// A product or service in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hsn: String,
    pub price: f64,
    pub gst_rate: f64,
    /// Services leave this off and are never stock-adjusted
    pub track_stock: bool,
    /// Units on hand; can go negative after over-invoicing
    pub stock: f64,
    #[serde(default)]
    pub low_stock_threshold: f64,
}

impl Product {
    /// Whether stock movements for a line item with this description land here
    pub fn matches_description(&self, description: &str) -> bool {
        self.track_stock && self.name.to_lowercase() == description.to_lowercase()
    }

    pub fn has_finite_amounts(&self) -> bool {
        self.price.is_finite()
            && self.gst_rate.is_finite()
            && self.stock.is_finite()
            && self.low_stock_threshold.is_finite()
    }
}

/// A line from an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Always positive; direction is carried by `kind`
    pub amount: f64,
    pub kind: TransactionKind,
    pub status: ReconciliationStatus,
    /// Hash for deduplication across repeated statement imports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_hash: Option<String>,
}

impl BankTransaction {
    pub fn is_reconciled(&self) -> bool {
        self.status == ReconciliationStatus::Reconciled
    }
}
