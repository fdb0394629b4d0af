//! Bank statement import
//!
//! Statements are CSV files with a header row. Columns are found by name,
//! case-insensitively:
//! - date: `Date`, `Transaction Date`, `Txn Date`, `Value Date`
//! - description: `Description`, `Narration`, `Particulars`
//! - money in: `Credit`, `Deposit`, `Credit Amount`
//! - money out: `Debit`, `Withdrawal`, `Debit Amount`
//!
//! Rows without a date, a description or any amount are skipped. Any other
//! malformed row fails the whole import so a statement is never half-applied.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{new_id, BankTransaction, ReconciliationStatus, TransactionKind};

const DATE_COLUMNS: &[&str] = &["date", "transaction date", "txn date", "value date"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "narration", "particulars"];
const CREDIT_COLUMNS: &[&str] = &["credit", "deposit", "credit amount"];
const DEBIT_COLUMNS: &[&str] = &["debit", "withdrawal", "debit amount"];

/// Column positions resolved from the header row
#[derive(Debug)]
struct Columns {
    date: usize,
    description: usize,
    credit: Option<usize>,
    debit: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let find = |aliases: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().trim_start_matches('\u{feff}').to_lowercase();
                aliases.contains(&h.as_str())
            })
        };

        let date = find(DATE_COLUMNS)
            .ok_or_else(|| Error::Import("Statement has no Date column".into()))?;
        let description = find(DESCRIPTION_COLUMNS).ok_or_else(|| {
            Error::Import("Statement has no Description or Narration column".into())
        })?;
        let credit = find(CREDIT_COLUMNS);
        let debit = find(DEBIT_COLUMNS);
        if credit.is_none() && debit.is_none() {
            return Err(Error::Import(
                "Statement has neither a Credit nor a Debit column".into(),
            ));
        }

        Ok(Self {
            date,
            description,
            credit,
            debit,
        })
    }
}

/// Parse a CSV bank statement into unreconciled transactions
pub fn parse_statement<R: Read>(reader: R) -> Result<Vec<BankTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers)?;
    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = idx + 2;

        let date_str = record.get(columns.date).unwrap_or("");
        let description = record.get(columns.description).unwrap_or("");
        let credit = amount_at(&record, columns.credit, line)?;
        let debit = amount_at(&record, columns.debit, line)?;

        if date_str.is_empty() || description.is_empty() || (credit == 0.0 && debit == 0.0) {
            skipped += 1;
            continue;
        }

        let date = parse_date(date_str)
            .map_err(|e| Error::Import(format!("Line {}: {}", line, e)))?;

        let (kind, amount) = if credit > 0.0 {
            (TransactionKind::Credit, credit)
        } else if debit != 0.0 {
            (TransactionKind::Debit, debit.abs())
        } else {
            // Negative credit column: money out
            (TransactionKind::Debit, credit.abs())
        };

        transactions.push(BankTransaction {
            id: new_id(),
            date,
            description: description.to_string(),
            amount,
            kind,
            status: ReconciliationStatus::Unreconciled,
            import_hash: Some(generate_hash(&date, description, amount, kind)),
        });
    }

    debug!(
        "Parsed {} statement transactions ({} blank rows skipped)",
        transactions.len(),
        skipped
    );
    Ok(transactions)
}

fn amount_at(record: &StringRecord, column: Option<usize>, line: usize) -> Result<f64> {
    match column.and_then(|c| record.get(c)) {
        Some(s) if !s.trim().is_empty() => {
            parse_amount(s).map_err(|e| Error::Import(format!("Line {}: {}", line, e)))
        }
        _ => Ok(0.0),
    }
}

/// Generate a hash for deduplication across repeated imports
fn generate_hash(date: &NaiveDate, description: &str, amount: f64, kind: TransactionKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(kind.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a statement date. Day-first formats win over month-first.
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%d/%m/%Y", // 15/01/2024
        "%d-%m-%Y", // 15-01-2024
        "%d.%m.%Y", // 15.01.2024
        "%d/%m/%y", // 15/01/24
        "%d-%b-%Y", // 15-Jan-2024
        "%d %b %Y", // 15 Jan 2024
        "%d-%b-%y", // 15-Jan-24
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and parentheses
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace("INR", "")
        .replace("Rs.", "")
        .replace(['₹', '$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Import(format!("Unable to parse amount: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15").unwrap(), expected);
        assert_eq!(parse_date("15/01/2024").unwrap(), expected);
        assert_eq!(parse_date("15-Jan-2024").unwrap(), expected);
        assert_eq!(parse_date("15 Jan 2024").unwrap(), expected);
        assert!(parse_date("January fifteenth").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("₹1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("Rs. 500").unwrap(), 500.0);
        assert_eq!(parse_amount("(75.25)").unwrap(), -75.25);
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("NaN").is_err());
    }

    #[test]
    fn test_parse_statement_with_aliases() {
        let csv = "\
Txn Date,Narration,Withdrawal,Deposit,Balance
01/03/2024,NEFT ACME CORP,,\"11,800.00\",50000
02/03/2024,ELECTRICITY BILL,2450.00,,47550
03/03/2024,OPENING NOTE,,,47550
,MISSING DATE,10,,47540
";
        let txs = parse_statement(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);

        assert_eq!(txs[0].kind, TransactionKind::Credit);
        assert_eq!(txs[0].amount, 11800.0);
        assert_eq!(txs[0].description, "NEFT ACME CORP");
        assert_eq!(txs[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(txs[0].status, ReconciliationStatus::Unreconciled);

        assert_eq!(txs[1].kind, TransactionKind::Debit);
        assert_eq!(txs[1].amount, 2450.0);
        assert!(txs[1].import_hash.is_some());
        assert_ne!(txs[0].import_hash, txs[1].import_hash);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let csv = "DATE,description,CREDIT,debit\n2024-03-05,UPI REFUND,100,\n";
        let txs = parse_statement(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionKind::Credit);
    }

    #[test]
    fn test_negative_debit_is_stored_positive() {
        let csv = "Date,Description,Credit,Debit\n2024-03-05,CARD POS,,-320.50\n";
        let txs = parse_statement(csv.as_bytes()).unwrap();
        assert_eq!(txs[0].kind, TransactionKind::Debit);
        assert_eq!(txs[0].amount, 320.5);
    }

    #[test]
    fn test_same_row_hashes_identically() {
        let csv = "Date,Description,Credit,Debit\n2024-03-05,UPI,100,\n";
        let a = parse_statement(csv.as_bytes()).unwrap();
        let b = parse_statement(csv.as_bytes()).unwrap();
        assert_ne!(a[0].id, b[0].id);
        assert_eq!(a[0].import_hash, b[0].import_hash);
    }

    #[test]
    fn test_bad_rows_fail_whole_import() {
        let bad_date = "Date,Description,Credit,Debit\n2024-03-05,OK,100,\n31/31/2024,BAD,5,\n";
        assert!(matches!(
            parse_statement(bad_date.as_bytes()),
            Err(Error::Import(_))
        ));

        let bad_amount = "Date,Description,Credit,Debit\n2024-03-05,BAD,ten,\n";
        assert!(parse_statement(bad_amount.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_columns() {
        let no_description = "Date,Credit,Debit\n2024-03-05,100,\n";
        assert!(parse_statement(no_description.as_bytes()).is_err());

        let no_amounts = "Date,Description,Balance\n2024-03-05,X,100\n";
        assert!(parse_statement(no_amounts.as_bytes()).is_err());
    }
}
