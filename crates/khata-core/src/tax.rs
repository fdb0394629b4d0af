//! GST arithmetic
//!
//! Turns line items into taxable value, tax and grand total, and splits tax
//! into the CGST/SGST/IGST heads printed on documents and filed in returns.

use serde::Serialize;

use crate::models::{CalculationResult, GstBreakdown, LineItem, PriceType, TransactionType};

/// Compute totals and per-rate breakdown for a list of items
///
/// Items with a non-positive or unset quantity or price are skipped. No
/// rounding is applied; callers round only for display.
pub fn calculate(items: &[LineItem], price_type: PriceType) -> CalculationResult {
    let mut result = CalculationResult::default();

    for item in items.iter().filter(|item| item.is_billable()) {
        let (net, gst) = item_amounts(item, price_type);

        result.total_net_amount += net;
        result.total_gst_amount += gst;

        match result
            .gst_breakdown
            .iter_mut()
            .find(|b| b.rate == item.gst_rate)
        {
            Some(entry) => {
                entry.taxable_amount += net;
                entry.gst_amount += gst;
            }
            None => result.gst_breakdown.push(GstBreakdown {
                rate: item.gst_rate,
                taxable_amount: net,
                gst_amount: gst,
            }),
        }
    }

    result.grand_total = result.total_net_amount + result.total_gst_amount;
    result
}

/// Taxable value and tax for a single item
fn item_amounts(item: &LineItem, price_type: PriceType) -> (f64, f64) {
    let line_total = item.quantity * item.price;
    match price_type {
        PriceType::Exclusive => (line_total, line_total * item.gst_rate / 100.0),
        PriceType::Inclusive => {
            let net = line_total / (1.0 + item.gst_rate / 100.0);
            (net, line_total - net)
        }
    }
}

/// Tax (or a rate) split across the three GST heads
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TaxHeads {
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
}

impl TaxHeads {
    pub fn total(&self) -> f64 {
        self.cgst + self.sgst + self.igst
    }
}

/// Split an amount into tax heads
///
/// Intra-state supplies carry half as CGST and half as SGST; inter-state
/// supplies carry it all as IGST. Applied to a rate instead of an amount this
/// gives the per-head rate shown on a document (9% + 9% for an 18% slab).
pub fn split_tax(amount: f64, transaction_type: TransactionType) -> TaxHeads {
    match transaction_type {
        TransactionType::IntraState => TaxHeads {
            cgst: amount / 2.0,
            sgst: amount / 2.0,
            igst: 0.0,
        },
        TransactionType::InterState => TaxHeads {
            cgst: 0.0,
            sgst: 0.0,
            igst: amount,
        },
    }
}

/// A breakdown row ready for display: amounts and rates per head
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownLine {
    pub rate: f64,
    pub taxable_amount: f64,
    pub amounts: TaxHeads,
    pub rates: TaxHeads,
}

/// Split every row of a calculation's breakdown
pub fn breakdown_lines(
    result: &CalculationResult,
    transaction_type: TransactionType,
) -> Vec<BreakdownLine> {
    result
        .gst_breakdown
        .iter()
        .map(|b| BreakdownLine {
            rate: b.rate,
            taxable_amount: b.taxable_amount,
            amounts: split_tax(b.gst_amount, transaction_type),
            rates: split_tax(b.rate, transaction_type),
        })
        .collect()
}

/// Taxable value and tax heads accumulated for one rate across many records
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RateSummary {
    pub rate: f64,
    pub taxable_amount: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
}

impl RateSummary {
    pub fn total_tax(&self) -> f64 {
        self.cgst + self.sgst + self.igst
    }
}

/// Merge the breakdowns of many records per rate, in first-seen order
pub fn aggregate_breakdowns<'a, I>(records: I) -> Vec<RateSummary>
where
    I: IntoIterator<Item = (&'a CalculationResult, TransactionType)>,
{
    let mut summary: Vec<RateSummary> = Vec::new();

    for (result, transaction_type) in records {
        for b in &result.gst_breakdown {
            let heads = split_tax(b.gst_amount, transaction_type);
            let idx = match summary.iter().position(|s| s.rate == b.rate) {
                Some(idx) => idx,
                None => {
                    summary.push(RateSummary {
                        rate: b.rate,
                        ..Default::default()
                    });
                    summary.len() - 1
                }
            };
            let entry = &mut summary[idx];
            entry.taxable_amount += b.taxable_amount;
            entry.cgst += heads.cgst;
            entry.sgst += heads.sgst;
            entry.igst += heads.igst;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn item(qty: f64, price: f64, rate: f64) -> LineItem {
        LineItem::new("Item", qty, price, rate)
    }

    fn assert_identities(result: &CalculationResult) {
        let taxable: f64 = result.gst_breakdown.iter().map(|b| b.taxable_amount).sum();
        let gst: f64 = result.gst_breakdown.iter().map(|b| b.gst_amount).sum();
        assert!((result.grand_total - (result.total_net_amount + result.total_gst_amount)).abs() < EPS);
        assert!((result.total_net_amount - taxable).abs() < EPS);
        assert!((result.total_gst_amount - gst).abs() < EPS);
    }

    #[test]
    fn test_exclusive_calculation() {
        let items = vec![item(2.0, 100.0, 18.0), item(1.0, 50.0, 5.0)];
        let result = calculate(&items, PriceType::Exclusive);

        assert!((result.total_net_amount - 250.0).abs() < EPS);
        assert!((result.total_gst_amount - 38.5).abs() < EPS);
        assert!((result.grand_total - 288.5).abs() < EPS);
        assert_eq!(result.gst_breakdown.len(), 2);
        assert_eq!(result.gst_breakdown[0].rate, 18.0);
        assert_eq!(result.gst_breakdown[1].rate, 5.0);
        assert_identities(&result);
    }

    #[test]
    fn test_inclusive_calculation() {
        let items = vec![item(1.0, 118.0, 18.0)];
        let result = calculate(&items, PriceType::Inclusive);

        assert!((result.total_net_amount - 100.0).abs() < EPS);
        assert!((result.total_gst_amount - 18.0).abs() < EPS);
        assert!((result.grand_total - 118.0).abs() < EPS);
        assert_identities(&result);
    }

    #[test]
    fn test_inclusive_inverts_exclusive() {
        for rate in crate::models::GST_RATES {
            let net = 1234.56;
            let inclusive_price = net * (1.0 + rate / 100.0);
            let result = calculate(&[item(1.0, inclusive_price, rate)], PriceType::Inclusive);
            assert!((result.total_net_amount - net).abs() < EPS, "rate {}", rate);
        }
    }

    #[test]
    fn test_same_rate_items_merge_in_first_seen_order() {
        let items = vec![
            item(1.0, 100.0, 12.0),
            item(1.0, 100.0, 28.0),
            item(3.0, 10.0, 12.0),
        ];
        let result = calculate(&items, PriceType::Exclusive);

        assert_eq!(result.gst_breakdown.len(), 2);
        assert_eq!(result.gst_breakdown[0].rate, 12.0);
        assert!((result.gst_breakdown[0].taxable_amount - 130.0).abs() < EPS);
        assert!((result.gst_breakdown[0].gst_amount - 15.6).abs() < EPS);
        assert_eq!(result.gst_breakdown[1].rate, 28.0);
        assert_identities(&result);
    }

    #[test]
    fn test_inert_items_are_skipped() {
        let items = vec![
            item(0.0, 100.0, 18.0),
            item(2.0, -5.0, 18.0),
            item(f64::NAN, 100.0, 18.0),
            item(1.0, f64::NAN, 18.0),
        ];
        let result = calculate(&items, PriceType::Exclusive);
        assert_eq!(result, CalculationResult::default());

        let empty = calculate(&[], PriceType::Inclusive);
        assert_eq!(empty.grand_total, 0.0);
        assert!(empty.gst_breakdown.is_empty());
    }

    #[test]
    fn test_zero_rate_item() {
        let result = calculate(&[item(4.0, 25.0, 0.0)], PriceType::Inclusive);
        assert!((result.total_net_amount - 100.0).abs() < EPS);
        assert_eq!(result.total_gst_amount, 0.0);
        assert_eq!(result.gst_breakdown.len(), 1);
    }

    #[test]
    fn test_split_tax_conserves_amount() {
        for amount in [0.0, 0.01, 18.0, 1234.567] {
            let intra = split_tax(amount, TransactionType::IntraState);
            assert_eq!(intra.cgst, intra.sgst);
            assert_eq!(intra.igst, 0.0);
            assert!((intra.total() - amount).abs() < EPS);

            let inter = split_tax(amount, TransactionType::InterState);
            assert_eq!(inter.cgst, 0.0);
            assert_eq!(inter.sgst, 0.0);
            assert_eq!(inter.igst, amount);
        }
    }

    #[test]
    fn test_breakdown_lines_show_head_rates() {
        let result = calculate(&[item(1.0, 1000.0, 18.0)], PriceType::Exclusive);

        let intra = breakdown_lines(&result, TransactionType::IntraState);
        assert_eq!(intra[0].rates.cgst, 9.0);
        assert_eq!(intra[0].rates.sgst, 9.0);
        assert!((intra[0].amounts.cgst - 90.0).abs() < EPS);

        let inter = breakdown_lines(&result, TransactionType::InterState);
        assert_eq!(inter[0].rates.igst, 18.0);
        assert!((inter[0].amounts.igst - 180.0).abs() < EPS);
    }

    #[test]
    fn test_aggregate_breakdowns_across_records() {
        let a = calculate(&[item(1.0, 100.0, 18.0)], PriceType::Exclusive);
        let b = calculate(
            &[item(1.0, 200.0, 18.0), item(1.0, 100.0, 5.0)],
            PriceType::Exclusive,
        );

        let summary = aggregate_breakdowns([
            (&a, TransactionType::IntraState),
            (&b, TransactionType::InterState),
        ]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].rate, 18.0);
        assert!((summary[0].taxable_amount - 300.0).abs() < EPS);
        assert!((summary[0].cgst - 9.0).abs() < EPS);
        assert!((summary[0].sgst - 9.0).abs() < EPS);
        assert!((summary[0].igst - 36.0).abs() < EPS);
        assert!((summary[0].total_tax() - 54.0).abs() < EPS);
        assert_eq!(summary[1].rate, 5.0);
    }
}
