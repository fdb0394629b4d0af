//! Recurring profile catch-up
//!
//! On start-up every active profile is walked forward through the billing
//! cycles it missed. Each cycle that is due on or before the reference date
//! issues one invoice, takes the invoiced quantities out of stock and moves the
//! profile's due date on by one cycle. A profile that passes its end date is
//! paused instead.
//!
//! The scheduler never touches its inputs; it returns new snapshots and the
//! caller decides what to persist.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GatewaySettings;
use crate::models::{
    BusinessDetails, InvoiceRecord, LineItem, Product, ProfileStatus, RecurringProfile,
};
use crate::records::{self, DocumentDraft};
use crate::stock::{self, StockDelta, StockDirection};

/// Everything one scheduler pass reads
#[derive(Debug, Clone, Copy)]
pub struct SchedulerInput<'a> {
    pub profiles: &'a [RecurringProfile],
    pub products: &'a [Product],
    pub business: &'a BusinessDetails,
    /// Invoices issued so far; the next invoice is numbered `invoice_counter + 1`
    pub invoice_counter: u64,
    pub gateway: &'a GatewaySettings,
    pub reference_date: NaiveDate,
}

/// A profile the scheduler could not advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerDiagnostic {
    /// The stored cadence is not one the scheduler knows; the profile is left as is
    UnrecognizedFrequency { profile_id: String, frequency: String },
    /// Advancing the due date ran past the supported calendar range
    DateOutOfRange { profile_id: String, due_date: NaiveDate },
}

impl std::fmt::Display for SchedulerDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedFrequency {
                profile_id,
                frequency,
            } => write!(
                f,
                "profile {} has unrecognized frequency '{}'",
                profile_id, frequency
            ),
            Self::DateOutOfRange {
                profile_id,
                due_date,
            } => write!(
                f,
                "profile {} cannot advance past {}",
                profile_id, due_date
            ),
        }
    }
}

/// Result of one scheduler pass
#[derive(Debug, Clone, Default)]
pub struct SchedulerOutcome {
    /// Every input profile, advanced where due
    pub profiles: Vec<RecurringProfile>,
    /// New invoices in generation order (oldest first)
    pub invoices: Vec<InvoiceRecord>,
    /// Products after all stock movements
    pub products: Vec<Product>,
    /// Net stock movement per product across the whole pass
    pub stock_deltas: Vec<StockDelta>,
    /// Counter after the last generated invoice
    pub invoice_counter: u64,
    /// Profiles paused because they ran past their end date
    pub paused: Vec<String>,
    pub diagnostics: Vec<SchedulerDiagnostic>,
}

impl SchedulerOutcome {
    /// Whether anything needs persisting
    pub fn has_changes(&self) -> bool {
        !self.invoices.is_empty() || !self.paused.is_empty()
    }
}

/// Run one catch-up pass over all profiles
pub fn advance_profiles(input: SchedulerInput<'_>) -> SchedulerOutcome {
    let mut outcome = SchedulerOutcome {
        profiles: Vec::with_capacity(input.profiles.len()),
        products: input.products.to_vec(),
        invoice_counter: input.invoice_counter,
        ..Default::default()
    };

    for profile in input.profiles {
        if !profile.is_active() {
            outcome.profiles.push(profile.clone());
            continue;
        }

        let Some(months) = profile.frequency.months() else {
            warn!(
                "Skipping recurring profile {}: unrecognized frequency '{}'",
                profile.id, profile.frequency
            );
            outcome
                .diagnostics
                .push(SchedulerDiagnostic::UnrecognizedFrequency {
                    profile_id: profile.id.clone(),
                    frequency: profile.frequency.to_string(),
                });
            outcome.profiles.push(profile.clone());
            continue;
        };

        let advanced = advance_profile(profile, months, &input, &mut outcome);
        outcome.profiles.push(advanced);
    }

    if !outcome.invoices.is_empty() {
        info!(
            "Generated {} recurring invoice(s) up to {}",
            outcome.invoices.len(),
            input.reference_date
        );
    }

    outcome
}

/// Walk one active profile through its due cycles
fn advance_profile(
    profile: &RecurringProfile,
    months: u32,
    input: &SchedulerInput<'_>,
    outcome: &mut SchedulerOutcome,
) -> RecurringProfile {
    let mut profile = profile.clone();

    while profile.next_due_date <= input.reference_date {
        if let Some(end_date) = profile.end_date {
            if profile.next_due_date > end_date {
                debug!(
                    "Profile {} passed its end date {}, pausing",
                    profile.id, end_date
                );
                profile.status = ProfileStatus::Paused;
                outcome.paused.push(profile.id.clone());
                break;
            }
        }

        let due = profile.next_due_date;
        let draft = DocumentDraft {
            client: profile.client.clone(),
            items: profile.items.iter().map(LineItem::with_fresh_id).collect(),
            date: due,
            price_type: profile.price_type,
            transaction_type: profile.transaction_type,
            logistics: None,
            custom_field_values: None,
        };
        let invoice = records::build_invoice(
            draft,
            input.business,
            outcome.invoice_counter,
            input.gateway,
        );
        outcome.invoice_counter += 1;

        let deltas =
            stock::stock_deltas(&outcome.products, &invoice.items, StockDirection::Decrement);
        outcome.products =
            stock::apply_stock_delta(&outcome.products, &invoice.items, StockDirection::Decrement);
        merge_deltas(&mut outcome.stock_deltas, deltas);

        debug!(
            "Profile {} issued {} dated {}",
            profile.id, invoice.invoice_number, due
        );
        outcome.invoices.push(invoice);
        profile.last_generated_date = Some(due);

        match roll_months(due, months) {
            Some(next) => profile.next_due_date = next,
            None => {
                warn!("Profile {} cannot advance past {}", profile.id, due);
                outcome.diagnostics.push(SchedulerDiagnostic::DateOutOfRange {
                    profile_id: profile.id.clone(),
                    due_date: due,
                });
                break;
            }
        }
    }

    profile
}

/// Move a date on by whole months, letting a day past the end of the target
/// month spill into the next one (Jan 31 + 1 month is Mar 2 in a leap year)
fn roll_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(months))?
        .checked_add_days(Days::new(u64::from(date.day0())))
}

fn merge_deltas(total: &mut Vec<StockDelta>, deltas: Vec<StockDelta>) {
    for delta in deltas {
        match total.iter_mut().find(|d| d.product_id == delta.product_id) {
            Some(existing) => existing.change += delta.change,
            None => total.push(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{new_id, ClientDetails, Frequency, PriceType, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile(frequency: Frequency, next_due: NaiveDate) -> RecurringProfile {
        RecurringProfile {
            id: new_id(),
            client: ClientDetails {
                id: new_id(),
                name: "Acme".to_string(),
                ..Default::default()
            },
            items: vec![LineItem::new("Widget", 2.0, 100.0, 18.0)],
            frequency,
            start_date: next_due,
            end_date: None,
            last_generated_date: None,
            next_due_date: next_due,
            status: ProfileStatus::Active,
            price_type: PriceType::Exclusive,
            transaction_type: TransactionType::IntraState,
        }
    }

    fn widget(stock: f64) -> Product {
        Product {
            id: new_id(),
            name: "widget".to_string(),
            hsn: String::new(),
            price: 100.0,
            gst_rate: 18.0,
            track_stock: true,
            stock,
            low_stock_threshold: 0.0,
        }
    }

    fn run(
        profiles: &[RecurringProfile],
        products: &[Product],
        counter: u64,
        reference: NaiveDate,
    ) -> SchedulerOutcome {
        advance_profiles(SchedulerInput {
            profiles,
            products,
            business: &BusinessDetails::default(),
            invoice_counter: counter,
            gateway: &GatewaySettings::default(),
            reference_date: reference,
        })
    }

    #[test]
    fn test_monthly_catch_up_is_inclusive_of_reference_date() {
        let profiles = vec![profile(Frequency::Monthly, date(2024, 1, 1))];
        let products = vec![widget(20.0)];

        let outcome = run(&profiles, &products, 5, date(2024, 4, 1));

        assert_eq!(outcome.invoices.len(), 4);
        let dates: Vec<NaiveDate> = outcome.invoices.iter().map(|i| i.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1), date(2024, 4, 1)]
        );
        let numbers: Vec<&str> = outcome
            .invoices
            .iter()
            .map(|i| i.invoice_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["INV-006", "INV-007", "INV-008", "INV-009"]);
        assert_eq!(outcome.invoice_counter, 9);

        let advanced = &outcome.profiles[0];
        assert_eq!(advanced.next_due_date, date(2024, 5, 1));
        assert_eq!(advanced.last_generated_date, Some(date(2024, 4, 1)));
        assert!(advanced.is_active());

        assert_eq!(outcome.products[0].stock, 12.0);
        assert_eq!(outcome.stock_deltas.len(), 1);
        assert_eq!(outcome.stock_deltas[0].change, -8.0);

        // Inputs are untouched
        assert_eq!(profiles[0].next_due_date, date(2024, 1, 1));
        assert_eq!(products[0].stock, 20.0);
    }

    #[test]
    fn test_quarterly_profile_pauses_after_end_date() {
        let mut p = profile(Frequency::Quarterly, date(2024, 1, 1));
        p.end_date = Some(date(2024, 5, 15));

        let outcome = run(&[p], &[], 0, date(2024, 12, 31));

        assert_eq!(outcome.invoices.len(), 2);
        assert_eq!(outcome.invoices[0].date, date(2024, 1, 1));
        assert_eq!(outcome.invoices[1].date, date(2024, 4, 1));
        let paused = &outcome.profiles[0];
        assert_eq!(paused.status, ProfileStatus::Paused);
        assert_eq!(paused.next_due_date, date(2024, 7, 1));
        assert_eq!(paused.last_generated_date, Some(date(2024, 4, 1)));
        assert!(outcome.has_changes());
    }

    #[test]
    fn test_not_yet_due_profile_is_unchanged() {
        let profiles = vec![profile(Frequency::Yearly, date(2024, 6, 1))];
        let outcome = run(&profiles, &[], 3, date(2024, 5, 31));

        assert!(outcome.invoices.is_empty());
        assert_eq!(outcome.invoice_counter, 3);
        assert_eq!(outcome.profiles, profiles);
        assert!(!outcome.has_changes());
    }

    #[test]
    fn test_paused_profiles_are_skipped() {
        let mut p = profile(Frequency::Monthly, date(2024, 1, 1));
        p.status = ProfileStatus::Paused;

        let outcome = run(&[p.clone()], &[], 0, date(2024, 3, 1));
        assert!(outcome.invoices.is_empty());
        assert_eq!(outcome.profiles[0], p);
    }

    #[test]
    fn test_unrecognized_frequency_reports_and_leaves_profile() {
        let p = profile(
            Frequency::Unrecognized("fortnightly".to_string()),
            date(2024, 1, 1),
        );
        let outcome = run(&[p.clone()], &[], 0, date(2024, 3, 1));

        assert!(outcome.invoices.is_empty());
        assert_eq!(outcome.profiles[0], p);
        assert_eq!(
            outcome.diagnostics,
            vec![SchedulerDiagnostic::UnrecognizedFrequency {
                profile_id: p.id.clone(),
                frequency: "fortnightly".to_string(),
            }]
        );
    }

    #[test]
    fn test_counter_is_shared_across_profiles() {
        let profiles = vec![
            profile(Frequency::Monthly, date(2024, 1, 1)),
            profile(Frequency::Yearly, date(2022, 3, 1)),
        ];
        let outcome = run(&profiles, &[], 0, date(2024, 2, 15));

        assert_eq!(outcome.invoices.len(), 4);
        assert_eq!(outcome.invoices[3].invoice_number, "INV-004");
        assert_eq!(outcome.invoices[2].date, date(2022, 3, 1));
        assert_eq!(outcome.profiles[1].next_due_date, date(2024, 3, 1));
    }

    #[test]
    fn test_month_end_due_dates_roll_over() {
        let profiles = vec![profile(Frequency::Monthly, date(2024, 1, 31))];
        let outcome = run(&profiles, &[], 0, date(2024, 2, 29));

        assert_eq!(outcome.invoices.len(), 1);
        assert_eq!(outcome.profiles[0].next_due_date, date(2024, 3, 2));

        let outcome = run(&profiles, &[], 0, date(2024, 4, 30));
        let dates: Vec<NaiveDate> = outcome.invoices.iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 31), date(2024, 3, 2), date(2024, 4, 2)]);
        assert_eq!(outcome.profiles[0].next_due_date, date(2024, 5, 2));
    }

    #[test]
    fn test_roll_months() {
        assert_eq!(roll_months(date(2024, 2, 29), 12), Some(date(2025, 3, 1)));
        assert_eq!(roll_months(date(2023, 11, 30), 3), Some(date(2024, 3, 1)));
        assert_eq!(roll_months(date(2024, 5, 15), 1), Some(date(2024, 6, 15)));
        assert_eq!(roll_months(date(2024, 12, 31), 1), Some(date(2025, 1, 31)));
        assert_eq!(roll_months(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_due_date_on_end_date_is_still_invoiced() {
        let mut p = profile(Frequency::Monthly, date(2024, 1, 1));
        p.end_date = Some(date(2024, 3, 1));

        let outcome = run(&[p], &[], 0, date(2024, 6, 1));

        let dates: Vec<NaiveDate> = outcome.invoices.iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]);
        assert_eq!(outcome.profiles[0].status, ProfileStatus::Paused);
        assert_eq!(outcome.profiles[0].next_due_date, date(2024, 4, 1));
        assert_eq!(outcome.paused, vec![outcome.profiles[0].id.clone()]);
    }

    #[test]
    fn test_generated_invoices_carry_payment_link_when_gateway_configured() {
        let profiles = vec![profile(Frequency::Monthly, date(2024, 1, 1))];
        let gateway = GatewaySettings {
            key_id: "rzp_test_key".to_string(),
            key_secret: "secret".to_string(),
        };
        let outcome = advance_profiles(SchedulerInput {
            profiles: &profiles,
            products: &[],
            business: &BusinessDetails::default(),
            invoice_counter: 0,
            gateway: &gateway,
            reference_date: date(2024, 2, 1),
        });

        assert_eq!(outcome.invoices.len(), 2);
        for invoice in &outcome.invoices {
            let link = invoice.payment_link.as_deref().unwrap();
            assert!(link.starts_with("https://rzp.io/i/"));
        }
        assert_ne!(outcome.invoices[0].payment_link, outcome.invoices[1].payment_link);

        // Without credentials there is no link
        let outcome = run(&profiles, &[], 0, date(2024, 2, 1));
        assert!(outcome.invoices.iter().all(|i| i.payment_link.is_none()));
    }

    #[test]
    fn test_generated_items_get_fresh_ids() {
        let profiles = vec![profile(Frequency::Monthly, date(2024, 1, 1))];
        let outcome = run(&profiles, &[], 0, date(2024, 2, 1));

        let template_id = &profiles[0].items[0].id;
        assert_ne!(&outcome.invoices[0].items[0].id, template_id);
        assert_ne!(outcome.invoices[0].items[0].id, outcome.invoices[1].items[0].id);
    }
}
