//! Recurring profile command implementations

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use khata_core::models::{Frequency, ProfileStatus};
use khata_core::{ProfileDraft, Session};

use super::{document_parts, truncate};
use crate::cli::DocumentArgs;

pub fn cmd_recurring_list(session: &Session) -> Result<()> {
    let settings = session.settings();
    let profiles = &session.books().recurring_profiles;

    if profiles.is_empty() {
        println!("No recurring profiles found.");
        return Ok(());
    }

    println!(
        "{:36} {:22} {:10} {:10} {:>14} {:7}",
        "ID", "Client", "Frequency", "Next due", "Total", "Status"
    );
    println!("{}", "-".repeat(104));
    for profile in profiles {
        let total = khata_core::tax::calculate(&profile.items, profile.price_type).grand_total;
        println!(
            "{:36} {:22} {:10} {:10} {:>14} {:7}",
            profile.id,
            truncate(&profile.client.name, 22),
            profile.frequency.as_str(),
            profile.next_due_date,
            settings.format_money(total),
            profile.status.as_str(),
        );
    }

    Ok(())
}

pub fn cmd_recurring_add(
    session: &mut Session,
    args: &DocumentArgs,
    frequency: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<()> {
    let frequency: Frequency = frequency.parse().map_err(|e: String| anyhow!(e))?;
    if let Some(end) = end {
        if end < start {
            bail!("End date {} is before start date {}", end, start);
        }
    }

    let (client, items, price_type, transaction_type) = document_parts(session.books(), args)?;
    let profile = session
        .add_recurring_profile(ProfileDraft {
            client,
            items,
            frequency,
            start_date: start,
            end_date: end,
            next_due_date: None,
            price_type,
            transaction_type,
        })
        .context("Failed to add recurring profile")?;

    println!(
        "✅ Added {} profile {} for {}",
        profile.frequency, profile.id, profile.client.name
    );
    if profile.next_due_date <= session.today() {
        println!("   First invoice is due now; it will be issued the next time khata starts.");
    } else {
        println!("   First invoice due {}", profile.next_due_date);
    }
    Ok(())
}

pub fn cmd_recurring_pause(session: &mut Session, id: &str) -> Result<()> {
    session
        .set_profile_status(id, ProfileStatus::Paused)
        .with_context(|| format!("Failed to pause profile {}", id))?;
    println!("⏸️  Paused profile {}", id);
    Ok(())
}

pub fn cmd_recurring_resume(session: &mut Session, id: &str) -> Result<()> {
    session
        .set_profile_status(id, ProfileStatus::Active)
        .with_context(|| format!("Failed to resume profile {}", id))?;
    println!("▶️  Resumed profile {}", id);
    Ok(())
}

pub fn cmd_recurring_toggle(session: &mut Session, id: &str) -> Result<()> {
    let status = session
        .toggle_profile(id)
        .with_context(|| format!("Failed to toggle profile {}", id))?;
    println!("🔁 Profile {} is now {}", id, status.as_str());
    Ok(())
}

pub fn cmd_recurring_delete(session: &mut Session, id: &str) -> Result<()> {
    let profile = session
        .delete_profile(id)
        .with_context(|| format!("Failed to delete profile {}", id))?;
    println!(
        "🗑️  Deleted {} profile for {}",
        profile.frequency, profile.client.name
    );
    Ok(())
}
