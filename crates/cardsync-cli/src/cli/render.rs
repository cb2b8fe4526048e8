//! Plain-text rendering. Functions return strings so output can be tested.

use cardsync::model::{ContactRecord, PendingWrite};
use cardsync::{DrainReport, QueueReason, SaveOutcome, SaveStatus};
use colored::*;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn short_id(id: &str) -> String {
    id.chars().take(16).collect()
}

pub fn record_line(record: &ContactRecord) -> String {
    let id = if record.is_pending() {
        short_id(&record.id).yellow()
    } else {
        short_id(&record.id).green()
    };
    let name = record.fields.name.as_str().unwrap_or("(no name)");

    let mut details: Vec<&str> = Vec::new();
    if let Some(company) = record.fields.company.as_str() {
        details.push(company);
    }
    details.extend(record.fields.phones());
    if let Some(email) = record.fields.email.as_str() {
        details.push(email);
    }

    let mut line = format!("{:<16}  {}", id, name.bold());
    if !details.is_empty() {
        line.push_str(&format!("  {}", details.join(" · ").dimmed()));
    }
    if record.local_only {
        line.push_str(&format!("  {}", "(this device only)".red()));
    } else if record.is_pending() {
        line.push_str(&format!("  {}", "(not synced)".yellow()));
    }
    line
}

pub fn records(records: &[ContactRecord]) -> String {
    if records.is_empty() {
        return "No contacts found.\n".to_string();
    }
    records
        .iter()
        .map(|r| format!("{}\n", record_line(r)))
        .collect()
}

pub fn save_outcome(outcome: &SaveOutcome) -> String {
    match outcome.status {
        SaveStatus::Synced => format!("Saved {}", record_line(&outcome.record)),
        SaveStatus::Queued { reason } => {
            let why = match reason {
                QueueReason::Offline => "offline",
                QueueReason::RemoteFailed => "remote store failed",
            };
            format!(
                "Queued {} ({}; will sync later)",
                record_line(&outcome.record),
                why
            )
        }
    }
}

pub fn pending(writes: &[PendingWrite]) -> String {
    if writes.is_empty() {
        return "Nothing waiting to sync.\n".to_string();
    }
    writes
        .iter()
        .map(|w| {
            format!(
                "{:<16}  {}  queued {}  attempts {}\n",
                short_id(&w.id).yellow(),
                w.payload.fields.name.as_str().unwrap_or("(no name)").bold(),
                w.queued_at.format(DATE_FORMAT),
                w.attempt_count
            )
        })
        .collect()
}

pub fn drain_report(report: &DrainReport) -> String {
    let mut out = format!(
        "Synced {}, retrying {}, abandoned {}, remaining {}\n",
        report.synced.len().to_string().green(),
        report.retried.len().to_string().yellow(),
        report.abandoned.len().to_string().red(),
        report.remaining
    );
    for synced in &report.synced {
        out.push_str(&format!("  {} -> {}\n", synced.pending_id, synced.record.id));
    }
    for id in &report.abandoned {
        out.push_str(&format!(
            "  {} {}\n",
            id.red(),
            "gave up; kept on this device only".dimmed()
        ));
    }
    for id in &report.failed {
        out.push_str(&format!(
            "  {} {}\n",
            id.red(),
            "local storage error; see log".dimmed()
        ));
    }
    out
}
