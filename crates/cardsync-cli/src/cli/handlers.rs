//! Command handlers: turn parsed arguments into API calls and print results.

use super::context::Context;
use super::render;
use super::setup::FieldArgs;
use anyhow::{anyhow, bail, Result};
use cardsync::model::{ContactFields, ContactRecord, FieldValue, NewContact};
use cardsync::DrainOutcome;

impl FieldArgs {
    /// Attributes given on the command line; unset flags stay absent.
    pub fn to_fields(&self) -> Result<ContactFields> {
        let mut fields = ContactFields::default();
        let named = [
            ("name", &self.name),
            ("title", &self.title),
            ("company", &self.company),
            ("email", &self.email),
            ("phone", &self.phone),
            ("mobile", &self.mobile),
            ("fax", &self.fax),
            ("website", &self.website),
            ("address", &self.address),
            ("linkedin", &self.linkedin),
            ("twitter", &self.twitter),
            ("notes", &self.notes),
        ];
        for (key, value) in named {
            if let Some(value) = value {
                fields.set(key, FieldValue::from(value.as_str()));
            }
        }
        for pair in &self.extra {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("--field expects KEY=VALUE, got '{}'", pair))?;
            let key = key.trim();
            if key.is_empty() {
                bail!("--field has an empty key: '{}'", pair);
            }
            fields.set(key, FieldValue::from(value));
        }
        Ok(fields)
    }
}

/// Copy every attribute that carries a value or an explicit null.
fn overlay(target: &mut ContactFields, changes: &ContactFields) {
    for key in ContactFields::NAMED {
        let value = changes.get(key);
        if !value.is_absent() {
            target.set(key, value.clone());
        }
    }
    for (key, value) in &changes.metadata {
        if !value.is_absent() {
            target.set(key, value.clone());
        }
    }
}

/// The contact with exactly this id, else the only one whose id starts with
/// it. Listings show shortened ids, so a prefix is what users type.
fn find_contact(mut records: Vec<ContactRecord>, id: &str) -> Result<ContactRecord> {
    if id.trim().is_empty() {
        bail!("contact id is empty");
    }
    if let Some(pos) = records.iter().position(|r| r.id == id) {
        return Ok(records.swap_remove(pos));
    }
    let mut matches = records.into_iter().filter(|r| r.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(record), None) => Ok(record),
        (None, _) => bail!("no contact with id {}", id),
        (Some(_), Some(_)) => bail!("id {} matches more than one contact", id),
    }
}

pub fn list(ctx: &Context) -> Result<()> {
    let records = ctx.api.list(&ctx.owner)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", render::records(&records));
    }
    Ok(())
}

pub fn add(ctx: &Context, args: &FieldArgs, preview: Option<String>, force: bool) -> Result<()> {
    let fields = args.to_fields()?;

    if !force {
        let dupes = ctx.api.check_for_duplicates(&ctx.owner, &fields)?;
        if !dupes.is_empty() {
            eprint!("{}", render::records(&dupes));
            bail!(
                "{} possible duplicate(s); re-run with --force to save anyway",
                dupes.len()
            );
        }
    }

    let mut contact = NewContact::new(fields);
    contact.preview = preview;
    let outcome = ctx.api.save(&ctx.owner, contact)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&outcome.record)?);
    } else {
        println!("{}", render::save_outcome(&outcome));
    }
    Ok(())
}

pub fn update(ctx: &Context, id: &str, args: &FieldArgs, clear: &[String]) -> Result<()> {
    let mut record = find_contact(ctx.api.list(&ctx.owner)?, id)?;

    overlay(&mut record.fields, &args.to_fields()?);
    for key in clear {
        record.fields.set(key, FieldValue::Null);
    }

    let updated = ctx.api.update(&ctx.owner, &record)?;
    println!("Updated {}", render::record_line(&updated));
    Ok(())
}

pub fn delete(ctx: &Context, id: &str) -> Result<()> {
    let record = find_contact(ctx.api.list(&ctx.owner)?, id)?;
    ctx.api.delete(&ctx.owner, &record.id)?;
    println!("Deleted {}", render::record_line(&record));
    Ok(())
}

pub fn dupes(ctx: &Context, args: &FieldArgs) -> Result<()> {
    let candidate = args.to_fields()?;
    let matches = ctx.api.check_for_duplicates(&ctx.owner, &candidate)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else if matches.is_empty() {
        println!("No likely duplicates.");
    } else {
        print!("{}", render::records(&matches));
    }
    Ok(())
}

pub fn pending(ctx: &Context) -> Result<()> {
    let writes = ctx.api.pending(&ctx.owner)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&writes)?);
    } else {
        print!("{}", render::pending(&writes));
    }
    Ok(())
}

pub fn sync(ctx: &Context) -> Result<()> {
    match ctx.engine.trigger_drain()? {
        DrainOutcome::Completed(report) => {
            if ctx.json {
                let synced: Vec<serde_json::Value> = report
                    .synced
                    .iter()
                    .map(|s| serde_json::json!({"pending_id": s.pending_id, "id": s.record.id}))
                    .collect();
                let value = serde_json::json!({
                    "synced": synced,
                    "retried": report.retried,
                    "abandoned": report.abandoned,
                    "failed": report.failed,
                    "remaining": report.remaining,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", render::drain_report(&report));
            }
            Ok(())
        }
        DrainOutcome::Offline => bail!("remote store is not reachable; nothing was synced"),
        DrainOutcome::AlreadyRunning => {
            println!("A sync is already running.");
            Ok(())
        }
    }
}
