//! # Duplicate Detection
//!
//! Advisory matching of a candidate contact against a corpus. The result is
//! shown to the user for confirmation; nothing here ever drops a record.
//!
//! ## Rules
//!
//! - **Name**: both names non-empty after trimming, equal after case folding.
//! - **Phone**: the `{phone, mobile}` values of both sides share at least one
//!   number once every non-digit is removed. Values with no digits are
//!   ignored. A leading country code of up to three digits is tolerated when
//!   the remaining national number has at least seven digits, so
//!   `+1 (555) 123-4567` and `555.123.4567` are the same number.
//! - A corpus record is a duplicate when either rule matches.
//!
//! Matching only looks at contact attributes, never at ids or timestamps, so
//! the result is the same whether the corpus came from the remote listing or
//! from the local cache. Both rules are symmetric.

use crate::model::{ContactFields, ContactRecord};

const MAX_COUNTRY_CODE_DIGITS: usize = 3;
const MIN_NATIONAL_DIGITS: usize = 7;

/// Trimmed, case-folded name, or `None` when there is nothing to compare.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Digits only, or `None` when no digit remains.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Compare two normalized numbers, allowing a country code on one side.
pub fn numbers_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short == long {
        return !short.is_empty();
    }
    let prefix = long.len() - short.len();
    short.len() >= MIN_NATIONAL_DIGITS
        && prefix <= MAX_COUNTRY_CODE_DIGITS
        && long.ends_with(short)
}

fn normalized_phones(fields: &ContactFields) -> Vec<String> {
    fields.phones().filter_map(normalize_phone).collect()
}

fn any_number_shared(ours: &[String], theirs: &[String]) -> bool {
    ours.iter().any(|a| theirs.iter().any(|b| numbers_match(a, b)))
}

pub fn names_match(a: &ContactFields, b: &ContactFields) -> bool {
    match (
        a.name.as_str().and_then(normalize_name),
        b.name.as_str().and_then(normalize_name),
    ) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

pub fn phones_match(a: &ContactFields, b: &ContactFields) -> bool {
    any_number_shared(&normalized_phones(a), &normalized_phones(b))
}

pub fn is_duplicate(a: &ContactFields, b: &ContactFields) -> bool {
    names_match(a, b) || phones_match(a, b)
}

/// Every corpus record that likely describes the same contact, in corpus order.
pub fn find_duplicates(candidate: &ContactFields, corpus: &[ContactRecord]) -> Vec<ContactRecord> {
    let name = candidate.name.as_str().and_then(normalize_name);
    let phones = normalized_phones(candidate);

    corpus
        .iter()
        .filter(|record| {
            let name_hit = match (&name, record.fields.name.as_str().and_then(normalize_name)) {
                (Some(ours), Some(theirs)) => *ours == theirs,
                _ => false,
            };
            name_hit || any_number_shared(&phones, &normalized_phones(&record.fields))
        })
        .cloned()
        .collect()
}
