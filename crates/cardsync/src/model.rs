//! # Domain Model: Contact Records and Identifier Spaces
//!
//! This module defines the records the rest of the crate moves around:
//! [`ContactRecord`], [`NewContact`], [`PendingWrite`] and the tri-state
//! [`FieldValue`].
//!
//! ## Identifier Spaces
//!
//! Two disjoint id spaces coexist:
//!
//! - **Confirmed ids** are assigned by the remote store when a create succeeds.
//! - **Local-pending ids** are generated on the device for records that the
//!   remote store has not confirmed yet. They always start with
//!   [`PENDING_ID_PREFIX`] and are never sent to the remote store.
//!
//! The prefix is the only thing that distinguishes the two spaces, so every
//! component asks [`is_pending_id`] instead of inspecting id formats.
//!
//! ## Absent vs Cleared
//!
//! Contact attributes are tri-state:
//!
//! | State | JSON | Meaning |
//! |-------|------|---------|
//! | `Absent` | key missing | never set, stripped before transmission |
//! | `Null` | `null` | explicitly cleared by the user |
//! | `Value(s)` | `"s"` | a value |
//!
//! ## Timestamps
//!
//! Stored timestamps are parsed leniently: RFC 3339 strings and epoch
//! milliseconds are accepted, anything else (or a missing value) becomes
//! "now" at read time. A malformed timestamp never reaches a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Prefix reserved for ids of records not yet confirmed by the remote store.
pub const PENDING_ID_PREFIX: &str = "offline_";

pub fn is_pending_id(id: &str) -> bool {
    id.starts_with(PENDING_ID_PREFIX)
}

pub fn new_pending_id() -> String {
    format!("{}{}", PENDING_ID_PREFIX, Uuid::new_v4())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldValue {
    #[default]
    Absent,
    Null,
    Value(String),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Value(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(value)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(v) => serializer.serialize_str(v),
            FieldValue::Null | FieldValue::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.into())
    }
}

static ABSENT: FieldValue = FieldValue::Absent;

/// Named contact attributes plus a metadata map for the long tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub name: FieldValue,
    /// Job title as printed on the card.
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub title: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub company: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub email: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub phone: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub mobile: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub fax: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub website: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub address: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub linkedin: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub twitter: FieldValue,
    #[serde(default, skip_serializing_if = "FieldValue::is_absent")]
    pub notes: FieldValue,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, FieldValue>,
}

impl ContactFields {
    pub const NAMED: [&'static str; 12] = [
        "name", "title", "company", "email", "phone", "mobile", "fax", "website", "address",
        "linkedin", "twitter", "notes",
    ];

    fn named_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        let slot = match key {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "company" => &mut self.company,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "mobile" => &mut self.mobile,
            "fax" => &mut self.fax,
            "website" => &mut self.website,
            "address" => &mut self.address,
            "linkedin" => &mut self.linkedin,
            "twitter" => &mut self.twitter,
            "notes" => &mut self.notes,
            _ => return None,
        };
        Some(slot)
    }

    /// Set an attribute by name. Unknown names land in `metadata`.
    pub fn set(&mut self, key: &str, value: FieldValue) {
        match self.named_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.metadata.insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, key: &str) -> &FieldValue {
        let named = match key {
            "name" => &self.name,
            "title" => &self.title,
            "company" => &self.company,
            "email" => &self.email,
            "phone" => &self.phone,
            "mobile" => &self.mobile,
            "fax" => &self.fax,
            "website" => &self.website,
            "address" => &self.address,
            "linkedin" => &self.linkedin,
            "twitter" => &self.twitter,
            "notes" => &self.notes,
            _ => {
                return self.metadata.get(key).unwrap_or(&ABSENT);
            }
        };
        named
    }

    /// Phone-like values used for duplicate matching.
    pub fn phones(&self) -> impl Iterator<Item = &str> {
        [&self.phone, &self.mobile]
            .into_iter()
            .filter_map(FieldValue::as_str)
    }

    /// True when no attribute carries a value.
    pub fn is_empty(&self) -> bool {
        Self::NAMED
            .iter()
            .all(|key| self.get(key).as_str().is_none())
            && self.metadata.values().all(|v| v.as_str().is_none())
    }

    /// Copy with absent metadata entries removed. Explicit nulls survive.
    pub fn stripped(&self) -> Self {
        let mut out = self.clone();
        out.metadata.retain(|_, v| !v.is_absent());
        out
    }
}

fn parse_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        JsonValue::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp).unwrap_or_else(Utc::now))
}

fn lenient_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

/// Payload of a save: a contact without its final id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(flatten)]
    pub fields: ContactFields,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_optional_timestamp"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl NewContact {
    pub fn new(fields: ContactFields) -> Self {
        Self {
            fields,
            timestamp: None,
            preview: None,
        }
    }

    /// Pin the creation time so a deferred upload keeps it.
    pub fn stamped(mut self) -> Self {
        self.timestamp.get_or_insert_with(Utc::now);
        self
    }

    /// The form sent to a remote store: previews dropped, absent values stripped.
    pub fn for_remote(&self) -> Self {
        Self {
            fields: self.fields.stripped(),
            timestamp: self.timestamp,
            preview: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(flatten)]
    pub fields: ContactFields,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Display-only data; not part of identity and never transmitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Set when the queued creation behind this record was given up on; the
    /// record then exists on this device only.
    #[serde(default, skip_serializing_if = "is_false")]
    pub local_only: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl ContactRecord {
    pub fn from_new(id: impl Into<String>, owner_id: impl Into<String>, new: &NewContact) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            fields: new.fields.clone(),
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            preview: new.preview.clone(),
            local_only: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        is_pending_id(&self.id)
    }

    pub fn for_remote(&self) -> Self {
        Self {
            id: self.id.clone(),
            owner_id: self.owner_id.clone(),
            fields: self.fields.stripped(),
            timestamp: self.timestamp,
            preview: None,
            local_only: false,
        }
    }

    /// Payload equivalent used when a local-pending record is edited.
    pub fn to_new_contact(&self) -> NewContact {
        NewContact {
            fields: self.fields.clone(),
            timestamp: Some(self.timestamp),
            preview: self.preview.clone(),
        }
    }
}

/// Newest first; ties broken by id so listings are stable.
pub fn sort_newest_first(records: &mut [ContactRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// A queued creation the remote store has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    /// Local-pending id; also the id of the cached placeholder record.
    pub id: String,
    pub owner_id: String,
    pub payload: NewContact,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempt_count: u32,
}

impl PendingWrite {
    pub fn new(owner_id: impl Into<String>, payload: NewContact) -> Self {
        Self {
            id: new_pending_id(),
            owner_id: owner_id.into(),
            payload,
            queued_at: Utc::now(),
            attempt_count: 0,
        }
    }

    /// The record shown to the user while this write is queued.
    pub fn placeholder(&self) -> ContactRecord {
        ContactRecord::from_new(self.id.clone(), self.owner_id.clone(), &self.payload)
    }
}
