//! Records
//!
//! A [`Record`] owns the raw attribute values of one decoded row together
//! with the locator it was fetched through. Derived values (split lists,
//! resolved foreign records) are computed on first access and memoized for
//! the record's lifetime.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

use crate::augment::{Resolution, ResolutionTable};
use crate::client::RegisterClient;
use crate::error::Result;
use crate::locator::{record_path, Locator};
use crate::tabular::Row;

/// Entry provenance attributes, never schema-governed
pub const PROVENANCE_ATTRIBUTES: &[&str] = &[
    "entry-number",
    "entry_number",
    "index-entry-number",
    "entry-timestamp",
    "entry_timestamp",
    "item-hash",
    "item_hash",
    "hash",
    "key",
];

/// Prefix of derived and internal attribute names
pub const DERIVED_MARKER: char = '_';

pub fn is_provenance(attribute: &str) -> bool {
    PROVENANCE_ATTRIBUTES.contains(&attribute)
}

pub fn is_derived(attribute: &str) -> bool {
    attribute.starts_with(DERIVED_MARKER)
}

/// Field code for an attribute name (`official_name` → `official-name`)
pub fn field_name(attribute: &str) -> String {
    attribute.replace('_', "-")
}

/// Split a `register:key` curie
///
/// A curie value names exactly one record, whatever the field's
/// cardinality. A value holding a `;` list is rejected rather than read as
/// one key.
pub fn parse_curie(raw: &str) -> Option<(&str, &str)> {
    let (register, key) = raw.split_once(':')?;
    if register.is_empty() || key.is_empty() || raw.contains(';') {
        return None;
    }
    Some((register, key))
}

/// Split a `;`-delimited value; an empty value has no tokens
fn split_tokens(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(';').map(String::from).collect()
    }
}

struct Attribute {
    raw: String,
    tokens: OnceCell<Vec<String>>,
    linked: OnceCell<Linked>,
}

impl Attribute {
    fn new(raw: String) -> Self {
        Self {
            raw,
            tokens: OnceCell::new(),
            linked: OnceCell::new(),
        }
    }

    fn tokens(&self) -> &[String] {
        self.tokens.get_or_init(|| split_tokens(&self.raw))
    }
}

/// Foreign records an attribute refers to
#[derive(Debug, Clone)]
pub enum Linked {
    /// Target of a foreign key or curie; `None` when it does not exist
    One(Option<Arc<Record>>),
    /// Targets of a multi-valued foreign key that exist
    Many(Vec<Arc<Record>>),
}

impl Linked {
    /// Linked records as a slice
    pub fn records(&self) -> &[Arc<Record>] {
        match self {
            Linked::One(Some(record)) => std::slice::from_ref(record),
            Linked::One(None) => &[],
            Linked::Many(records) => records,
        }
    }
}

/// Value of an attribute as seen through its resolution
#[derive(Debug, Clone, Copy)]
pub enum Derived<'a> {
    Text(&'a str),
    List(&'a [String]),
    Record(Option<&'a Arc<Record>>),
    Records(&'a [Arc<Record>]),
}

/// One record of a register
pub struct Record {
    register: String,
    locator: Locator,
    uri: Option<String>,
    attributes: IndexMap<String, Attribute>,
    table: Arc<ResolutionTable>,
    client: RegisterClient,
}

impl Record {
    pub(crate) fn new(
        register: &str,
        locator: Locator,
        row: Row,
        table: Arc<ResolutionTable>,
        client: RegisterClient,
    ) -> Self {
        let uri = row
            .get(register)
            .filter(|key| !key.is_empty())
            .map(|key| locator.url_for(&record_path(key), register));
        let attributes = row
            .into_iter()
            .map(|(name, raw)| (name, Attribute::new(raw)))
            .collect();
        Self {
            register: register.to_string(),
            locator,
            uri,
            attributes,
            table,
            client,
        }
    }

    /// Code of the register this record belongs to
    pub fn register(&self) -> &str {
        &self.register
    }

    /// Locator the record was fetched through
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Canonical URI of the record, when it has a key
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Primary key: the attribute named after the register
    pub fn key(&self) -> Option<&str> {
        self.get(&self.register)
    }

    pub fn entry_number(&self) -> Option<u64> {
        self.get_any(&["entry-number", "entry_number"])?.parse().ok()
    }

    pub fn entry_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.get_any(&["entry-timestamp", "entry_timestamp"])?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|timestamp| timestamp.with_timezone(&Utc))
    }

    pub fn item_hash(&self) -> Option<&str> {
        self.get_any(&["item-hash", "item_hash", "hash"])
    }

    /// Attribute names in payload order
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Raw string value of an attribute
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|attribute| attribute.raw.as_str())
    }

    /// Tokens of a `;`-delimited attribute
    ///
    /// Split once on first read; later reads return the same slice.
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Attribute::tokens)
    }

    /// How `name` is resolved for this record's register
    pub fn resolution(&self, name: &str) -> &Resolution {
        self.table.get(name)
    }

    /// Plain value of an attribute: a list when multi-valued, else text
    ///
    /// Never fetches.
    pub fn value(&self, name: &str) -> Option<Derived<'_>> {
        let attribute = self.attributes.get(name)?;
        if self.resolution(name).is_multi_valued() {
            Some(Derived::List(attribute.tokens()))
        } else {
            Some(Derived::Text(&attribute.raw))
        }
    }

    /// Value of an attribute with references followed
    pub fn resolve(&self, name: &str) -> Result<Option<Derived<'_>>> {
        match self.linked(name)? {
            Some(Linked::One(record)) => Ok(Some(Derived::Record(record.as_ref()))),
            Some(Linked::Many(records)) => Ok(Some(Derived::Records(records))),
            None => Ok(self.value(name)),
        }
    }

    /// Foreign records referred to by `name`
    ///
    /// `None` when the attribute is absent or not a reference. Fetches run
    /// at most once per record; a missing target resolves to an empty value.
    pub fn linked(&self, name: &str) -> Result<Option<&Linked>> {
        let Some(attribute) = self.attributes.get(name) else {
            return Ok(None);
        };
        let linked = match self.table.get(name) {
            Resolution::ForeignKey(register) => attribute
                .linked
                .get_or_try_init(|| self.fetch_one(register, &attribute.raw))?,
            Resolution::MultiForeignKey(register) => attribute
                .linked
                .get_or_try_init(|| self.fetch_many(register, attribute.tokens()))?,
            Resolution::Curie => attribute.linked.get_or_try_init(|| match parse_curie(&attribute.raw) {
                Some((register, key)) => self.fetch_one(register, key),
                None => {
                    if !attribute.raw.is_empty() {
                        warn!(attribute = name, raw = %attribute.raw, "malformed curie");
                    }
                    Ok(Linked::One(None))
                }
            })?,
            Resolution::Scalar | Resolution::MultiValued => return Ok(None),
        };
        Ok(Some(linked))
    }

    /// Single foreign record referred to by `name`
    pub fn linked_record(&self, name: &str) -> Result<Option<Arc<Record>>> {
        Ok(match self.linked(name)? {
            Some(Linked::One(record)) => record.clone(),
            Some(Linked::Many(records)) => records.first().cloned(),
            None => None,
        })
    }

    /// All foreign records referred to by `name`
    pub fn linked_records(&self, name: &str) -> Result<Vec<Arc<Record>>> {
        Ok(self
            .linked(name)?
            .map(|linked| linked.records().to_vec())
            .unwrap_or_default())
    }

    pub(crate) fn client(&self) -> &RegisterClient {
        &self.client
    }

    fn get_any(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    fn fetch_one(&self, register: &str, key: &str) -> Result<Linked> {
        if key.is_empty() {
            return Ok(Linked::One(None));
        }
        let record = self.client.record(register, key, &self.locator)?;
        if record.is_none() {
            warn!(register, key, "linked record not found");
        }
        Ok(Linked::One(record))
    }

    fn fetch_many(&self, register: &str, keys: &[String]) -> Result<Linked> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|key| !key.is_empty()) {
            match self.client.record(register, key, &self.locator)? {
                Some(record) => records.push(record),
                None => warn!(register, key = %key, "linked record not found"),
            }
        }
        Ok(Linked::Many(records))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attributes: IndexMap<&str, &str> = self
            .attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute.raw.as_str()))
            .collect();
        f.debug_struct("Record")
            .field("register", &self.register)
            .field("locator", &self.locator)
            .field("attributes", &attributes)
            .finish()
    }
}

impl Serialize for Record {
    /// Serializes plain values; multi-valued attributes become arrays
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for name in self.attributes.keys() {
            match self.value(name) {
                Some(Derived::List(tokens)) => map.serialize_entry(name, tokens)?,
                Some(Derived::Text(text)) => map.serialize_entry(name, text)?,
                _ => {}
            }
        }
        map.end()
    }
}
