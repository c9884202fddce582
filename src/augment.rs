//! Record augmentation
//!
//! Decides, once per register schema and locator, how every attribute of
//! that register's records is to be read. The result is a
//! [`ResolutionTable`] shared by all records of the register; records
//! consult it through their generic accessors.
//!
//! Resolution precedence is fixed:
//!
//! 1. `datatype = curie` → [`Resolution::Curie`]
//! 2. a foreign register → [`Resolution::ForeignKey`] or
//!    [`Resolution::MultiForeignKey`], by cardinality
//! 3. `cardinality = n` → [`Resolution::MultiValued`]
//! 4. otherwise → [`Resolution::Scalar`]
//!
//! Building a table looks up field metadata, which fetches records, which
//! may ask for another table. A guard keyed by `(schema, attribute)` makes a
//! nested request for an attribute already being resolved a no-op. Guards
//! belong to the calling thread, so only the call chain that set a mark
//! ever sees it. Independent callers wanting the same table wait for one
//! another instead, and find the finished table in the cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, ThreadId};

use tracing::debug;

use crate::error::Result;
use crate::locator::Locator;
use crate::record::{field_name, is_derived, is_provenance};
use crate::schema::{Field, FIELD_REGISTER, REGISTER_REGISTER};

/// How one attribute is read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Plain string
    Scalar,
    /// `;`-delimited list of strings
    MultiValued,
    /// Key of one record in the named register
    ForeignKey(String),
    /// `;`-delimited keys of records in the named register
    MultiForeignKey(String),
    /// `register:key` reference
    Curie,
}

impl Resolution {
    /// Resolution for an attribute governed by `field`
    pub fn for_field(field: &Field) -> Self {
        if field.is_curie() {
            Resolution::Curie
        } else if let Some(register) = field.foreign_register() {
            if field.is_multi_valued() {
                Resolution::MultiForeignKey(register.to_string())
            } else {
                Resolution::ForeignKey(register.to_string())
            }
        } else if field.is_multi_valued() {
            Resolution::MultiValued
        } else {
            Resolution::Scalar
        }
    }

    /// Whether raw values hold several `;`-delimited tokens
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Resolution::MultiValued | Resolution::MultiForeignKey(_))
    }
}

/// Attribute → resolution for one register schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionTable {
    schema: String,
    entries: HashMap<String, Resolution>,
}

impl ResolutionTable {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            entries: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Resolution of `attribute`; unknown attributes are scalar
    pub fn get(&self, attribute: &str) -> &Resolution {
        self.entries.get(attribute).unwrap_or(&Resolution::Scalar)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.contains_key(attribute)
    }

    pub fn insert(&mut self, attribute: impl Into<String>, resolution: Resolution) {
        self.entries.insert(attribute.into(), resolution);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type GuardKey = (ThreadId, String, String);

/// `(schema, attribute)` pairs currently being resolved, per thread
#[derive(Debug, Default)]
pub struct GuardSet {
    active: Mutex<HashSet<GuardKey>>,
}

impl GuardSet {
    /// Mark `(schema, attribute)` as in progress on the current thread
    ///
    /// Returns `None` if this thread already has it marked. The mark is
    /// cleared when the returned guard drops, on every exit path.
    pub fn enter(&self, schema: &str, attribute: &str) -> Option<AugmentGuard<'_>> {
        let key = (thread::current().id(), schema.to_string(), attribute.to_string());
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(AugmentGuard { set: self, key })
    }

    /// Whether the current thread has `(schema, attribute)` in progress
    pub fn is_active(&self, schema: &str, attribute: &str) -> bool {
        let key = (thread::current().id(), schema.to_string(), attribute.to_string());
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.contains(&key)
    }

    /// Whether the current thread is resolving any attribute of `schema`
    pub fn is_resolving(&self, schema: &str) -> bool {
        let current = thread::current().id();
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active
            .iter()
            .any(|(thread, active_schema, _)| *thread == current && active_schema == schema)
    }
}

/// Scoped in-progress mark, see [`GuardSet::enter`]
#[derive(Debug)]
pub struct AugmentGuard<'a> {
    set: &'a GuardSet,
    key: GuardKey,
}

impl Drop for AugmentGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.set.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}

/// Computes and caches resolution tables
#[derive(Debug, Default)]
pub struct RecordAugmenter {
    tables: RwLock<HashMap<TableKey, Arc<ResolutionTable>>>,
    building: Mutex<HashMap<TableKey, Arc<Mutex<()>>>>,
    guards: GuardSet,
}

type TableKey = (String, Locator);

impl RecordAugmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guards(&self) -> &GuardSet {
        &self.guards
    }

    /// Table covering `attributes` of `register` under `locator`
    ///
    /// `lookup` is called with the field name of each attribute not yet in
    /// the cached table. Builds of one key run one at a time. A table built
    /// while some attribute was already in progress higher up the same call
    /// chain is returned but not cached.
    pub fn table_for<'n, I, F>(
        &self,
        register: &str,
        locator: &Locator,
        attributes: I,
        lookup: F,
    ) -> Result<Arc<ResolutionTable>>
    where
        I: IntoIterator<Item = &'n str>,
        F: Fn(&str) -> Result<Option<Arc<Field>>>,
    {
        let key = (register.to_string(), locator.clone());
        let governed: Vec<&str> = attributes
            .into_iter()
            .filter(|attribute| is_governed(register, attribute))
            .collect();

        if let Some(table) = self.covering(&key, &governed) {
            return Ok(table);
        }

        // A nested build for a schema this thread is already resolving
        // would wait on its own lock
        let build_lock = if self.guards.is_resolving(register) {
            None
        } else {
            Some(self.build_lock(&key))
        };
        let _building = build_lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(|e| e.into_inner()));

        // Another caller may have finished the table while this one waited
        if let Some(table) = self.covering(&key, &governed) {
            return Ok(table);
        }

        let mut table = self
            .cached(&key)
            .map(|table| (*table).clone())
            .unwrap_or_else(|| ResolutionTable::new(register));
        let mut complete = true;

        for attribute in governed {
            if table.contains(attribute) {
                continue;
            }
            let Some(_guard) = self.guards.enter(register, attribute) else {
                debug!(register, attribute, "already resolving, skipped");
                complete = false;
                continue;
            };
            let resolution = match lookup(&field_name(attribute))? {
                Some(field) => Resolution::for_field(&field),
                None => Resolution::Scalar,
            };
            debug!(register, attribute, ?resolution, "resolved attribute");
            table.insert(attribute, resolution);
        }

        let table = Arc::new(table);
        if complete {
            self.tables
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key, table.clone());
        }
        Ok(table)
    }

    fn cached(&self, key: &TableKey) -> Option<Arc<ResolutionTable>> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Cached table for `key` if it already covers every attribute
    fn covering(&self, key: &TableKey, attributes: &[&str]) -> Option<Arc<ResolutionTable>> {
        self.cached(key)
            .filter(|table| attributes.iter().all(|attribute| table.contains(attribute)))
    }

    fn build_lock(&self, key: &TableKey) -> Arc<Mutex<()>> {
        self.building
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.clone())
            .or_default()
            .clone()
    }
}

/// Whether `attribute` of a `register` record is schema-governed
///
/// Field records are never augmented, and register records only through
/// their `fields` list.
pub fn is_governed(register: &str, attribute: &str) -> bool {
    if register == FIELD_REGISTER || is_provenance(attribute) || is_derived(attribute) {
        return false;
    }
    register != REGISTER_REGISTER || attribute == "fields"
}
