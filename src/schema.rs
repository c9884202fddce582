//! Schema types
//!
//! [`Field`] describes one attribute of a register's schema and is decoded
//! from rows of the reserved `field` register. [`Register`] is a typed view
//! over a record of the reserved `register` register.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::DEFAULT_PAGE_SIZE;
use crate::locator::Locator;
use crate::record::Record;
use crate::tabular::Row;

/// Register holding field definitions
pub const FIELD_REGISTER: &str = "field";

/// Register holding register descriptions
pub const REGISTER_REGISTER: &str = "register";

/// Datatype of self-describing `register:key` references
pub const CURIE_DATATYPE: &str = "curie";

/// Cardinality of multi-valued attributes
pub const CARDINALITY_N: &str = "n";

/// A schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field code, e.g. `citizen-names`
    pub code: String,
    /// Scalar kind, or `curie`
    pub datatype: String,
    /// `1` or `n`
    pub cardinality: String,
    /// Register referenced by values of this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub text: String,
}

impl Field {
    /// Build a field from a row of the `field` register
    ///
    /// Returns `None` when the row has no field code.
    pub fn from_row(row: &Row) -> Option<Self> {
        let get = |name: &str| row.get(name).cloned().unwrap_or_default();
        let code = get("field");
        if code.is_empty() {
            return None;
        }
        let register = row
            .get("register")
            .filter(|register| !register.is_empty())
            .cloned();
        Some(Self {
            code,
            datatype: get("datatype"),
            cardinality: get("cardinality"),
            register,
            phase: get("phase"),
            text: get("text"),
        })
    }

    pub fn is_curie(&self) -> bool {
        self.datatype == CURIE_DATATYPE
    }

    pub fn is_multi_valued(&self) -> bool {
        self.cardinality == CARDINALITY_N
    }

    /// Register referenced by this field, if any
    pub fn foreign_register(&self) -> Option<&str> {
        self.register.as_deref()
    }
}

/// A register description
#[derive(Debug, Clone)]
pub struct Register {
    record: Arc<Record>,
    uri: String,
}

impl Register {
    /// Wrap a record of the `register` register
    ///
    /// The canonical URI is derived from the record's own locator.
    pub fn from_record(record: Arc<Record>) -> Option<Self> {
        let code = record.get(REGISTER_REGISTER)?;
        if code.is_empty() {
            return None;
        }
        let uri = record.locator().register_uri(code);
        Some(Self { record, uri })
    }

    /// Register code, e.g. `country`
    pub fn code(&self) -> &str {
        self.record.get(REGISTER_REGISTER).unwrap_or_default()
    }

    /// Names of the fields this register exposes, in order
    pub fn field_names(&self) -> &[String] {
        self.record.values("fields").unwrap_or_default()
    }

    pub fn registry(&self) -> Option<&str> {
        self.record.get("registry")
    }

    pub fn text(&self) -> Option<&str> {
        self.record.get("text")
    }

    pub fn phase(&self) -> Option<&str> {
        self.record.get("phase")
    }

    /// Canonical URI: the register's host with no path
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn locator(&self) -> &Locator {
        self.record.locator()
    }

    /// The underlying record
    pub fn record(&self) -> &Arc<Record> {
        &self.record
    }

    /// First page of this register's records
    pub fn records(&self) -> Result<Vec<Arc<Record>>> {
        self.record
            .client()
            .records_for(self.code(), self.locator(), false, DEFAULT_PAGE_SIZE)
    }

    /// Every record of this register, following pagination
    pub fn all_records(&self, page_size: usize) -> Result<Vec<Arc<Record>>> {
        self.record
            .client()
            .records_for(self.code(), self.locator(), true, page_size)
    }

    /// Definitions of this register's fields
    ///
    /// Fields with no definition are left out.
    pub fn fields(&self) -> Result<Vec<Arc<Field>>> {
        let client = self.record.client();
        let mut fields = Vec::with_capacity(self.field_names().len());
        for name in self.field_names() {
            if let Some(field) = client.field(name, self.locator())? {
                fields.push(field);
            }
        }
        Ok(fields)
    }
}
