//! Scripted register service for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use openregister::{HttpResponse, Locator, Result, Transport};

/// Transport serving canned pages by exact URL; anything else is a 404
#[derive(Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<String>>,
    field_delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), HttpResponse::ok(body));
        self
    }

    pub fn page_with_next(
        mut self,
        url: impl Into<String>,
        body: impl Into<String>,
        next: &str,
    ) -> Self {
        let response = HttpResponse::ok(body).with_link(format!("<{}>; rel=\"next\"", next));
        self.responses.insert(url.into(), response);
        self
    }

    /// Answer requests to the `field` register only after `delay`
    pub fn slow_fields(mut self, delay: Duration) -> Self {
        self.field_delay = Some(delay);
        self
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests for exactly `url`
    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.field_delay {
            if url.contains("://field.") {
                thread::sleep(delay);
            }
        }
        Ok(self
            .responses
            .get(url)
            .cloned()
            .unwrap_or_else(HttpResponse::not_found))
    }
}

pub fn beta() -> Locator {
    Locator::phase("beta")
}

/// URL of `path` in `register` on the beta service
pub fn beta_url(register: &str, path: &str) -> String {
    format!("http://{}.beta.openregister.org/{}", register, path)
}

/// Body of a `field` register record page
pub fn field_tsv(code: &str, datatype: &str, register: &str, cardinality: &str) -> String {
    format!(
        "entry-number\tentry-timestamp\titem-hash\tfield\tdatatype\tphase\tregister\tcardinality\ttext\n\
         1\t2017-01-10T17:16:07Z\tsha-256:0000\t{}\t{}\tbeta\t{}\t{}\tThe {} field\n",
        code, datatype, register, cardinality, code
    )
}

/// (code, datatype, register, cardinality) of every field on the beta service
pub const FIELDS: &[(&str, &str, &str, &str)] = &[
    ("fields", "string", "field", "n"),
    ("country", "string", "country", "1"),
    ("name", "string", "", "1"),
    ("official-name", "string", "", "1"),
    ("citizen-names", "string", "", "n"),
    ("start-date", "datetime", "", "1"),
    ("end-date", "datetime", "", "1"),
    ("school", "string", "school", "1"),
    ("address", "string", "address", "1"),
    ("organisation", "curie", "", "1"),
    ("denominations", "string", "denomination", "n"),
    ("street", "string", "", "1"),
    ("company", "string", "company", "1"),
    ("denomination", "string", "denomination", "1"),
];

/// A beta service with registers, paginated countries, schools and the
/// records schools refer to
pub fn beta_service() -> ScriptedTransport {
    let mut transport = ScriptedTransport::new()
        .page(
            beta_url("register", "records.tsv"),
            include_str!("../fixtures/register-records.tsv"),
        )
        .page_with_next(
            beta_url("country", "records.tsv"),
            include_str!("../fixtures/country-records-1.tsv"),
            "?page-index=2&page-size=100",
        )
        .page(
            beta_url("country", "records.tsv?page-index=2&page-size=100"),
            include_str!("../fixtures/country-records-2.tsv"),
        )
        .page(
            beta_url("school", "records.tsv"),
            include_str!("../fixtures/school-records.tsv"),
        )
        .page(
            beta_url("address", "record/10010.tsv"),
            "entry-number\titem-hash\taddress\tstreet\n7\tsha-256:ad01\t10010\tSt James's Passage\n",
        )
        .page(
            beta_url("company", "record/07228130.tsv"),
            "entry-number\titem-hash\tcompany\tname\n3\tsha-256:c001\t07228130\tSir John Cass's Foundation\n",
        )
        .page(
            beta_url("denomination", "record/CE.tsv"),
            "entry-number\titem-hash\tdenomination\tname\n1\tsha-256:de01\tCE\tChurch of England\n",
        )
        .page(
            beta_url("denomination", "record/RC.tsv"),
            "entry-number\titem-hash\tdenomination\tname\n2\tsha-256:de02\tRC\tRoman Catholic\n",
        );

    for (code, datatype, register, cardinality) in FIELDS {
        transport = transport.page(
            beta_url("field", &format!("record/{}.tsv", code)),
            field_tsv(code, datatype, register, cardinality),
        );
    }
    transport
}
