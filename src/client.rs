//! Register client
//!
//! Top-level operations over registers. Each operation fetches pages,
//! decodes rows, and builds records tagged with the locator they came from
//! and the resolution table of their register.

use std::sync::Arc;

use tracing::debug;

use crate::augment::RecordAugmenter;
use crate::cache::PageCache;
use crate::catalog::MetadataCatalog;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::fetch::{PaginatedFetcher, DEFAULT_PAGE_SIZE};
use crate::locator::{record_path, Locator, RECORDS_PATH};
use crate::record::Record;
use crate::schema::{Field, Register, REGISTER_REGISTER};
use crate::tabular::PageFormat;
use crate::transport::{HttpTransport, Transport};

/// Builder for [`RegisterClient`]
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn PageCache>>,
    format: PageFormat,
}

impl ClientBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: None,
            format: PageFormat::default(),
        }
    }

    /// Serve and store raw pages through `cache`
    pub fn cache(mut self, cache: Arc<dyn PageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn format(mut self, format: PageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn build(self) -> RegisterClient {
        let fetcher = PaginatedFetcher::new(self.transport, self.cache);
        let catalog = MetadataCatalog::new(fetcher.clone(), self.format);
        RegisterClient {
            inner: Arc::new(Inner {
                fetcher,
                format: self.format,
                catalog,
                augmenter: RecordAugmenter::new(),
            }),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new(Arc::new(HttpTransport::default()))
    }
}

struct Inner {
    fetcher: PaginatedFetcher,
    format: PageFormat,
    catalog: MetadataCatalog,
    augmenter: RecordAugmenter,
}

/// Client for a register service
///
/// Cheap to clone; clones share the field memo and resolution tables.
#[derive(Clone)]
pub struct RegisterClient {
    inner: Arc<Inner>,
}

impl RegisterClient {
    /// Client over `transport` with no cache, reading TSV pages
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        ClientBuilder::new(transport).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
        ClientBuilder::new(transport)
    }

    /// Client configured from `config`, over HTTP
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.fetch.timeout_secs, &config.fetch.user_agent)?;
        let mut builder = ClientBuilder::new(Arc::new(transport)).format(config.fetch.format);
        if let Some(cache) = config.build_cache()? {
            builder = builder.cache(cache);
        }
        Ok(builder.build())
    }

    pub fn format(&self) -> PageFormat {
        self.inner.format
    }

    /// Every register, each tagged with its canonical URI
    pub fn registers(&self, locator: &Locator) -> Result<Vec<Register>> {
        let records = self.records_for(REGISTER_REGISTER, locator, true, DEFAULT_PAGE_SIZE)?;
        Ok(records.into_iter().filter_map(Register::from_record).collect())
    }

    /// The register with code `code`
    pub fn register(&self, code: &str, locator: &Locator) -> Result<Option<Register>> {
        Ok(self
            .registers(locator)?
            .into_iter()
            .find(|register| register.code() == code))
    }

    /// Records of `register`: the first page, or every page when `all` is set
    pub fn records_for(
        &self,
        register: &str,
        locator: &Locator,
        all: bool,
        page_size: usize,
    ) -> Result<Vec<Arc<Record>>> {
        self.retrieve(RECORDS_PATH, register, locator, all, page_size)
    }

    /// The record of `register` with primary key `key`
    pub fn record(&self, register: &str, key: &str, locator: &Locator) -> Result<Option<Arc<Record>>> {
        let records = self.retrieve(&record_path(key), register, locator, false, DEFAULT_PAGE_SIZE)?;
        Ok(records.into_iter().next())
    }

    /// Definition of field `name`
    pub fn field(&self, name: &str, locator: &Locator) -> Result<Option<Arc<Field>>> {
        self.inner.catalog.field(name, locator)
    }

    fn retrieve(
        &self,
        path: &str,
        register: &str,
        locator: &Locator,
        all: bool,
        page_size: usize,
    ) -> Result<Vec<Arc<Record>>> {
        let inner = &self.inner;
        let url = locator.resource_url(path, register, inner.format);
        let mut records = Vec::new();

        for page in inner.fetcher.pages(&url, page_size, all) {
            let page = page?;
            for row in inner.format.parse(&page.body)? {
                let table = inner.augmenter.table_for(
                    register,
                    locator,
                    row.keys().map(String::as_str),
                    |name| inner.catalog.field(name, locator),
                )?;
                records.push(Arc::new(Record::new(
                    register,
                    locator.clone(),
                    row,
                    table,
                    self.clone(),
                )));
            }
        }

        debug!(register, %locator, count = records.len(), "retrieved records");
        Ok(records)
    }
}

impl std::fmt::Debug for RegisterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterClient")
            .field("format", &self.inner.format)
            .field("cached", &self.inner.fetcher.has_cache())
            .finish()
    }
}
