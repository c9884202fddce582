//! Field metadata lookup
//!
//! Fields are read from the reserved `field` register. Without a page cache
//! the catalog memoizes each `(name, locator)` it has found, so a page of a
//! hundred records costs one lookup per attribute. With a page cache the
//! memo is skipped and the cache is the shared store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::Result;
use crate::fetch::{PaginatedFetcher, DEFAULT_PAGE_SIZE};
use crate::locator::{record_path, Locator};
use crate::schema::{Field, FIELD_REGISTER};
use crate::tabular::PageFormat;

type FieldMemo = RwLock<HashMap<(String, Locator), Arc<Field>>>;

/// Resolves field names to field definitions
pub struct MetadataCatalog {
    fetcher: PaginatedFetcher,
    format: PageFormat,
    memo: Option<FieldMemo>,
}

impl MetadataCatalog {
    pub fn new(fetcher: PaginatedFetcher, format: PageFormat) -> Self {
        let memo = if fetcher.has_cache() {
            None
        } else {
            Some(RwLock::new(HashMap::new()))
        };
        Self {
            fetcher,
            format,
            memo,
        }
    }

    /// Whether found fields are memoized in process
    pub fn is_memoizing(&self) -> bool {
        self.memo.is_some()
    }

    /// Definition of field `name` under `locator`
    ///
    /// `Ok(None)` when the field register has no such record.
    pub fn field(&self, name: &str, locator: &Locator) -> Result<Option<Arc<Field>>> {
        let key = (name.to_string(), locator.clone());
        if let Some(memo) = &self.memo {
            let memo = memo.read().unwrap_or_else(|e| e.into_inner());
            if let Some(field) = memo.get(&key) {
                return Ok(Some(field.clone()));
            }
        }

        let Some(field) = self.fetch(name, locator)? else {
            debug!(field = name, %locator, "no field definition");
            return Ok(None);
        };

        if let Some(memo) = &self.memo {
            let mut memo = memo.write().unwrap_or_else(|e| e.into_inner());
            return Ok(Some(memo.entry(key).or_insert(field).clone()));
        }
        Ok(Some(field))
    }

    fn fetch(&self, name: &str, locator: &Locator) -> Result<Option<Arc<Field>>> {
        let url = locator.resource_url(&record_path(name), FIELD_REGISTER, self.format);
        for page in self.fetcher.pages(&url, DEFAULT_PAGE_SIZE, false) {
            let page = page?;
            let field = self
                .format
                .parse(&page.body)?
                .iter()
                .filter_map(Field::from_row)
                .find(|field| field.code == name);
            if let Some(field) = field {
                return Ok(Some(Arc::new(field)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, PageCache};
    use crate::transport::{HttpResponse, Transport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CITIZEN_NAMES: &str = "entry-number\tentry-timestamp\titem-hash\tfield\tdatatype\tphase\tregister\tcardinality\ttext\n\
        12\t2016-08-04T14:45:41Z\tsha-256:de1a\tcitizen-names\tstring\talpha\t\tn\tThe name of a citizen\n";

    #[derive(Default)]
    struct FieldServer {
        requests: AtomicUsize,
    }

    impl Transport for FieldServer {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/record/citizen-names.tsv") {
                Ok(HttpResponse::ok(CITIZEN_NAMES))
            } else {
                Ok(HttpResponse::not_found())
            }
        }
    }

    #[test]
    fn test_field_lookup_is_memoized() {
        let server = Arc::new(FieldServer::default());
        let catalog = MetadataCatalog::new(PaginatedFetcher::new(server.clone(), None), PageFormat::Tsv);
        assert!(catalog.is_memoizing());

        let first = catalog.field("citizen-names", &Locator::Production).unwrap().unwrap();
        let second = catalog.field("citizen-names", &Locator::Production).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_multi_valued());
        assert_eq!(server.requests.load(Ordering::SeqCst), 1);

        // A different locator is a different key
        catalog.field("citizen-names", &Locator::phase("beta")).unwrap();
        assert_eq!(server.requests.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_field() {
        let server = Arc::new(FieldServer::default());
        let catalog = MetadataCatalog::new(PaginatedFetcher::new(server, None), PageFormat::Tsv);
        assert!(catalog.field("no-such-field", &Locator::Production).unwrap().is_none());
    }

    #[test]
    fn test_cache_replaces_memo() {
        let server = Arc::new(FieldServer::default());
        let cache = Arc::new(MemoryCache::new());
        let catalog = MetadataCatalog::new(
            PaginatedFetcher::new(server.clone(), Some(cache.clone() as Arc<dyn PageCache>)),
            PageFormat::Tsv,
        );
        assert!(!catalog.is_memoizing());

        catalog.field("citizen-names", &Locator::Production).unwrap();
        catalog.field("citizen-names", &Locator::Production).unwrap();
        assert_eq!(server.requests.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
