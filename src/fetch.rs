//! Paginated fetching
//!
//! Fetches every page of a resource by following `rel="next"` links. Pages
//! are requested strictly one after another: the next URL is only known once
//! the current page's headers have been read.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::cache::{CachedPage, PageCache};
use crate::error::{RegisterError, Result};
use crate::transport::Transport;

/// Page size the service uses when none is requested
pub const DEFAULT_PAGE_SIZE: usize = 100;

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^<([^>]*)>\s*;\s*rel="([^"]+)"$"#).expect("valid link pattern"));

/// One fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// Exact URL the page was requested from
    pub url: String,
    pub body: String,
    /// Target of the `next` link, verbatim
    pub next_link: Option<String>,
}

/// Fetches paged resources through a transport and an optional cache
#[derive(Clone)]
pub struct PaginatedFetcher {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn PageCache>>,
}

impl PaginatedFetcher {
    pub fn new(transport: Arc<dyn Transport>, cache: Option<Arc<dyn PageCache>>) -> Self {
        Self { transport, cache }
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Iterate over the pages of `url`
    ///
    /// With `want_all` unset only the first page is fetched. A 404 on any
    /// page ends the sequence.
    pub fn pages(&self, url: &str, page_size: usize, want_all: bool) -> Pages<'_> {
        Pages {
            fetcher: self,
            origin: url.to_string(),
            next: Some(page_url(url, page_size)),
            want_all,
        }
    }

    /// Fetch the pages of `url` into a vector
    pub fn fetch_all(&self, url: &str, page_size: usize, want_all: bool) -> Result<Vec<RawPage>> {
        self.pages(url, page_size, want_all).collect()
    }

    /// Fetch a single page, consulting the cache first
    ///
    /// Returns `None` when the server answers 404.
    fn fetch_page(&self, url: &str) -> Result<Option<RawPage>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.read(url)? {
                if !cached.body.is_empty() {
                    debug!(url, "cache hit");
                    return Ok(Some(RawPage {
                        url: url.to_string(),
                        body: cached.body,
                        next_link: cached.next_link,
                    }));
                }
            }
        }

        let response = self.transport.get(url)?;
        if response.is_not_found() {
            warn!(url, "resource not found, ending pagination");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(RegisterError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        let next_link = response.link.as_deref().and_then(next_link);
        if let Some(cache) = &self.cache {
            if !response.body.is_empty() {
                cache.write(url, &CachedPage::new(response.body.clone(), next_link.clone()))?;
            }
        }

        Ok(Some(RawPage {
            url: url.to_string(),
            body: response.body,
            next_link,
        }))
    }
}

/// Sequential page iterator returned by [`PaginatedFetcher::pages`]
pub struct Pages<'a> {
    fetcher: &'a PaginatedFetcher,
    origin: String,
    next: Option<String>,
    want_all: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<RawPage>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = self.next.take()?;
        match self.fetcher.fetch_page(&url) {
            Ok(Some(page)) => {
                if self.want_all {
                    self.next = page
                        .next_link
                        .as_deref()
                        .map(|target| follow_link(&self.origin, target));
                }
                Some(Ok(page))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Initial request URL; the page-size query is only added for a non-default size
pub fn page_url(url: &str, page_size: usize) -> String {
    if page_size == DEFAULT_PAGE_SIZE {
        url.to_string()
    } else {
        format!("{}?page-index=1&page-size={}", url, page_size)
    }
}

/// URL of a linked page: the original URL without its query, plus the target
pub fn follow_link(origin: &str, target: &str) -> String {
    let base = origin.split('?').next().unwrap_or(origin);
    format!("{}{}", base, target)
}

/// Parse a `Link` header into relation → target
///
/// Tokens that do not look like `<target>; rel="name"` are skipped.
pub fn links(header: &str) -> HashMap<String, String> {
    header
        .split(',')
        .filter_map(|token| {
            let token = token.trim();
            match LINK_PATTERN.captures(token) {
                Some(caps) => Some((caps[2].to_string(), caps[1].to_string())),
                None => {
                    warn!(token, "ignoring malformed link");
                    None
                }
            }
        })
        .collect()
}

/// Target of the `next` relation in a `Link` header
pub fn next_link(header: &str) -> Option<String> {
    links(header).remove("next")
}
