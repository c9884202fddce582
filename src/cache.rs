//! Page caches
//!
//! A cache maps an exact request URL to the raw page fetched from it: the
//! body and the `next` link target. Decoded rows are never cached.
//!
//! Concurrent writers for the same URL may race; the last write wins. Pages
//! are expected to be identical for a given URL, so either write is valid.
//! Disk entries are replaced by rename, so a reader sees a whole page or
//! none.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::{RegisterError, Result};

/// A raw page as stored in a cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub body: String,
    pub next_link: Option<String>,
}

impl CachedPage {
    pub fn new(body: impl Into<String>, next_link: Option<String>) -> Self {
        Self {
            body: body.into(),
            next_link,
        }
    }
}

/// Pluggable URL → page store
pub trait PageCache: Send + Sync {
    /// Look up the page stored for `url`
    fn read(&self, url: &str) -> Result<Option<CachedPage>>;

    /// Store the page fetched from `url`
    fn write(&self, url: &str, page: &CachedPage) -> Result<()>;
}

/// In-process cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    pages: RwLock<HashMap<String, CachedPage>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pages
    pub fn len(&self) -> usize {
        self.pages.read().map(|pages| pages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PageCache for MemoryCache {
    fn read(&self, url: &str) -> Result<Option<CachedPage>> {
        let pages = self
            .pages
            .read()
            .map_err(|_| RegisterError::Cache("memory cache lock poisoned".to_string()))?;
        Ok(pages.get(url).cloned())
    }

    fn write(&self, url: &str, page: &CachedPage) -> Result<()> {
        let mut pages = self
            .pages
            .write()
            .map_err(|_| RegisterError::Cache("memory cache lock poisoned".to_string()))?;
        pages.insert(url.to_string(), page.clone());
        Ok(())
    }
}

/// File-backed cache: one JSON file per URL, named by the URL's SHA-256
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open a cache rooted at `dir`, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the file holding the page for `url`
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", url_digest(url)))
    }
}

impl PageCache for DiskCache {
    fn read(&self, url: &str) -> Result<Option<CachedPage>> {
        let content = match fs::read_to_string(self.path_for(url)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(page) => Ok(Some(page)),
            Err(e) => {
                warn!(url, error = %e, "undecodable cache entry, treating as a miss");
                Ok(None)
            }
        }
    }

    fn write(&self, url: &str, page: &CachedPage) -> Result<()> {
        let content = serde_json::to_string(page)?;
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(content.as_bytes())?;
        staged
            .persist(self.path_for(url))
            .map_err(|e| RegisterError::Cache(format!("replacing cache entry for {}: {}", url, e)))?;
        Ok(())
    }
}

/// Hex SHA-256 of a URL
fn url_digest(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
