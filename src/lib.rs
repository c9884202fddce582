//! OpenRegister Client
//!
//! A read-only client for register-style data services: a catalog of named
//! registers, each holding records whose schema is itself described by
//! records of a reserved `field` register.
//!
//! ## Features
//!
//! - **Schema-driven records**: attributes are read as text, lists, foreign
//!   records or curie references according to their field definitions
//! - **Lazy resolution**: foreign records are fetched on first access and
//!   memoized per record
//! - **Environment-aware**: records resolve references against the
//!   environment they were fetched from
//! - **Paginated fetching**: follows `Link: rel="next"` headers, with an
//!   optional page cache
//!
//! ## Architecture
//!
//! ```text
//! RegisterClient ── PaginatedFetcher ── Transport / PageCache
//!       │                  │
//!       │            PageFormat (TSV, JSON) ── rows
//!       │
//!       └── RecordAugmenter ── ResolutionTable per (register, locator)
//!                  │
//!            MetadataCatalog ── `field` register
//! ```

pub mod augment;
pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod locator;
pub mod record;
pub mod schema;
pub mod tabular;
pub mod transport;

pub use augment::{RecordAugmenter, Resolution, ResolutionTable};
pub use cache::{CachedPage, DiskCache, MemoryCache, PageCache};
pub use catalog::MetadataCatalog;
pub use client::{ClientBuilder, RegisterClient};
pub use config::ClientConfig;
pub use error::{RegisterError, Result};
pub use fetch::{PaginatedFetcher, RawPage, DEFAULT_PAGE_SIZE};
pub use locator::Locator;
pub use record::{Derived, Linked, Record};
pub use schema::{Field, Register};
pub use tabular::{PageFormat, Row};
pub use transport::{HttpResponse, HttpTransport, Transport};
