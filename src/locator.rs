//! Endpoint locators
//!
//! A [`Locator`] selects the environment that serves a register. The same
//! locator is carried by every record fetched through it, so that foreign
//! keys resolve against the environment the record came from.
//!
//! | Locator | URL for register `country`, path `records` |
//! |---|---|
//! | `Production` | `https://country.register.gov.uk/records` |
//! | `Phase("beta")` | `http://country.beta.openregister.org/records` |
//! | `BaseUrl("http://register.example.org/")` | `http://country.example.org/records` |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RegisterError, Result};
use crate::tabular::PageFormat;

/// Placeholder substituted with the register code in a base-URL template
pub const REGISTER_PLACEHOLDER: &str = "register";

/// Path of the record listing resource
pub const RECORDS_PATH: &str = "records";

/// Path of a single record resource
pub fn record_path(key: &str) -> String {
    format!("record/{}", key)
}

/// Environment selector for register hosts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// Production hosts under `register.gov.uk`
    #[default]
    Production,
    /// A phase tag such as `alpha`, `beta` or `discovery`
    Phase(String),
    /// An explicit base-URL template containing the literal `register`
    BaseUrl(String),
}

impl Locator {
    /// Locator for a phase tag
    pub fn phase(phase: impl Into<String>) -> Self {
        Locator::Phase(phase.into())
    }

    /// Locator for a base-URL template
    ///
    /// The template must contain `register`, which is replaced by the
    /// register code when building URLs.
    pub fn base_url(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(REGISTER_PLACEHOLDER) {
            return Err(RegisterError::InvalidLocator(format!(
                "base URL '{}' does not contain '{}'",
                template, REGISTER_PLACEHOLDER
            )));
        }
        Ok(Locator::BaseUrl(template))
    }

    /// Build the URL of `path` within `register`
    pub fn url_for(&self, path: &str, register: &str) -> String {
        match self {
            Locator::Production => format!("https://{}.register.gov.uk/{}", register, path),
            Locator::Phase(phase) => {
                format!("http://{}.{}.openregister.org/{}", register, phase, path)
            }
            Locator::BaseUrl(template) => {
                let host = template.replacen(REGISTER_PLACEHOLDER, register, 1);
                let host = host.strip_suffix('/').unwrap_or(&host);
                format!("{}/{}", host, path)
            }
        }
    }

    /// URL of a page resource: `path` within `register`, with the format suffix
    pub fn resource_url(&self, path: &str, register: &str, format: PageFormat) -> String {
        format!("{}.{}", self.url_for(path, register), format.extension())
    }

    /// Canonical URI of a register: its host with no trailing path
    pub fn register_uri(&self, register: &str) -> String {
        let url = self.url_for("", register);
        url.trim_end_matches('/').to_string()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Production => write!(f, "production"),
            Locator::Phase(phase) => write!(f, "phase:{}", phase),
            Locator::BaseUrl(template) => write!(f, "{}", template),
        }
    }
}
