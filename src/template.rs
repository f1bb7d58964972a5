//! Page-numbered path templates.
//!
//! Every local scratch path and every remote key is written as a template
//! holding exactly one `%d` placeholder, which is replaced by the decimal
//! page number at resolution time. Variant templates are derived by
//! inserting a suffix right after the placeholder, so `page%d.jpg` becomes
//! `page%d-small.jpg` and resolves for page 3 to `page3-small.jpg`.

use crate::error::Pdf2JpegError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The page-number placeholder.
pub const PLACEHOLDER: &str = "%d";

/// A path or key containing a single [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    raw: String,
}

impl PathTemplate {
    /// Parse a template supplied through `field`, which is only used for
    /// error messages.
    pub fn parse(field: &str, raw: impl Into<String>) -> Result<Self, Pdf2JpegError> {
        let raw = raw.into();
        match raw.matches(PLACEHOLDER).count() {
            0 => Err(Pdf2JpegError::MissingPlaceholder {
                field: field.to_string(),
                template: raw,
            }),
            1 => Ok(Self { raw }),
            count => Err(Pdf2JpegError::AmbiguousPlaceholder {
                field: field.to_string(),
                template: raw,
                count,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Derive a variant template by inserting `suffix` immediately after the
    /// placeholder. An empty suffix returns an identical template.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let raw = self
            .raw
            .replacen(PLACEHOLDER, &format!("{PLACEHOLDER}{suffix}"), 1);
        Self { raw }
    }

    /// Substitute the page number.
    pub fn resolve(&self, page: u32) -> String {
        self.raw.replacen(PLACEHOLDER, &page.to_string(), 1)
    }

    /// Substitute the page number and treat the result as a local path.
    pub fn resolve_path(&self, page: u32) -> PathBuf {
        PathBuf::from(self.resolve(page))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = Pdf2JpegError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        PathTemplate::parse("template", raw)
    }
}

impl From<PathTemplate> for String {
    fn from(t: PathTemplate) -> Self {
        t.raw
    }
}
