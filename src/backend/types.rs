use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Cow<'static, str>);

impl BaseUrl {
    #[must_use]
    pub fn new(url: impl Into<Cow<'static, str>>) -> Self {
        let url = url.into();
        let url = if url.ends_with('/') {
            Cow::Owned(url.trim_end_matches('/').to_string())
        } else {
            url
        };
        Self(url)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self(Cow::Borrowed(DEFAULT_BASE_URL))
    }
}

impl From<String> for BaseUrl {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&'static str> for BaseUrl {
    fn from(url: &'static str) -> Self {
        Self::new(url)
    }
}

/// Payload of `GET /status` and `POST /reindex`.
///
/// Only `ready` participates in readiness; the remaining fields are shown by
/// the `status` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub indexing: bool,
    #[serde(default)]
    pub has_index: bool,
    #[serde(default)]
    pub last_doc: Option<String>,
}

impl StatusReport {
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            ready: true,
            indexing: false,
            has_index: true,
            last_doc: None,
        }
    }

    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            ready: false,
            indexing: true,
            has_index: false,
            last_doc: None,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ready: {} | indexing: {} | index: {}",
            self.ready,
            self.indexing,
            if self.has_index { "loaded" } else { "missing" }
        )?;
        if let Some(doc) = &self.last_doc {
            write!(f, " | last document: {doc}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub query: &'a str,
}
