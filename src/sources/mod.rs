//! Content sources and the registry that dispatches URLs to them.
//!
//! A source implements [`SourceMatcher`]: given a URL it decides, without any
//! network access, whether the URL belongs to it and hands back a [`Handle`]
//! scoped to that one item. The [`SourceRegistry`] keeps sources in a fixed
//! order and the first match wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ResolvedConfig, SourceSpec};
use crate::error::RefstashError;

pub mod aps;
pub mod arxiv;
pub mod direct;
pub mod doi;
pub mod http;

pub use http::{HttpClient, HttpSettings};

/// Capability obtained from a successful match, used for one fetch.
///
/// `Ok(None)` from either fetch method means the source has no such data for
/// this item, which is not an error.
pub trait Handle {
    /// Name of the source that produced this handle.
    fn source(&self) -> &str;

    fn fetch_metadata_text(&self) -> Result<Option<String>, RefstashError>;

    fn fetch_document_bytes(&self) -> Result<Option<Vec<u8>>, RefstashError>;

    /// File name suggested for the staged document.
    fn document_name(&self) -> Option<String> {
        None
    }
}

pub trait SourceMatcher: Send + Sync {
    fn name(&self) -> &str;

    /// Pure function of `url`; must not perform I/O.
    fn matches(&self, url: &str) -> Option<Box<dyn Handle>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Aps,
    Arxiv,
    Doi,
    Direct,
}

impl SourceKind {
    /// Order used when no configuration says otherwise. Specific publishers
    /// come before the catch-all `direct` source.
    pub const DEFAULT_ORDER: [SourceKind; 4] = [
        SourceKind::Aps,
        SourceKind::Arxiv,
        SourceKind::Doi,
        SourceKind::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Aps => "aps",
            SourceKind::Arxiv => "arxiv",
            SourceKind::Doi => "doi",
            SourceKind::Direct => "direct",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = RefstashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        SourceKind::DEFAULT_ORDER
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| RefstashError::UnknownSource(value.to_string()))
    }
}

#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn SourceMatcher>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl SourceMatcher + 'static) -> Self {
        self.register(Box::new(source));
        self
    }

    /// Appends `source` after every source already registered.
    pub fn register(&mut self, source: Box<dyn SourceMatcher>) {
        self.sources.push(source);
    }

    /// All built-in sources in [`SourceKind::DEFAULT_ORDER`].
    pub fn builtin(http: HttpClient) -> Self {
        let mut registry = Self::new();
        for kind in SourceKind::DEFAULT_ORDER {
            registry.register(builtin_source(
                &SourceSpec {
                    kind,
                    extensions: None,
                },
                &http,
            ));
        }
        registry
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, RefstashError> {
        let http = HttpClient::new(&config.http)?;
        let mut registry = Self::new();
        for spec in &config.sources {
            registry.register(builtin_source(spec, &http));
        }
        Ok(registry)
    }

    /// Returns the handle of the first source, in registration order, that
    /// accepts `url`. Later sources are never consulted.
    pub fn resolve(&self, url: &str) -> Option<Box<dyn Handle>> {
        let handle = self.sources.iter().find_map(|source| source.matches(url));
        match &handle {
            Some(handle) => debug!(url, source = handle.source(), "resolved source"),
            None => debug!(url, "no source matched"),
        }
        handle
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}

fn builtin_source(spec: &SourceSpec, http: &HttpClient) -> Box<dyn SourceMatcher> {
    match spec.kind {
        SourceKind::Aps => Box::new(aps::ApsSource::new(http.clone())),
        SourceKind::Arxiv => Box::new(arxiv::ArxivSource::new(http.clone())),
        SourceKind::Doi => Box::new(doi::DoiSource::new(http.clone())),
        SourceKind::Direct => match &spec.extensions {
            Some(extensions) => Box::new(direct::DirectSource::with_extensions(
                http.clone(),
                extensions.clone(),
            )),
            None => Box::new(direct::DirectSource::new(http.clone())),
        },
    }
}

/// Parses `url` and returns it only for `http`/`https` schemes.
pub(crate) fn parse_web_url(url: &str) -> Option<reqwest::Url> {
    let parsed = reqwest::Url::parse(url.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_source_kind() {
        assert_eq!("ArXiv".parse::<SourceKind>().unwrap(), SourceKind::Arxiv);
        assert_matches!(
            "libgen".parse::<SourceKind>(),
            Err(RefstashError::UnknownSource(_))
        );
    }

    #[test]
    fn builtin_registry_order() {
        let http = HttpClient::new(&HttpSettings::default()).unwrap();
        let registry = SourceRegistry::builtin(http);
        assert_eq!(registry.names(), vec!["aps", "arxiv", "doi", "direct"]);
    }

    #[test]
    fn builtin_registry_dispatch() {
        let http = HttpClient::new(&HttpSettings::default()).unwrap();
        let registry = SourceRegistry::builtin(http);

        let cases = [
            ("https://arxiv.org/abs/2301.07041", "arxiv"),
            ("https://arxiv.org/pdf/2301.07041.pdf", "arxiv"),
            (
                "https://journals.aps.org/prl/abstract/10.1103/PhysRevLett.116.061102",
                "aps",
            ),
            ("https://doi.org/10.1038/nature14539", "doi"),
            ("https://example.org/files/notes.pdf", "direct"),
        ];
        for (url, expected) in cases {
            let handle = registry.resolve(url).unwrap();
            assert_eq!(handle.source(), expected, "{url}");
        }
        assert!(registry.resolve("https://example.org/index.html").is_none());
        assert!(registry.resolve("not-a-known-url").is_none());
    }

    #[test]
    fn web_url_requires_http_scheme() {
        assert!(parse_web_url("https://arxiv.org/abs/1").is_some());
        assert!(parse_web_url("ftp://arxiv.org/abs/1").is_none());
        assert!(parse_web_url("arxiv.org/abs/1").is_none());
    }
}
