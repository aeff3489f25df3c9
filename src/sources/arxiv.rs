use std::sync::LazyLock;

use regex::Regex;

use super::{Handle, HttpClient, SourceMatcher, parse_web_url};
use crate::error::RefstashError;

const ARXIV_BASE: &str = "https://arxiv.org";
const ARXIV_HOSTS: &[&str] = &["arxiv.org", "www.arxiv.org", "export.arxiv.org"];

// New-style `2301.07041v2` and old-style `hep-th/9901001` identifiers.
static ARXIV_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/(?:abs|pdf)/((?:\d{4}\.\d{4,5}|[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?)(?:\.pdf)?/?$",
    )
    .expect("arxiv path pattern")
});

/// arXiv preprints: `arxiv.org/abs/<id>` and `arxiv.org/pdf/<id>`.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    http: HttpClient,
}

impl ArxivSource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl SourceMatcher for ArxivSource {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn matches(&self, url: &str) -> Option<Box<dyn Handle>> {
        let id = arxiv_id(url)?;
        Some(Box::new(ArxivHandle {
            http: self.http.clone(),
            id,
        }))
    }
}

pub struct ArxivHandle {
    http: HttpClient,
    id: String,
}

impl ArxivHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Handle for ArxivHandle {
    fn source(&self) -> &str {
        "arxiv"
    }

    fn fetch_metadata_text(&self) -> Result<Option<String>, RefstashError> {
        self.http.get_text(&bibtex_url(&self.id), None)
    }

    fn fetch_document_bytes(&self) -> Result<Option<Vec<u8>>, RefstashError> {
        self.http.get_bytes(&pdf_url(&self.id))
    }

    fn document_name(&self) -> Option<String> {
        Some(format!("{}.pdf", self.id.replace('/', "_")))
    }
}

pub fn arxiv_id(url: &str) -> Option<String> {
    let parsed = parse_web_url(url)?;
    let host = parsed.host_str()?;
    if !ARXIV_HOSTS.contains(&host) {
        return None;
    }
    ARXIV_PATH_RE
        .captures(parsed.path())
        .map(|captures| captures[1].to_string())
}

pub fn bibtex_url(id: &str) -> String {
    format!("{ARXIV_BASE}/bibtex/{id}")
}

pub fn pdf_url(id: &str) -> String {
    format!("{ARXIV_BASE}/pdf/{id}")
}
