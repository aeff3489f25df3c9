use std::sync::LazyLock;

use regex::Regex;

use super::{Handle, HttpClient, SourceMatcher, parse_web_url};
use crate::error::RefstashError;

const DOI_RESOLVER: &str = "https://doi.org";
const BIBTEX_MEDIA_TYPE: &str = "application/x-bibtex";
const DOI_HOSTS: &[&str] = &["doi.org", "dx.doi.org", "www.doi.org"];

static DOI_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(10\.\d{4,9}/\S+)$").expect("doi path pattern"));

/// DOI resolver links. Metadata comes from content negotiation on
/// `doi.org`; the resolver never serves documents.
#[derive(Debug, Clone)]
pub struct DoiSource {
    http: HttpClient,
}

impl DoiSource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl SourceMatcher for DoiSource {
    fn name(&self) -> &str {
        "doi"
    }

    fn matches(&self, url: &str) -> Option<Box<dyn Handle>> {
        let doi = doi_from_url(url)?;
        Some(Box::new(DoiHandle {
            http: self.http.clone(),
            doi,
        }))
    }
}

pub struct DoiHandle {
    http: HttpClient,
    doi: String,
}

impl Handle for DoiHandle {
    fn source(&self) -> &str {
        "doi"
    }

    fn fetch_metadata_text(&self) -> Result<Option<String>, RefstashError> {
        self.http
            .get_text(&format!("{DOI_RESOLVER}/{}", self.doi), Some(BIBTEX_MEDIA_TYPE))
    }

    fn fetch_document_bytes(&self) -> Result<Option<Vec<u8>>, RefstashError> {
        Ok(None)
    }
}

pub fn doi_from_url(url: &str) -> Option<String> {
    let parsed = parse_web_url(url)?;
    if !DOI_HOSTS.contains(&parsed.host_str()?) {
        return None;
    }
    DOI_PATH_RE
        .captures(parsed.path())
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::HttpSettings;

    #[test]
    fn resolver_hosts() {
        assert_eq!(
            doi_from_url("https://doi.org/10.1038/nature14539").as_deref(),
            Some("10.1038/nature14539")
        );
        assert_eq!(
            doi_from_url("http://dx.doi.org/10.1103/PhysRevLett.116.061102").as_deref(),
            Some("10.1103/PhysRevLett.116.061102")
        );
    }

    #[test]
    fn rejects_non_doi_paths() {
        assert!(doi_from_url("https://doi.org/").is_none());
        assert!(doi_from_url("https://doi.org/help").is_none());
        assert!(doi_from_url("https://example.org/10.1038/nature14539").is_none());
    }

    #[test]
    fn never_serves_documents() {
        let http = HttpClient::new(&HttpSettings::default()).unwrap();
        let handle = DoiSource::new(http)
            .matches("https://doi.org/10.1038/nature14539")
            .unwrap();
        assert_eq!(handle.fetch_document_bytes().unwrap(), None);
    }
}
