use std::sync::LazyLock;

use regex::Regex;

use super::{Handle, HttpClient, SourceMatcher, parse_web_url};
use crate::error::RefstashError;

const APS_BASE: &str = "https://journals.aps.org";

static APS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([a-z]+)/(?:abstract|pdf|export)/(10\.\d{4,9}/[^/]+)/?$")
        .expect("aps path pattern")
});

/// American Physical Society journals on `journals.aps.org`.
#[derive(Debug, Clone)]
pub struct ApsSource {
    http: HttpClient,
}

impl ApsSource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

impl SourceMatcher for ApsSource {
    fn name(&self) -> &str {
        "aps"
    }

    fn matches(&self, url: &str) -> Option<Box<dyn Handle>> {
        let article = aps_article(url)?;
        Some(Box::new(ApsHandle {
            http: self.http.clone(),
            article,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApsArticle {
    pub journal: String,
    pub doi: String,
}

impl ApsArticle {
    pub fn bibtex_url(&self) -> String {
        format!(
            "{APS_BASE}/{}/export/{}?type=bibtex&download=true",
            self.journal, self.doi
        )
    }

    pub fn pdf_url(&self) -> String {
        format!("{APS_BASE}/{}/pdf/{}", self.journal, self.doi)
    }
}

pub struct ApsHandle {
    http: HttpClient,
    article: ApsArticle,
}

impl Handle for ApsHandle {
    fn source(&self) -> &str {
        "aps"
    }

    fn fetch_metadata_text(&self) -> Result<Option<String>, RefstashError> {
        self.http.get_text(&self.article.bibtex_url(), None)
    }

    fn fetch_document_bytes(&self) -> Result<Option<Vec<u8>>, RefstashError> {
        self.http.get_bytes(&self.article.pdf_url())
    }

    fn document_name(&self) -> Option<String> {
        let suffix = self.article.doi.rsplit('/').next()?;
        Some(format!("{suffix}.pdf"))
    }
}

pub fn aps_article(url: &str) -> Option<ApsArticle> {
    let parsed = parse_web_url(url)?;
    if parsed.host_str()? != "journals.aps.org" {
        return None;
    }
    let captures = APS_PATH_RE.captures(parsed.path())?;
    Some(ApsArticle {
        journal: captures[1].to_string(),
        doi: captures[2].to_string(),
    })
}
