use super::{Handle, HttpClient, SourceMatcher, parse_web_url};
use crate::error::RefstashError;

pub fn default_extensions() -> Vec<String> {
    vec![
        "pdf".to_string(),
        "djvu".to_string(),
        "epub".to_string(),
        "ps".to_string(),
    ]
}

/// Catch-all for plain links to document files. Provides bytes only.
#[derive(Debug, Clone)]
pub struct DirectSource {
    http: HttpClient,
    extensions: Vec<String>,
}

impl DirectSource {
    pub fn new(http: HttpClient) -> Self {
        Self::with_extensions(http, default_extensions())
    }

    pub fn with_extensions(http: HttpClient, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { http, extensions }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// File name of `url` when it points at a document with an accepted
    /// extension.
    pub fn document_file_name(&self, url: &str) -> Option<String> {
        let parsed = parse_web_url(url)?;
        let name = parsed.path_segments()?.next_back()?.to_string();
        let (_, ext) = name.rsplit_once('.')?;
        let ext = ext.to_lowercase();
        self.extensions.contains(&ext).then_some(name)
    }
}

impl SourceMatcher for DirectSource {
    fn name(&self) -> &str {
        "direct"
    }

    fn matches(&self, url: &str) -> Option<Box<dyn Handle>> {
        let file_name = self.document_file_name(url)?;
        Some(Box::new(DirectHandle {
            http: self.http.clone(),
            url: url.trim().to_string(),
            file_name,
        }))
    }
}

pub struct DirectHandle {
    http: HttpClient,
    url: String,
    file_name: String,
}

impl Handle for DirectHandle {
    fn source(&self) -> &str {
        "direct"
    }

    fn fetch_metadata_text(&self) -> Result<Option<String>, RefstashError> {
        Ok(None)
    }

    fn fetch_document_bytes(&self) -> Result<Option<Vec<u8>>, RefstashError> {
        self.http.get_bytes(&self.url)
    }

    fn document_name(&self) -> Option<String> {
        Some(self.file_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::HttpSettings;

    fn source(extensions: Vec<String>) -> DirectSource {
        let http = HttpClient::new(&HttpSettings::default()).unwrap();
        DirectSource::with_extensions(http, extensions)
    }

    #[test]
    fn matches_document_links() {
        let direct = source(default_extensions());
        assert_eq!(
            direct
                .document_file_name("https://example.org/papers/Notes.PDF?download=1")
                .as_deref(),
            Some("Notes.PDF")
        );
        assert!(direct.document_file_name("https://example.org/book.djvu").is_some());
    }

    #[test]
    fn ignores_pages_and_other_schemes() {
        let direct = source(default_extensions());
        assert!(direct.document_file_name("https://example.org/index.html").is_none());
        assert!(direct.document_file_name("https://example.org/").is_none());
        assert!(direct.document_file_name("file:///tmp/a.pdf").is_none());
    }

    #[test]
    fn configured_extensions_are_normalized() {
        let direct = source(vec![".EPUB".to_string(), " ".to_string()]);
        assert_eq!(direct.extensions(), ["epub".to_string()]);
        assert!(direct.document_file_name("https://example.org/a.pdf").is_none());
        assert!(direct.document_file_name("https://example.org/a.epub").is_some());
    }

    #[test]
    fn handle_offers_no_metadata() {
        let direct = source(default_extensions());
        let handle = direct.matches("https://example.org/a.pdf").unwrap();
        assert_eq!(handle.fetch_metadata_text().unwrap(), None);
        assert_eq!(handle.document_name().as_deref(), Some("a.pdf"));
    }
}
