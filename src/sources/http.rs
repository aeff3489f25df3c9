use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::RefstashError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("refstash/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Blocking HTTP client shared by the built-in sources.
///
/// A `404`/`410` answer means the source has nothing for the item and maps to
/// `Ok(None)`; any other non-success status is an error.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, RefstashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|err| RefstashError::ConfigParse(format!("user agent: {err}")))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| RefstashError::SourceHttp(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn get_text(
        &self,
        url: &str,
        accept: Option<&str>,
    ) -> Result<Option<String>, RefstashError> {
        let Some(response) = self.send(url, accept)? else {
            return Ok(None);
        };
        let text = response
            .text()
            .map_err(|err| RefstashError::SourceHttp(err.to_string()))?;
        Ok((!text.trim().is_empty()).then_some(text))
    }

    pub fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, RefstashError> {
        let Some(response) = self.send(url, None)? else {
            return Ok(None);
        };
        let bytes = response
            .bytes()
            .map_err(|err| RefstashError::SourceHttp(err.to_string()))?;
        Ok((!bytes.is_empty()).then(|| bytes.to_vec()))
    }

    fn send(&self, url: &str, accept: Option<&str>) -> Result<Option<Response>, RefstashError> {
        debug!(url, "requesting");
        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        let response = request
            .send()
            .map_err(|err| RefstashError::SourceHttp(err.to_string()))?;
        Self::handle_status(response)
    }

    fn handle_status(response: Response) -> Result<Option<Response>, RefstashError> {
        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "source request failed".to_string());
        Err(RefstashError::SourceStatus {
            status: status.as_u16(),
            message,
        })
    }
}
