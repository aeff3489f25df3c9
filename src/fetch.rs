use std::fmt;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::RefstashError;
use crate::parser::RecordParser;
use crate::record::BibliographicRecord;
use crate::sources::SourceRegistry;
use crate::stage::{StagedDocument, Stager};

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Fail with [`RefstashError::UnsupportedSource`] instead of returning an
    /// empty result when no source accepts the URL.
    pub require_match: bool,
}

/// Non-fatal conditions met while fetching one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchWarning {
    UnsupportedSource { message: String },
    MalformedRecord { message: String },
    MetadataUnavailable { message: String },
}

impl fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchWarning::UnsupportedSource { message }
            | FetchWarning::MalformedRecord { message }
            | FetchWarning::MetadataUnavailable { message } => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FetchResult {
    pub url: String,
    pub source: Option<String>,
    pub record: Option<BibliographicRecord>,
    /// Owned by the caller, who is responsible for removing it.
    pub staged_document: Option<StagedDocument>,
    pub warnings: Vec<FetchWarning>,
    pub fetched_at: String,
}

impl FetchResult {
    fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            source: None,
            record: None,
            staged_document: None,
            warnings: Vec::new(),
            fetched_at: iso_timestamp(),
        }
    }

    pub fn staged_document_path(&self) -> Option<&Utf8Path> {
        self.staged_document.as_ref().map(|doc| doc.path())
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_none() && self.staged_document.is_none()
    }

    pub fn is_unsupported(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, FetchWarning::UnsupportedSource { .. }))
    }
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub url: String,
    pub result: Option<FetchResult>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.error.is_some()).count()
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Drives one fetch: resolve the URL to a source, parse its metadata text,
/// stage its document bytes.
#[derive(Debug)]
pub struct FetchOrchestrator {
    registry: SourceRegistry,
    stager: Stager,
}

impl FetchOrchestrator {
    pub fn new(registry: SourceRegistry, stager: Stager) -> Self {
        Self { registry, stager }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn stager(&self) -> &Stager {
        &self.stager
    }

    /// Metadata problems (malformed text, transport failures) are recorded
    /// as warnings and never stop the document download. Failing to fetch
    /// or stage the document is an error for this call.
    pub fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, RefstashError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {url}"),
            elapsed: None,
        });

        let Some(handle) = self.registry.resolve(url) else {
            let error = RefstashError::UnsupportedSource(url.to_string());
            if options.require_match {
                return Err(error);
            }
            warn!(url, "no source matched");
            let mut result = FetchResult::empty(url);
            result.warnings.push(FetchWarning::UnsupportedSource {
                message: error.to_string(),
            });
            return Ok(result);
        };

        let mut result = FetchResult::empty(url);
        result.source = Some(handle.source().to_string());

        sink.event(ProgressEvent {
            message: format!("phase=Metadata; source {}", handle.source()),
            elapsed: Some(started.elapsed()),
        });
        match handle.fetch_metadata_text() {
            Ok(Some(text)) => match RecordParser::parse(&text) {
                Ok(record) => result.record = Some(record),
                Err(err) => {
                    warn!(url, error = %err, "metadata could not be parsed");
                    result.warnings.push(FetchWarning::MalformedRecord {
                        message: err.to_string(),
                    });
                }
            },
            Ok(None) => debug!(url, "source offers no metadata"),
            Err(err) => {
                warn!(url, error = %err, "metadata fetch failed");
                result.warnings.push(FetchWarning::MetadataUnavailable {
                    message: err.to_string(),
                });
            }
        }

        sink.event(ProgressEvent {
            message: format!("phase=Document; source {}", handle.source()),
            elapsed: Some(started.elapsed()),
        });
        if let Some(bytes) = handle.fetch_document_bytes()? {
            let staged = self
                .stager
                .stage(&bytes, handle.document_name().as_deref())?;
            result.staged_document = Some(staged);
        } else {
            debug!(url, "source offers no document");
        }

        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });
        Ok(result)
    }

    /// Fetches every URL independently; one failure never stops the rest.
    pub fn fetch_all<I, S>(
        &self,
        urls: I,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> BatchResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items = urls
            .into_iter()
            .map(|url| {
                let url = url.as_ref();
                match self.fetch(url, options, sink) {
                    Ok(result) => BatchItem {
                        url: url.to_string(),
                        result: Some(result),
                        error: None,
                    },
                    Err(err) => {
                        warn!(url, error = %err, "fetch failed");
                        BatchItem {
                            url: url.to_string(),
                            result: None,
                            error: Some(err.to_string()),
                        }
                    }
                }
            })
            .collect();
        BatchResult { items }
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
