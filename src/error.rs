use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum RefstashError {
    #[error("malformed bibliographic record: {0}")]
    #[diagnostic(help("a record must start with a header like `@article{{key,`"))]
    MalformedRecord(String),

    #[error("no configured source handles {0}")]
    UnsupportedSource(String),

    #[error("unknown source in configuration: {0}")]
    UnknownSource(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("source request failed: {0}")]
    SourceHttp(String),

    #[error("source returned status {status}: {message}")]
    SourceStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
