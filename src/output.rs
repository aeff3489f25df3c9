use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::fetch::{BatchResult, ProgressEvent, ProgressSink};
use crate::record::BibliographicRecord;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_batch(result: &BatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_record(record: &BibliographicRecord) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_sources(names: &[&str]) -> io::Result<()> {
        Self::print_json(&names)
    }

    pub fn print_match(url: &str, source: Option<&str>) -> io::Result<()> {
        #[derive(Serialize)]
        struct MatchReport<'a> {
            url: &'a str,
            source: Option<&'a str>,
        }
        Self::print_json(&MatchReport { url, source })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the `tracing` subscriber at debug level.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => debug!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => debug!("{}", event.message),
        }
    }
}
