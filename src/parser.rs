use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::RefstashError;
use crate::record::{BibliographicRecord, Fields};

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@(\w+)\{([\w\-.]+)\s*,").expect("header pattern"));
static CHUNK_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*,?").expect("chunk break pattern"));
static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*=\s*\{(.*)$").expect("field pattern"));

/// Tolerant reader for bibliographic text blocks of the form
/// `@type{key, field = {value}, ...}`.
///
/// Only the header is mandatory. Field chunks that do not look like
/// `key = {value` are dropped without error.
pub struct RecordParser;

impl RecordParser {
    pub fn parse(text: &str) -> Result<BibliographicRecord, RefstashError> {
        let text = flatten_lines(&strip_comments(text));

        let captures = HEADER_RE.captures(&text).ok_or_else(|| {
            RefstashError::MalformedRecord(format!("missing header in {:?}", preview(&text)))
        })?;
        let header = captures.get(0).map(|m| m.end()).unwrap_or(0);
        let entry_type = &captures[1];
        let reference_key = &captures[2];
        debug!(entry_type, reference_key, "parsed record header");

        let mut fields = Fields::new();
        let chunks = field_chunks(&text[header..]);
        for (key, value) in chunks.iter().filter_map(|chunk| parse_field(chunk)) {
            debug!(%key, %value, "parsed record field");
            fields.insert(key, value);
        }

        let record = BibliographicRecord::new(entry_type, reference_key, fields)?;
        if !record.has_recognized_type() {
            debug!(entry_type, "unrecognized entry type");
        }
        Ok(record)
    }
}

/// Drops everything from `%` to the end of each line, including a `%` that
/// sits inside a field value.
fn strip_comments(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_once('%').map_or(line, |(kept, _)| kept))
        .collect::<Vec<_>>()
        .join("\n")
}

fn flatten_lines(text: &str) -> String {
    text.chars().filter(|ch| !matches!(ch, '\n' | '\r')).collect()
}

fn field_chunks(body: &str) -> Vec<String> {
    CHUNK_BREAK_RE
        .replace_all(body, "\n")
        .split('\n')
        .filter(|chunk| !chunk.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_field(chunk: &str) -> Option<(String, String)> {
    let captures = FIELD_RE.captures(chunk)?;
    let raw = captures[2].trim_end();
    let raw = raw.strip_suffix(',').unwrap_or(raw);
    let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    Some((captures[1].to_string(), value))
}

fn preview(text: &str) -> String {
    text.trim().chars().take(40).collect()
}
