use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::RefstashError;

// Same character classes as the record header matched by the parser.
static ENTRY_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("entry type pattern"));
static REFERENCE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\-.]+$").expect("reference key pattern"));

/// Field names a bibliographic record conventionally carries. Anything else
/// is still stored, but reported by [`BibliographicRecord::unrecognized_fields`].
pub const KNOWN_FIELDS: &[&str] = &[
    "address",
    "annote",
    "author",
    "booktitle",
    "chapter",
    "crossref",
    "edition",
    "editor",
    "howpublished",
    "institution",
    "journal",
    "key",
    "month",
    "note",
    "number",
    "organization",
    "pages",
    "publisher",
    "school",
    "series",
    "title",
    "volume",
    "year",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    Conference,
    Inbook,
    Incollection,
    Inproceedings,
    Manual,
    Mastersthesis,
    Misc,
    Phdthesis,
    Proceedings,
    Techreport,
    Unpublished,
}

impl EntryType {
    pub const ALL: [EntryType; 14] = [
        EntryType::Article,
        EntryType::Book,
        EntryType::Booklet,
        EntryType::Conference,
        EntryType::Inbook,
        EntryType::Incollection,
        EntryType::Inproceedings,
        EntryType::Manual,
        EntryType::Mastersthesis,
        EntryType::Misc,
        EntryType::Phdthesis,
        EntryType::Proceedings,
        EntryType::Techreport,
        EntryType::Unpublished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Article => "article",
            EntryType::Book => "book",
            EntryType::Booklet => "booklet",
            EntryType::Conference => "conference",
            EntryType::Inbook => "inbook",
            EntryType::Incollection => "incollection",
            EntryType::Inproceedings => "inproceedings",
            EntryType::Manual => "manual",
            EntryType::Mastersthesis => "mastersthesis",
            EntryType::Misc => "misc",
            EntryType::Phdthesis => "phdthesis",
            EntryType::Proceedings => "proceedings",
            EntryType::Techreport => "techreport",
            EntryType::Unpublished => "unpublished",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = RefstashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        EntryType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| RefstashError::MalformedRecord(format!("unknown entry type {value}")))
    }
}

/// Field map of a record.
///
/// Keys are unique. Iteration follows insertion order, equality does not.
#[derive(Debug, Clone, Default, Eq)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, returning the previous value. A replaced
    /// key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.insert(key, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A structured bibliographic record: entry type, reference key and fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BibliographicRecord {
    entry_type: String,
    reference_key: String,
    fields: Fields,
}

impl BibliographicRecord {
    pub fn new(
        entry_type: impl Into<String>,
        reference_key: impl Into<String>,
        fields: Fields,
    ) -> Result<Self, RefstashError> {
        let entry_type = entry_type.into();
        let reference_key = reference_key.into();
        if !ENTRY_TYPE_RE.is_match(&entry_type) {
            return Err(RefstashError::MalformedRecord(format!(
                "invalid entry type {entry_type:?}"
            )));
        }
        if !REFERENCE_KEY_RE.is_match(&reference_key) {
            return Err(RefstashError::MalformedRecord(format!(
                "invalid reference key {reference_key:?}"
            )));
        }
        Ok(Self {
            entry_type,
            reference_key,
            fields,
        })
    }

    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    pub fn reference_key(&self) -> &str {
        &self.reference_key
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// The entry type if it belongs to the known vocabulary.
    pub fn kind(&self) -> Option<EntryType> {
        self.entry_type.parse().ok()
    }

    pub fn has_recognized_type(&self) -> bool {
        self.kind().is_some()
    }

    pub fn unrecognized_fields(&self) -> Vec<&str> {
        self.fields
            .keys()
            .filter(|key| !KNOWN_FIELDS.contains(&key.to_lowercase().as_str()))
            .collect()
    }

    /// Canonical text form, readable back by [`crate::parser::RecordParser`].
    pub fn to_bibtex(&self) -> String {
        let mut out = format!("@{}{{{},\n", self.entry_type, self.reference_key);
        let last = self.fields.len().saturating_sub(1);
        for (idx, (key, value)) in self.fields.iter().enumerate() {
            let separator = if idx == last { "" } else { "," };
            // The parser drops one trailing comma from every value.
            let guard = if value.ends_with(',') { "," } else { "" };
            out.push_str(&format!("  {key} = {{{value}{guard}}}{separator}\n"));
        }
        out.push('}');
        out
    }
}

impl fmt::Display for BibliographicRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bibtex())
    }
}
