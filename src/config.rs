use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RefstashError;
use crate::sources::{HttpSettings, SourceKind};

pub const CONFIG_FILE_NAME: &str = "refstash.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub sources: Option<Vec<SourceEntry>>,
    #[serde(default)]
    pub staging_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Shorthand(String),
    Detailed(SourceEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SourceEntryObject {
    pub name: String,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    /// Registry order; the first source to accept a URL handles it.
    pub sources: Vec<SourceSpec>,
    pub staging_dir: Option<Utf8PathBuf>,
    pub http: HttpSettings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            sources: default_sources(),
            staging_dir: None,
            http: HttpSettings::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` when given. Otherwise looks for `refstash.json` in the
    /// current directory, then in the user config directory, and falls back
    /// to built-in defaults when neither exists.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, RefstashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match Self::discover() {
                Some(found) => found,
                None => {
                    debug!("no config file found, using defaults");
                    return Ok(ResolvedConfig::default());
                }
            },
        };

        debug!(path = %config_path.display(), "loading config");
        let content = fs::read_to_string(&config_path)
            .map_err(|_| RefstashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RefstashError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, RefstashError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let sources = match config.sources {
            Some(entries) => resolve_sources(entries)?,
            None => default_sources(),
        };

        let mut http = HttpSettings::default();
        if let Some(secs) = config.timeout_secs {
            if secs == 0 {
                return Err(RefstashError::ConfigParse(
                    "timeout_secs must be greater than zero".to_string(),
                ));
            }
            http.timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = config.user_agent {
            http.user_agent = user_agent;
        }

        Ok(ResolvedConfig {
            schema_version,
            sources,
            staging_dir: config.staging_dir.map(Utf8PathBuf::from),
            http,
        })
    }

    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "refstash").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn discover() -> Option<PathBuf> {
        let local = Path::new(CONFIG_FILE_NAME).to_path_buf();
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path().filter(|path| path.exists())
    }
}

pub fn default_sources() -> Vec<SourceSpec> {
    SourceKind::DEFAULT_ORDER
        .into_iter()
        .map(|kind| SourceSpec {
            kind,
            extensions: None,
        })
        .collect()
}

fn resolve_sources(entries: Vec<SourceEntry>) -> Result<Vec<SourceSpec>, RefstashError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(entries.len());
    for entry in entries {
        let spec = match entry {
            SourceEntry::Shorthand(name) => SourceSpec {
                kind: name.parse()?,
                extensions: None,
            },
            SourceEntry::Detailed(obj) => {
                let kind: SourceKind = obj.name.parse()?;
                if obj.extensions.is_some() && kind != SourceKind::Direct {
                    return Err(RefstashError::ConfigParse(format!(
                        "extensions only apply to the direct source, not {kind}"
                    )));
                }
                SourceSpec {
                    kind,
                    extensions: obj.extensions,
                }
            }
        };
        if !seen.insert(spec.kind) {
            return Err(RefstashError::ConfigParse(format!(
                "source {} listed more than once",
                spec.kind
            )));
        }
        specs.push(spec);
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.sources, default_sources());
        assert_eq!(resolved.http, HttpSettings::default());
        assert!(resolved.staging_dir.is_none());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(ConfigLoader::resolve_config(config).is_err());
    }
}
