use std::time::Duration;

use assert_matches::assert_matches;

use refstash::config::{Config, ConfigLoader, SourceSpec, default_sources};
use refstash::error::RefstashError;
use refstash::sources::{SourceKind, SourceRegistry};

fn parse(json: &str) -> Result<refstash::config::ResolvedConfig, RefstashError> {
    let config: Config = serde_json::from_str(json).unwrap();
    ConfigLoader::resolve_config(config)
}

#[test]
fn shorthand_and_detailed_entries() {
    let resolved = parse(
        r#"{
            "schema_version": 1,
            "sources": ["arxiv", {"name": "direct", "extensions": [".PDF", "djvu"]}, "doi"],
            "staging_dir": "/tmp/refstash-staging",
            "timeout_secs": 5,
            "user_agent": "refstash-test"
        }"#,
    )
    .unwrap();

    assert_eq!(
        resolved.sources,
        vec![
            SourceSpec {
                kind: SourceKind::Arxiv,
                extensions: None,
            },
            SourceSpec {
                kind: SourceKind::Direct,
                extensions: Some(vec![".PDF".to_string(), "djvu".to_string()]),
            },
            SourceSpec {
                kind: SourceKind::Doi,
                extensions: None,
            },
        ]
    );
    assert_eq!(resolved.staging_dir.as_deref().map(|p| p.as_str()), Some("/tmp/refstash-staging"));
    assert_eq!(resolved.http.timeout, Duration::from_secs(5));
    assert_eq!(resolved.http.user_agent, "refstash-test");
}

#[test]
fn missing_sources_use_default_order() {
    let resolved = parse("{}").unwrap();
    assert_eq!(resolved.sources, default_sources());

    let registry = SourceRegistry::from_config(&resolved).unwrap();
    assert_eq!(registry.names(), vec!["aps", "arxiv", "doi", "direct"]);
}

#[test]
fn empty_source_list_matches_nothing() {
    let resolved = parse(r#"{"sources": []}"#).unwrap();
    let registry = SourceRegistry::from_config(&resolved).unwrap();
    assert!(registry.is_empty());
    assert!(registry.resolve("https://arxiv.org/abs/1706.03762").is_none());
}

#[test]
fn unknown_source_is_rejected() {
    assert_matches!(
        parse(r#"{"sources": ["arxiv", "libgen"]}"#),
        Err(RefstashError::UnknownSource(name)) if name == "libgen"
    );
}

#[test]
fn duplicate_source_is_rejected() {
    assert_matches!(
        parse(r#"{"sources": ["arxiv", {"name": "arxiv"}]}"#),
        Err(RefstashError::ConfigParse(_))
    );
}

#[test]
fn extensions_only_for_direct() {
    assert_matches!(
        parse(r#"{"sources": [{"name": "doi", "extensions": ["pdf"]}]}"#),
        Err(RefstashError::ConfigParse(_))
    );
}

#[test]
fn resolve_reads_explicit_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("refstash.json");
    std::fs::write(&path, r#"{"sources": ["doi", "arxiv"], "timeout_secs": 12}"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(
        resolved.sources.iter().map(|spec| spec.kind).collect::<Vec<_>>(),
        vec![SourceKind::Doi, SourceKind::Arxiv]
    );
    assert_eq!(resolved.http.timeout, Duration::from_secs(12));
}

#[test]
fn resolve_reports_unreadable_and_invalid_files() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("missing.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str()),
        Err(RefstashError::ConfigRead(path)) if path == missing
    );

    let invalid = temp.path().join("invalid.json");
    std::fs::write(&invalid, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(invalid.to_str()),
        Err(RefstashError::ConfigParse(_))
    );
}
