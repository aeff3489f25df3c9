use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::Builder;
use tracing::debug;

use crate::error::RefstashError;

const DEFAULT_DOCUMENT_NAME: &str = "document";

/// Writes fetched document bytes into uniquely named temporary artifacts.
///
/// Every artifact gets its own `refstash-XXXXXX` directory under the staging
/// root, so concurrent callers never share a path. Bytes land in a hidden
/// `.part` file first and are renamed into place only after a full sync.
#[derive(Debug, Clone)]
pub struct Stager {
    root: Utf8PathBuf,
}

impl Stager {
    pub fn new() -> Result<Self, RefstashError> {
        let root = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .map_err(|_| RefstashError::Filesystem("invalid temp directory path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn stage(
        &self,
        content: &[u8],
        name_hint: Option<&str>,
    ) -> Result<StagedDocument, RefstashError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| RefstashError::Filesystem(format!("create {}: {err}", self.root)))?;
        let dir = Builder::new()
            .prefix("refstash-")
            .tempdir_in(self.root.as_std_path())
            .map_err(|err| RefstashError::Filesystem(err.to_string()))?;
        let staging_dir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|_| RefstashError::Filesystem("invalid staging dir".to_string()))?;
        let path = staging_dir.join(sanitize_file_name(name_hint));

        let mut partial = Builder::new()
            .prefix(".")
            .suffix(".part")
            .tempfile_in(dir.path())
            .map_err(|err| RefstashError::Filesystem(err.to_string()))?;
        partial
            .write_all(content)
            .map_err(|err| RefstashError::Filesystem(format!("write {path}: {err}")))?;
        partial
            .as_file()
            .sync_all()
            .map_err(|err| RefstashError::Filesystem(format!("sync {path}: {err}")))?;
        partial
            .persist(path.as_std_path())
            .map_err(|err| RefstashError::Filesystem(err.to_string()))?;

        // The directory now belongs to the caller through `StagedDocument`.
        let _ = dir.keep();
        debug!(%path, bytes = content.len(), "staged document");
        Ok(StagedDocument { path, staging_dir })
    }
}

/// A fully written artifact produced by [`Stager::stage`]. Deleting it is the
/// holder's job, see [`StagedDocument::remove`].
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct StagedDocument {
    path: Utf8PathBuf,
    staging_dir: Utf8PathBuf,
}

impl StagedDocument {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn staging_dir(&self) -> &Utf8Path {
        &self.staging_dir
    }

    pub fn into_path(self) -> Utf8PathBuf {
        self.path
    }

    /// Removes the artifact together with its private staging directory.
    pub fn remove(self) -> Result<(), RefstashError> {
        if self.staging_dir.as_std_path().exists() {
            fs::remove_dir_all(self.staging_dir.as_std_path())
                .map_err(|err| RefstashError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}

fn sanitize_file_name(hint: Option<&str>) -> String {
    hint.and_then(|value| Path::new(value).file_name())
        .and_then(|name| name.to_str())
        .map(|name| {
            name.chars()
                .filter(|ch| !ch.is_control() && !matches!(ch, '/' | '\\' | ':'))
                .collect::<String>()
        })
        .filter(|name| !name.is_empty() && !name.starts_with('.'))
        .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name(Some("2301.07041.pdf")), "2301.07041.pdf");
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name(Some("../../etc/passwd")), "passwd");
    }

    #[test]
    fn sanitize_falls_back_to_default() {
        assert_eq!(sanitize_file_name(None), DEFAULT_DOCUMENT_NAME);
        assert_eq!(sanitize_file_name(Some("")), DEFAULT_DOCUMENT_NAME);
        assert_eq!(sanitize_file_name(Some(".hidden")), DEFAULT_DOCUMENT_NAME);
        assert_eq!(sanitize_file_name(Some("..")), DEFAULT_DOCUMENT_NAME);
    }

    #[test]
    fn stage_leaves_no_partial_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let stager = Stager::new_with_root(root);

        let staged = stager.stage(b"%PDF-1.7", Some("paper.pdf")).unwrap();
        let names = fs::read_dir(staged.staging_dir().as_std_path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["paper.pdf".to_string()]);
        assert_eq!(fs::read(staged.path().as_std_path()).unwrap(), b"%PDF-1.7");
    }
}
