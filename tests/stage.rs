use std::collections::HashSet;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use refstash::error::RefstashError;
use refstash::stage::Stager;

fn stager_in(temp: &tempfile::TempDir, child: &str) -> Stager {
    let root = Utf8PathBuf::from_path_buf(temp.path().join(child)).unwrap();
    Stager::new_with_root(root)
}

#[test]
fn stage_creates_missing_root() {
    let temp = tempfile::tempdir().unwrap();
    let stager = stager_in(&temp, "a/b/c");

    let staged = stager.stage(b"hello", Some("note.txt")).unwrap();

    assert!(staged.path().starts_with(stager.root()));
    assert_eq!(staged.path().file_name(), Some("note.txt"));
    assert_eq!(std::fs::read(staged.path().as_std_path()).unwrap(), b"hello");
}

#[test]
fn same_name_never_collides() {
    let temp = tempfile::tempdir().unwrap();
    let stager = stager_in(&temp, "staging");

    let paths = std::thread::scope(|scope| {
        let stager = &stager;
        let workers = (0..24)
            .map(|idx| {
                scope.spawn(move || {
                    let body = format!("copy {idx}");
                    let staged = stager.stage(body.as_bytes(), Some("paper.pdf")).unwrap();
                    (staged.into_path(), body)
                })
            })
            .collect::<Vec<_>>();
        workers
            .into_iter()
            .map(|worker| worker.join().unwrap())
            .collect::<Vec<_>>()
    });

    let unique = paths.iter().map(|(path, _)| path).collect::<HashSet<_>>();
    assert_eq!(unique.len(), paths.len());
    for (path, body) in &paths {
        assert_eq!(std::fs::read_to_string(path.as_std_path()).unwrap(), *body);
    }
}

#[test]
fn remove_deletes_artifact_and_directory() {
    let temp = tempfile::tempdir().unwrap();
    let stager = stager_in(&temp, "staging");

    let staged = stager.stage(b"bytes", None).unwrap();
    let path = staged.path().to_path_buf();
    let dir = staged.staging_dir().to_path_buf();
    assert_eq!(path.file_name(), Some("document"));

    staged.remove().unwrap();
    assert!(!path.as_std_path().exists());
    assert!(!dir.as_std_path().exists());
    assert!(stager.root().as_std_path().exists());
}

#[test]
fn empty_content_is_staged() {
    let temp = tempfile::tempdir().unwrap();
    let stager = stager_in(&temp, "staging");

    let staged = stager.stage(&[], Some("empty.pdf")).unwrap();
    assert_eq!(std::fs::metadata(staged.path().as_std_path()).unwrap().len(), 0);
}

#[test]
fn root_that_is_a_file_is_a_filesystem_error() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("occupied"), b"x").unwrap();
    let stager = stager_in(&temp, "occupied");

    assert_matches!(
        stager.stage(b"bytes", Some("a.pdf")),
        Err(RefstashError::Filesystem(_))
    );
}
