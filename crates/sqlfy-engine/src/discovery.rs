//! Recursive template discovery

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The source directory could not be scanned. Always batch-fatal.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("source directory '{}' does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("source path '{}' is not a directory", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("cannot access source directory '{}': {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read '{}': {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Every regular file under `root` whose extension equals `extension`
///
/// `extension` includes the leading dot and is compared case-sensitively.
/// Traversal is depth-first in directory-listing order; callers must not rely
/// on any particular ordering. An empty result is not an error.
pub fn discover(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    match std::fs::metadata(root) {
        Ok(meta) if !meta.is_dir() => {
            return Err(DiscoveryError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DiscoveryError::NotFound {
                path: root.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(DiscoveryError::Inaccessible {
                path: root.to_path_buf(),
                source,
            })
        }
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| DiscoveryError::Unreadable {
            path: source
                .path()
                .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            source,
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            tracing::debug!(path = %entry.path().display(), "discovered template");
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Extension check with the leading dot, so `.sql` matches `a.sql` but not `sql` or `a.SQL`
fn has_extension(path: &Path, extension: &str) -> bool {
    match path.extension() {
        Some(ext) => extension
            .strip_prefix('.')
            .is_some_and(|wanted| ext.to_str() == Some(wanted)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn relative_set(root: &Path, files: Vec<PathBuf>) -> BTreeSet<String> {
        files
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn finds_matching_files_recursively() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.tpl");
        touch(dir.path(), "b.sql");
        touch(dir.path(), "nested/c.tpl");
        touch(dir.path(), "nested/deeper/d.tpl");
        touch(dir.path(), "nested/deeper/e.tpl.bak");

        let found = discover(dir.path(), ".tpl").unwrap();
        let expected: BTreeSet<String> = ["a.tpl", "nested/c.tpl", "nested/deeper/d.tpl"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(relative_set(dir.path(), found), expected);
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "upper.SQL");
        touch(dir.path(), "lower.sql");

        let found = discover(dir.path(), ".sql").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("lower.sql"));
    }

    #[test]
    fn directories_named_like_templates_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("looks_like.tpl")).unwrap();
        touch(dir.path(), "looks_like.tpl/inner.tpl");

        let found = discover(dir.path(), ".tpl").unwrap();
        assert_eq!(
            relative_set(dir.path(), found),
            BTreeSet::from(["looks_like.tpl/inner.tpl".to_string()])
        );
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "readme.md");
        assert!(discover(dir.path(), ".tpl").unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let err = discover(&dir.path().join("nope"), ".tpl").unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn inaccessible_root_reports_io_cause() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = discover(&locked.join("src"), ".tpl");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users bypass permission bits and just see a missing directory
        match result.unwrap_err() {
            DiscoveryError::Inaccessible { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            DiscoveryError::NotFound { .. } => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_in_root_path_is_inaccessible() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.tpl");
        let err = discover(&dir.path().join("file.tpl").join("src"), ".tpl").unwrap_err();
        assert!(matches!(err, DiscoveryError::Inaccessible { .. }));
        assert!(err.to_string().starts_with("cannot access source directory"));
    }

    #[test]
    fn file_root_is_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "file.tpl");
        let err = discover(&dir.path().join("file.tpl"), ".tpl").unwrap_err();
        assert!(matches!(err, DiscoveryError::NotADirectory { .. }));
    }

    #[test]
    fn has_extension_requires_dot() {
        assert!(has_extension(Path::new("a/b.sql"), ".sql"));
        assert!(!has_extension(Path::new("a/b.sql"), "sql"));
        assert!(!has_extension(Path::new("a/.sql"), ".sql"));
        assert!(has_extension(Path::new("a/b.tar.sql"), ".sql"));
    }
}
