//! Destination path mapping
//!
//! `src/a/b.tpl` under source root `src` and destination root `dist` becomes
//! `dist/a/b.sql`: the subtree below the source root is kept and the extension
//! is always replaced with `.sql`.

use std::path::{Component, Path, PathBuf};

/// Extension of every rendered file
pub const OUTPUT_EXTENSION: &str = "sql";

#[derive(Debug, thiserror::Error)]
pub enum PathMappingError {
    #[error("'{}' is not inside source directory '{}'", .file.display(), .root.display())]
    OutsideRoot { file: PathBuf, root: PathBuf },

    #[error("'{}' does not name a file below the source directory", .file.display())]
    NotAFile { file: PathBuf },

    #[error("cannot resolve '{}' without a working directory", .file.display())]
    NoBaseDirectory { file: PathBuf },
}

/// Maps template paths under one source root to output paths under one destination root
#[derive(Debug, Clone)]
pub struct DestinationMapper {
    source_root: PathBuf,
    dest_root: PathBuf,
    /// Anchors relative paths when mixed with absolute ones
    base: Option<PathBuf>,
}

impl DestinationMapper {
    /// Mapper anchored at the current working directory
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            base: std::env::current_dir().ok(),
        }
    }

    /// Mapper anchored at an explicit base directory
    pub fn with_base(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            base: Some(base.into()),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Output path for a template under the source root
    pub fn map(&self, source_file: &Path) -> Result<PathBuf, PathMappingError> {
        // Compare like with like: both relative, or both absolute
        let (file, root) = if source_file.is_absolute() == self.source_root.is_absolute() {
            (normalize(source_file), normalize(&self.source_root))
        } else {
            let base = self.base.as_ref().ok_or_else(|| PathMappingError::NoBaseDirectory {
                file: source_file.to_path_buf(),
            })?;
            (
                normalize(&base.join(source_file)),
                normalize(&base.join(&self.source_root)),
            )
        };

        let relative = file
            .strip_prefix(&root)
            .map_err(|_| PathMappingError::OutsideRoot {
                file: source_file.to_path_buf(),
                root: self.source_root.clone(),
            })?;

        if relative.file_name().is_none() {
            return Err(PathMappingError::NotAFile {
                file: source_file.to_path_buf(),
            });
        }

        let mut destination = normalize(&self.dest_root).join(relative);
        destination.set_extension(OUTPUT_EXTENSION);
        Ok(destination)
    }
}

/// Output path for `source_file`, see [`DestinationMapper::map`]
pub fn map_path(
    source_file: &Path,
    source_root: &Path,
    dest_root: &Path,
) -> Result<PathBuf, PathMappingError> {
    DestinationMapper::new(source_root, dest_root).map(source_file)
}

/// Lexical cleanup: drops `.` and folds `name/..`; the filesystem is not consulted
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    out
}
