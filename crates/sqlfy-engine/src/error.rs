//! Pipeline error tiers
//!
//! [`PipelineError`] stops the run before any file is touched.
//! [`FileError`] belongs to one template; the run carries on (or stops scheduling,
//! under the fail-fast policy) and reports it.
//!
//! The `code()` strings appear in run reports. Never rename them.

use crate::discovery::DiscoveryError;
use crate::mapper::PathMappingError;
use sqlfy_core::ConfigError;
use sqlfy_template::TemplateError;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("couldn't find any '{extension}' file to convert in '{}'", .source_dir.display())]
    EmptyResult {
        source_dir: PathBuf,
        extension: String,
    },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Discovery(_) => "DISCOVERY_ERROR",
            Self::EmptyResult { .. } => "EMPTY_RESULT",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render '{}': {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("cannot place '{}': {source}", .path.display())]
    PathMapping {
        path: PathBuf,
        #[source]
        source: PathMappingError,
    },

    #[error("cannot write '{}' to '{}': {source}", .path.display(), .destination.display())]
    Write {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "READ_ERROR",
            Self::Render { .. } => "RENDER_ERROR",
            Self::PathMapping { .. } => "PATH_MAPPING_ERROR",
            Self::Write { .. } => "WRITE_ERROR",
        }
    }

    /// Template the error belongs to
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. }
            | Self::Render { path, .. }
            | Self::PathMapping { path, .. }
            | Self::Write { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let empty = PipelineError::EmptyResult {
            source_dir: PathBuf::from("src"),
            extension: ".tpl".to_string(),
        };
        assert_eq!(empty.code(), "EMPTY_RESULT");
        assert_eq!(
            empty.to_string(),
            "couldn't find any '.tpl' file to convert in 'src'"
        );

        let config = PipelineError::from(ConfigError::MissingField("dest_dir"));
        assert_eq!(config.code(), "CONFIG_ERROR");
        assert_eq!(config.to_string(), "config is missing required property 'dest_dir'");
    }

    #[test]
    fn file_error_identifies_template() {
        let err = FileError::Render {
            path: PathBuf::from("src/a.tpl"),
            source: TemplateError::Unterminated { line: 1, column: 4 },
        };
        assert_eq!(err.code(), "RENDER_ERROR");
        assert_eq!(err.path(), Path::new("src/a.tpl"));
        assert_eq!(
            err.to_string(),
            "cannot render 'src/a.tpl': unterminated placeholder at line 1, column 4"
        );
    }
}
