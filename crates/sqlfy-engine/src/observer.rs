//! Progress notifications
//!
//! The pipeline reports every per-file event through a [`PipelineObserver`].
//! With concurrent conversion, events from different files may interleave.

use crate::error::FileError;
use std::path::{Path, PathBuf};

pub trait PipelineObserver: Send + Sync {
    fn on_discovered(&self, _files: &[PathBuf]) {}

    /// Nothing matched; the run ends with `PipelineError::EmptyResult`
    fn on_empty(&self, _source_dir: &Path, _extension: &str) {}

    fn on_converting(&self, _source: &Path) {}

    fn on_converted(&self, _source: &Path, _destination: &Path) {}

    fn on_failed(&self, _error: &FileError) {}

    /// Not started because a fail-fast run was cancelled
    fn on_skipped(&self, _source: &Path) {}
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_discovered(&self, files: &[PathBuf]) {
        tracing::info!(count = files.len(), "templates discovered");
    }

    fn on_empty(&self, source_dir: &Path, extension: &str) {
        tracing::warn!(source_dir = %source_dir.display(), extension, "no templates found");
    }

    fn on_converting(&self, source: &Path) {
        tracing::debug!(source = %source.display(), "converting");
    }

    fn on_converted(&self, source: &Path, destination: &Path) {
        tracing::info!(
            source = %source.display(),
            destination = %destination.display(),
            "converted"
        );
    }

    fn on_failed(&self, error: &FileError) {
        tracing::warn!(
            source = %error.path().display(),
            code = error.code(),
            %error,
            "conversion failed"
        );
    }

    fn on_skipped(&self, source: &Path) {
        tracing::debug!(source = %source.display(), "skipped after earlier failure");
    }
}
