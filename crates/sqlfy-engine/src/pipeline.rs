//! Conversion pipeline
//!
//! validate config -> discover -> for each file (concurrently): read, render, map, write.
//!
//! Per-file failures are isolated by default: every other file is still converted
//! and the failure lands in the run report. With `FailurePolicy::FailFast`, files
//! not yet started when a failure happens are skipped instead (in-flight ones finish).

use crate::discovery::discover;
use crate::error::{FileError, PipelineError};
use crate::mapper::DestinationMapper;
use crate::observer::PipelineObserver;
use sqlfy_core::{Config, FailurePolicy, FileOutcome, RunReport};
use sqlfy_template::{ContextFactory, TemplateRenderer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// One conversion run over a fixed configuration
pub struct Pipeline {
    config: Config,
}

enum Pending {
    Running(PathBuf, JoinHandle<FileOutcome>),
    Skipped(PathBuf),
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Convert every template
    ///
    /// `Err` means nothing was converted (bad config, unreadable source directory,
    /// no templates). `Ok` carries one outcome per template in discovery order;
    /// check [`RunReport::has_failures`] for per-file errors.
    pub async fn run(&self, observer: Arc<dyn PipelineObserver>) -> Result<RunReport, PipelineError> {
        let config = &self.config;
        config.validate()?;
        let factory = Arc::new(ContextFactory::from_config(config)?);

        let source_root = config.source_path();
        let files = discover(&source_root, &config.template_extension)?;

        if files.is_empty() {
            observer.on_empty(&source_root, &config.template_extension);
            return Err(PipelineError::EmptyResult {
                source_dir: source_root,
                extension: config.template_extension.clone(),
            });
        }

        observer.on_discovered(&files);

        let mapper = Arc::new(DestinationMapper::new(source_root, config.dest_path()));
        let jobs = config.effective_jobs();
        let fail_fast = config.failure_policy == FailurePolicy::FailFast;
        let semaphore = Arc::new(Semaphore::new(jobs));
        let cancelled = Arc::new(AtomicBool::new(false));

        tracing::debug!(files = files.len(), jobs, fail_fast, "starting conversion");

        let mut pending = Vec::with_capacity(files.len());

        for source in files {
            // Waiting here bounds concurrency and keeps start order = discovery order.
            // The semaphore is never closed, so only cancellation skips a file.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) if !cancelled.load(Ordering::SeqCst) => permit,
                _ => {
                    observer.on_skipped(&source);
                    pending.push(Pending::Skipped(source));
                    continue;
                }
            };

            let task = tokio::spawn({
                let source = source.clone();
                let mapper = Arc::clone(&mapper);
                let factory = Arc::clone(&factory);
                let observer = Arc::clone(&observer);
                let cancelled = Arc::clone(&cancelled);

                async move {
                    let _permit = permit;
                    observer.on_converting(&source);

                    match convert_file(&source, &mapper, &factory).await {
                        Ok(destination) => {
                            observer.on_converted(&source, &destination);
                            FileOutcome::converted(source, destination)
                        }
                        Err(error) => {
                            if fail_fast {
                                cancelled.store(true, Ordering::SeqCst);
                            }
                            observer.on_failed(&error);
                            FileOutcome::failed(source, error.code(), error.to_string())
                        }
                    }
                }
            });

            pending.push(Pending::Running(source, task));
        }

        let mut report = RunReport::new();
        for entry in pending {
            let outcome = match entry {
                Pending::Skipped(source) => FileOutcome::skipped(source),
                Pending::Running(source, task) => match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => FileOutcome::failed(source, "INTERNAL_ERROR", e.to_string()),
                },
            };
            report.add_outcome(outcome);
        }

        tracing::info!(
            discovered = report.summary.discovered,
            converted = report.summary.converted,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "run finished"
        );

        Ok(report)
    }
}

/// Read, render, map and write one template
async fn convert_file(
    source: &Path,
    mapper: &DestinationMapper,
    factory: &ContextFactory,
) -> Result<PathBuf, FileError> {
    let text = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| FileError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

    let rendered = {
        let context = factory.build();
        TemplateRenderer::render(&text, &context).map_err(|e| FileError::Render {
            path: source.to_path_buf(),
            source: e,
        })?
    };

    let destination = mapper.map(source).map_err(|e| FileError::PathMapping {
        path: source.to_path_buf(),
        source: e,
    })?;

    let write_error = |e: std::io::Error| FileError::Write {
        path: source.to_path_buf(),
        destination: destination.clone(),
        source: e,
    };

    // create_dir_all treats an existing directory as success, so concurrent
    // tasks sharing a parent are fine
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(&destination, rendered)
        .await
        .map_err(write_error)?;

    Ok(destination)
}
