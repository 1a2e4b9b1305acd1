//! Template discovery and conversion pipeline
//!
//! This crate handles:
//! - Finding templates under the source directory (by extension)
//! - Mapping each template to its `.sql` path under the destination directory
//! - Rendering and writing files concurrently, with per-file failure reporting
//! - Separating batch-fatal errors (config, discovery, empty result) from per-file ones

pub mod discovery;
pub mod error;
pub mod mapper;
pub mod observer;
pub mod pipeline;

pub use discovery::{discover, DiscoveryError};
pub use error::{FileError, PipelineError};
pub use mapper::{map_path, DestinationMapper, PathMappingError, OUTPUT_EXTENSION};
pub use observer::{NoopObserver, PipelineObserver, TracingObserver};
pub use pipeline::Pipeline;
