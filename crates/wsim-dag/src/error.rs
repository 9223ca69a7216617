//! Crate-local error type for input validation and parsing failures.
//!
//! Kernel invariant violations (past-event delivery, null destination, negative delay) are not represented here -
//! those remain hard panics inside `wsim-core`, per the "programming error, not a recoverable condition" split.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("file {0:?} has an empty name")]
    EmptyFileName(String),
    #[error("file {name:?} has negative or zero size {size}")]
    NonPositiveFileSize { name: String, size: i64 },
    #[error("task {0:?} has an empty name")]
    EmptyTaskName(String),
    #[error("task {name:?} has non-positive length {length}")]
    NonPositiveLength { name: String, length: i64 },
    #[error("unknown task id {0}")]
    UnknownTask(usize),
    #[error("unknown file {0:?}")]
    UnknownFile(String),
    #[error("edge would introduce a self-dependency on task {0}")]
    SelfDependency(usize),
    #[error("failed to read workflow file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} workflow from {path:?}: {message}")]
    Parse {
        format: &'static str,
        path: String,
        message: String,
    },
}

pub type DagResult<T> = Result<T, DagError>;
