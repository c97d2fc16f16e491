//! Errors surfaced by a mapreduce run.

use std::collections::TryReserveError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MRError>;

/// Which user callback an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Map,
    Combine,
    Reduce,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            CallbackKind::Map => "map",
            CallbackKind::Combine => "combine",
            CallbackKind::Reduce => "reduce",
        };
        f.write_str(name)
    }
}

/// Failures of the emit path. These are cheap to clone so that an emitter can both hand the
/// error back to the mapper and remember it for the engine.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    #[error("partitioner returned {index}, but there are only {partitions} partitions")]
    PartitionOutOfRange { index: usize, partitions: usize },

    #[error("could not grow partition {partition} beyond {capacity} pairs: {source}")]
    Allocation {
        partition: usize,
        capacity: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("lock of partition {partition} is poisoned")]
    Poisoned { partition: usize },
}

/// The terminal status of a failed run. Only the first failure of a run is reported.
#[derive(Debug, Error)]
pub enum MRError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{kind} callback failed: {source:#}")]
    Callback {
        kind: CallbackKind,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("values of key {key:?} were requested after the end of the group")]
    IteratorExhausted { key: String },
}

impl MRError {
    /// Wraps an error returned by a user callback. An `io::Error` at the root of a mapper's error
    /// becomes `MRError::Io` for the file being mapped; errors raised by the engine itself
    /// and passed through the callback with `?` are unwrapped again.
    pub(crate) fn from_callback(kind: CallbackKind, err: anyhow::Error, path: Option<&Path>) -> MRError {
        let err = match err.downcast::<MRError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };
        let err = match err.downcast::<EmitError>() {
            Ok(inner) => return MRError::Emit(inner),
            Err(err) => err,
        };
        match path {
            Some(path) => match err.downcast::<io::Error>() {
                Ok(source) => MRError::Io {
                    path: path.to_path_buf(),
                    source: source,
                },
                Err(source) => MRError::Callback {
                    kind: kind,
                    source: source,
                },
            },
            None => MRError::Callback {
                kind: kind,
                source: err,
            },
        }
    }
}
