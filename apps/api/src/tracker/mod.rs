// Candidate Identity & Status Tracking Engine
// Implements: partition layout, record store, column contract, identity resolution,
// conflict classification and the first-come-first-serve status assignment.
// Every mutation is a full load -> resolve -> classify -> mutate -> persist cycle
// under the partition lock.

use std::path::PathBuf;

use thiserror::Error;

pub mod classifier;
pub mod conversion;
pub mod engine;
pub mod handlers;
pub mod identity;
pub mod lock;
pub mod partition;
pub mod schema;
pub mod store;
pub mod table;

pub use engine::{Submission, SubmitOutcome, Tracker, TrackerSettings};
pub use partition::Partition;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker file {path} could not be read: {reason}")]
    StoreUnreadable { path: PathBuf, reason: String },

    #[error("Tracker file not found: {0}")]
    StoreMissing(PathBuf),

    #[error("Tracker is empty: {0}")]
    StoreEmpty(PathBuf),

    #[error("Candidate not found in tracker")]
    CandidateNotFound,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write tracker file {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to lock partition {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TrackerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrackerError::Io {
            path: path.into(),
            source,
        }
    }
}
