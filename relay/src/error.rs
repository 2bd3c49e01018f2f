//! Errors surfaced by the distributed map.

use thiserror::Error;

use crate::communication::{Rank, Tag};
use crate::map::{TaskFailure, TaskIndex};

/// Failures of a distributed map.
#[derive(Debug, Error)]
pub enum Error {
    /// The communication layer failed.
    #[error(transparent)]
    Communication(#[from] crate::communication::Error),
    /// The coordinator received a message that is not part of the protocol.
    #[error("unexpected tag {tag} from participant {sender}")]
    Protocol {
        /// The offending tag.
        tag: Tag,
        /// The participant that sent it.
        sender: Rank,
    },
    /// The function panicked while a worker applied it.
    #[error("task {index} on participant {worker} {failure}")]
    Task {
        /// The worker that ran the task.
        worker: Rank,
        /// The position of the element in the sequence.
        index: TaskIndex,
        /// What went wrong.
        failure: TaskFailure,
    },
    /// A participant thread ended abnormally.
    #[error("participant failed: {0}")]
    Participant(String),
}

/// Results of a distributed map.
pub type Result<T> = std::result::Result<T, Error>;
