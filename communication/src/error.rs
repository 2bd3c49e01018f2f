//! Errors raised by communicators and their configuration.

use std::io;

use thiserror::Error;

/// Failures of the communication layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The environment announces several participants, but only one is configured.
    #[error("environment variable {variable} announces {size} participants, but the communicator is single-participant")]
    EnvironmentMismatch {
        /// The variable that announced the size.
        variable: String,
        /// The announced number of participants.
        size: usize,
    },
    /// A rank outside `0 .. size` was addressed.
    #[error("rank {rank} addressed, but there are only {size} participants")]
    InvalidRank {
        /// The offending rank.
        rank: usize,
        /// The number of participants.
        size: usize,
    },
    /// The channel to or from a participant has closed.
    #[error("participant {rank} is no longer reachable")]
    Disconnected {
        /// The unreachable participant.
        rank: usize,
    },
    /// A lone participant waits for a message that nobody can send.
    #[error("receive can never complete: no participant can send a matching message")]
    Deadlock,
    /// A connecting peer did not speak the relay handshake.
    #[error("connection handshake failed: {0}")]
    Handshake(String),
    /// The supplied configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Socket or file failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Payload encoding or decoding failure.
    #[error(transparent)]
    Codec(#[from] bincode::Error),
}

/// Results of the communication layer.
pub type Result<T> = std::result::Result<T, Error>;
