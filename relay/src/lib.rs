//! Relay applies a function over a sequence, spread across a fixed set of participants that
//! communicate only by passing messages.
//!
//! The code is organized in crates and modules that depend as little as possible on each other.
//!
//! **Communication**: The [`relay_communication`] crate defines participants, their ranks, and
//! the message passing between them, whether as threads of one process or as processes
//! connected over TCP.
//!
//! **Logging**: The [`relay_logging`] crate defines buffered, typed loggers, used here to
//! record communication and map events.
//!
//! **The map**: The [`map`] module defines the coordinator/worker protocol behind
//! [`map_unordered`]. The master participant coordinates and receives the results, in the
//! order they complete; the other participants compute.
//!
//! # Examples
//!
//! The following squares numbers on four participants.
//!
//! ```
//! use relay::communication::{Communicate, Config};
//!
//! // start four participants, as threads of this process.
//! let guards = relay::execute(Config::Process(4), |comm| {
//!
//!     // every participant supplies the same sequence.
//!     let results = relay::map_unordered(comm, |x: u64| x * x, 1 ..= 9, false).unwrap();
//!
//!     // only the master receives results; the order is not defined.
//!     let mut squares: Vec<u64> = results.map(|result| result.unwrap()).collect();
//!     squares.sort();
//!     squares
//! }).unwrap();
//!
//! let results = relay::join(guards).unwrap();
//! assert_eq!(results[0], vec![1, 4, 9, 16, 25, 36, 49, 64, 81]);
//! ```
//!
//! The program uses `relay::execute` to start participants and hands each a communicator.
//! Each calls `map_unordered` with the same function and sequence; the master's call returns an
//! iterator that must be drained, as workers wait on the master for their next task.

#![forbid(missing_docs)]

pub use execute::{execute, execute_directly, join};
#[cfg(feature = "getopts")]
pub use execute::execute_from_args;
pub use error::{Error, Result};
pub use map::{map_unordered, map_unordered_slice, map_unordered_with, MapConfig, MapUnordered, TaskIndex};

pub use relay_communication::Config as CommunicationConfig;

/// Re-export of the `relay_communication` crate.
pub mod communication {
    pub use relay_communication::*;
}

/// Re-export of the `relay_logging` crate.
pub mod logging_core {
    pub use relay_logging::*;
}

pub mod collective;
pub mod error;
pub mod execute;
pub mod logging;
pub mod map;
pub mod progress;
