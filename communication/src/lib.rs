//! Rank-addressed message passing between a fixed set of participants.
//!
//! This crate is the communication layer of relay. Every participant owns a communicator
//! implementing [`Communicate`], which reports the participant's [`Rank`] and the number of
//! participants, and offers a barrier, point-to-point sends, filtered receives, and the
//! `broadcast` and `gather` collectives.
//!
//! Communicators come in three flavors, all wrapped by [`Generic`]: a single-participant
//! [`Thread`] communicator, a [`Process`] communicator connecting participants that run as
//! threads of one process, and a [`Cluster`] communicator connecting one participant per
//! process over TCP. Which one is used is decided once, by the [`Config`] handed to
//! [`initialize`].
//!
//! Messages between any pair of participants are delivered in the order they were sent,
//! among the messages matched by a receive's filters. Payloads are any type implementing
//! [`Data`], and travel as `bincode`-encoded bytes.
//!
//! # Examples
//! ```
//! use relay_communication::{Communicate, Config, Rank, Source, TagFilter};
//!
//! // four participants, as threads of this process.
//! let guards = relay_communication::initialize(Config::Process(4), |mut comm| {
//!
//!     // everyone reports to the master, who adds things up.
//!     let index = comm.rank().index();
//!     comm.send(&index, Rank::MASTER, 7).unwrap();
//!
//!     if comm.is_master() {
//!         let mut total = 0;
//!         for _ in 0 .. comm.size() {
//!             let received = comm.receive::<usize>(Source::Any, TagFilter::Exact(7)).unwrap();
//!             total += received.payload;
//!         }
//!         Some(total)
//!     }
//!     else {
//!         None
//!     }
//! });
//!
//! let results = guards.unwrap().join();
//! assert_eq!(results[0].as_ref().unwrap(), &Some(6));
//! ```

#![forbid(missing_docs)]

pub mod communicator;
pub mod error;
pub mod initialize;
pub mod logging;
pub mod mailbox;
pub mod message;
pub mod networking;
pub mod rank;

pub use communicator::{Communicate, CommunicateBuilder, Generic, GenericBuilder, Thread, Process, Cluster};
pub use error::{Error, Result};
pub use initialize::{initialize, Config, WorkerGuards};
pub use message::{Received, Source, Tag, TagFilter};
pub use rank::Rank;

use serde::{de::DeserializeOwned, Serialize};

/// A composite trait for types that may be communicated between participants.
pub trait Data: Serialize + DeserializeOwned + 'static { }
impl<T: Serialize + DeserializeOwned + 'static> Data for T { }
