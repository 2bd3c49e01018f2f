//! A generic communicator, wrapping known implementors of `Communicate`.
//!
//! This type is useful in settings where it is difficult to write code generic in `C: Communicate`,
//! for example closures whose type arguments must be specified.

use crate::communicator::{Communicate, CommunicateBuilder, Thread, Process, Cluster, ClusterBuilder};
use crate::message::{Envelope, Filter};
use crate::{Rank, Result};

/// Enumerates known implementors of `Communicate`.
/// Passes trait method calls on to members.
pub enum Generic {
    /// Single participant communicator.
    Thread(Thread),
    /// Inter-thread, intra-process communicator.
    Process(Process),
    /// Inter-process communicator.
    Cluster(Cluster),
}

impl Communicate for Generic {
    fn rank(&self) -> Rank {
        match self {
            Generic::Thread(t) => t.rank(),
            Generic::Process(p) => p.rank(),
            Generic::Cluster(c) => c.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            Generic::Thread(t) => t.size(),
            Generic::Process(p) => p.size(),
            Generic::Cluster(c) => c.size(),
        }
    }
    fn post(&mut self, target: Rank, envelope: Envelope) -> Result<()> {
        match self {
            Generic::Thread(t) => t.post(target, envelope),
            Generic::Process(p) => p.post(target, envelope),
            Generic::Cluster(c) => c.post(target, envelope),
        }
    }
    fn fetch(&mut self, filter: &Filter) -> Result<Envelope> {
        match self {
            Generic::Thread(t) => t.fetch(filter),
            Generic::Process(p) => p.fetch(filter),
            Generic::Cluster(c) => c.fetch(filter),
        }
    }
    fn barrier(&mut self) -> Result<()> {
        match self {
            Generic::Thread(t) => t.barrier(),
            Generic::Process(p) => p.barrier(),
            Generic::Cluster(c) => c.barrier(),
        }
    }
}

/// Enumerations of constructable implementors of `Communicate`.
///
/// The builder variants are meant to be `Send`, so that they can be moved across threads,
/// whereas the communicator they construct may not. As an example, the `Cluster` type
/// contains an `Rc` wrapped logger, and so cannot itself be moved across threads.
pub enum GenericBuilder {
    /// Builder for `Thread` communicator.
    Thread(Thread),
    /// Builder for `Process` communicator.
    Process(Process),
    /// Builder for `Cluster` communicator.
    Cluster(ClusterBuilder),
}

impl CommunicateBuilder for GenericBuilder {
    type Communicator = Generic;
    fn build(self) -> Generic {
        match self {
            GenericBuilder::Thread(t) => Generic::Thread(t.build()),
            GenericBuilder::Process(p) => Generic::Process(p.build()),
            GenericBuilder::Cluster(c) => Generic::Cluster(c.build()),
        }
    }
}
