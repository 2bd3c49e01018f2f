//! Communicators: the interface a participant has to the other participants.

pub use self::thread::Thread;
pub use self::process::Process;
pub use self::cluster::{Cluster, ClusterBuilder};
pub use self::generic::{Generic, GenericBuilder};

pub mod thread;
pub mod process;
pub mod cluster;
pub mod generic;

use crate::message::{Channel, Collective, Envelope, Filter, Received, Source, Tag, TagFilter};
use crate::{Data, Error, Rank, Result};

/// A type capable of constructing a communicator.
///
/// Builders are sent to the thread that will run the participant, and build the
/// communicator there. This allows communicators to hold state that cannot move
/// between threads.
pub trait CommunicateBuilder: Send {
    /// The type of communicator built.
    type Communicator: Communicate;
    /// Builds the communicator, consuming the builder.
    fn build(self) -> Self::Communicator;
}

/// The interface a participant has to the rest of the participants.
///
/// Implementors provide the rank and size, and the transport of envelopes (`post` and
/// `fetch`). Typed point-to-point messaging and the collectives are provided in terms
/// of these, and may be overridden where an implementation can do better.
///
/// All participants must call the collectives (`barrier`, `broadcast`, `gather`) in the
/// same order; things go wrong otherwise.
pub trait Communicate {
    /// The rank of this participant, out of `0 .. self.size()`.
    fn rank(&self) -> Rank;
    /// The number of participants.
    fn size(&self) -> usize;
    /// Delivers `envelope` to the participant `target`.
    fn post(&mut self, target: Rank, envelope: Envelope) -> Result<()>;
    /// Blocks until an envelope matching `filter` arrives, and returns it.
    ///
    /// Envelopes from one participant are returned in the order they were posted,
    /// among those that `filter` matches.
    fn fetch(&mut self, filter: &Filter) -> Result<Envelope>;

    /// True for the master participant, rank zero.
    fn is_master(&self) -> bool { self.rank().is_master() }

    /// Errors if `rank` does not address a participant.
    fn check_rank(&self, rank: Rank) -> Result<()> {
        if rank.index() < self.size() { Ok(()) }
        else { Err(Error::InvalidRank { rank: rank.index(), size: self.size() }) }
    }

    /// Blocks until every participant has called `barrier`.
    fn barrier(&mut self) -> Result<()> {
        if self.is_master() {
            for rank in Rank::all(self.size()).skip(1) {
                self.fetch(&Filter::collective(rank, Collective::Arrive))?;
            }
            for rank in Rank::all(self.size()).skip(1) {
                post_collective(self, rank, Collective::Release, &())?;
            }
        }
        else {
            post_collective(self, Rank::MASTER, Collective::Arrive, &())?;
            self.fetch(&Filter::collective(Rank::MASTER, Collective::Release))?;
        }
        Ok(())
    }

    /// Sends `value` to `target` with tag `tag`.
    fn send<T: Data>(&mut self, value: &T, target: Rank, tag: Tag) -> Result<()> {
        self.check_rank(target)?;
        let envelope = Envelope::encode(self.rank(), Channel::Point(tag), value)?;
        self.post(target, envelope)
    }

    /// Blocks until a message selected by `source` and `tag` arrives, and decodes it.
    fn receive<T: Data>(&mut self, source: Source, tag: TagFilter) -> Result<Received<T>> {
        if let Source::Exact(rank) = source {
            self.check_rank(rank)?;
        }
        let envelope = self.fetch(&Filter::point(source, tag))?;
        let Channel::Point(tag) = envelope.channel else {
            unreachable!("point-to-point filters only match point-to-point traffic");
        };
        Ok(Received { payload: envelope.decode()?, source: envelope.source, tag })
    }

    /// Distributes the `root` participant's `value` to every participant.
    ///
    /// Values supplied by participants other than `root` are ignored.
    fn broadcast<T: Data>(&mut self, value: T, root: Rank) -> Result<T> {
        self.check_rank(root)?;
        if self.rank() == root {
            for rank in Rank::all(self.size()).filter(|rank| *rank != root) {
                post_collective(self, rank, Collective::Broadcast, &value)?;
            }
            Ok(value)
        }
        else {
            self.fetch(&Filter::collective(root, Collective::Broadcast))?.decode()
        }
    }

    /// Collects every participant's `value` at `root`, in rank order.
    ///
    /// Returns `Some` at `root` and `None` elsewhere.
    fn gather<T: Data>(&mut self, value: T, root: Rank) -> Result<Option<Vec<T>>> {
        self.check_rank(root)?;
        if self.rank() == root {
            let mut gathered = Vec::with_capacity(self.size());
            for rank in Rank::all(self.size()).filter(|rank| *rank != root) {
                gathered.push(self.fetch(&Filter::collective(rank, Collective::Gather))?.decode()?);
            }
            gathered.insert(root.index(), value);
            Ok(Some(gathered))
        }
        else {
            post_collective(self, root, Collective::Gather, &value)?;
            Ok(None)
        }
    }
}

fn post_collective<C, T>(comm: &mut C, target: Rank, collective: Collective, value: &T) -> Result<()>
where
    C: Communicate + ?Sized,
    T: Data,
{
    let envelope = Envelope::encode(comm.rank(), Channel::Collective(collective), value)?;
    comm.post(target, envelope)
}
