//! Collective operations, for use around a distributed map.
//!
//! These forward to the communicator; they exist so that programs built on relay can
//! synchronize and share values without reaching into the communication crate. Every
//! participant must call the same collectives in the same order.

use crate::communication::{Communicate, Data, Rank};
use crate::Result;

/// Blocks until every participant has called `barrier`.
pub fn barrier<C: Communicate>(comm: &mut C) -> Result<()> {
    Ok(comm.barrier()?)
}

/// Distributes the value of `root` (the master, if `None`) to every participant.
pub fn broadcast<C: Communicate, T: Data>(comm: &mut C, value: T, root: Option<Rank>) -> Result<T> {
    Ok(comm.broadcast(value, root.unwrap_or(Rank::MASTER))?)
}

/// Collects every participant's value at `root` (the master, if `None`), in rank order.
///
/// Returns `Some` at the root and `None` elsewhere.
pub fn gather<C: Communicate, T: Data>(comm: &mut C, value: T, root: Option<Rank>) -> Result<Option<Vec<T>>> {
    Ok(comm.gather(value, root.unwrap_or(Rank::MASTER))?)
}
