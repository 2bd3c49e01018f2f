//! The worker's half of the map protocol.

use std::panic::{self, AssertUnwindSafe};

use crate::communication::message::{Channel, Envelope};
use crate::communication::{Communicate, Data, Rank, Source, TagFilter};
use crate::logging::{AppliedEvent, MapLogger};
use crate::map::protocol::{MapTag, Outcome, TaskFailure, TaskIndex, REPLY_TAG};
use crate::Result;

/// Sends `Stop` to the coordinator when dropped, however the worker exits.
struct StopGuard<'a, C: Communicate> {
    comm: &'a mut C,
}

impl<'a, C: Communicate> StopGuard<'a, C> {
    /// Announces the worker with `Start`.
    fn start(comm: &'a mut C) -> Result<Self> {
        comm.send(&(), Rank::MASTER, MapTag::Start.into())?;
        Ok(StopGuard { comm })
    }

    /// Blocks for the coordinator's next index.
    fn next_index(&mut self) -> Result<TaskIndex> {
        Ok(self.comm.receive(Source::Exact(Rank::MASTER), TagFilter::Exact(REPLY_TAG))?.payload)
    }

    /// Reports the outcome of task `index`, and whether it reported a success.
    ///
    /// A result that cannot be encoded is reported as a failure of the task.
    fn report<R: Data>(&mut self, index: TaskIndex, outcome: Outcome<R>) -> Result<bool> {
        let source = self.comm.rank();
        let channel = Channel::Point(MapTag::Result.into());
        let success = outcome.is_ok();
        let (envelope, success) = match Envelope::encode(source, channel, &(index, outcome)) {
            Ok(envelope) => (envelope, success),
            Err(error) => {
                let failure: Outcome<R> = Err(TaskFailure { message: format!("result could not be encoded: {}", error) });
                (Envelope::encode(source, channel, &(index, failure))?, false)
            },
        };
        self.comm.post(Rank::MASTER, envelope)?;
        Ok(success)
    }
}

impl<C: Communicate> Drop for StopGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(error) = self.comm.send(&(), Rank::MASTER, MapTag::Stop.into()) {
            eprintln!("participant {}:\tfailed to send stop: {}", self.comm.rank(), error);
        }
    }
}

/// Applies `func` to `item`, catching a panic as a failed outcome.
fn apply<T, R, F: FnMut(T) -> R>(func: &mut F, item: T) -> Outcome<R> {
    panic::catch_unwind(AssertUnwindSafe(|| func(item))).map_err(TaskFailure::from_panic)
}

fn log_applied(logger: Option<&MapLogger>, index: TaskIndex, position: usize, success: bool) {
    logger.map(|l| l.log(AppliedEvent { index, position, success }));
}

/// Works through `sequence`, applying `func` to the elements at the indices the
/// coordinator assigns.
///
/// The sequence is enumerated once: elements before the pending index are skipped,
/// and the worker returns once the enumeration is exhausted.
pub(crate) fn run<C, I, F, R>(comm: &mut C, mut func: F, sequence: I, logger: Option<&MapLogger>) -> Result<()>
where
    C: Communicate,
    I: IntoIterator,
    F: FnMut(I::Item) -> R,
    R: Data,
{
    let mut guard = StopGuard::start(comm)?;
    let mut pending = guard.next_index()?;
    for (position, item) in sequence.into_iter().enumerate() {
        if position == pending {
            let outcome = apply(&mut func, item);
            let success = guard.report(pending, outcome)?;
            log_applied(logger, pending, position, success);
            pending = guard.next_index()?;
        }
    }
    Ok(())
}

/// Applies `func` to `sequence[index]` for each index the coordinator assigns, until
/// an index falls past the end of `sequence`.
pub(crate) fn run_indexed<C, T, F, R>(comm: &mut C, mut func: F, sequence: &[T], logger: Option<&MapLogger>) -> Result<()>
where
    C: Communicate,
    F: FnMut(&T) -> R,
    R: Data,
{
    let mut guard = StopGuard::start(comm)?;
    loop {
        let index = guard.next_index()?;
        let Some(item) = sequence.get(index) else { break };
        let outcome = apply(&mut func, item);
        let success = guard.report(index, outcome)?;
        log_applied(logger, index, index, success);
    }
    Ok(())
}
