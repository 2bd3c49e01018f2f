//! The coordinator's half of the map protocol.
//!
//! The coordinator owns the next index to dispatch and a count of workers still running.
//! It answers every `Start` and `Result` with the next index, and finishes once each
//! worker has sent `Stop`. Results are produced lazily, one receive at a time, as the
//! caller pulls on the iterator.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::communication::message::{Channel, Filter};
use crate::communication::{Communicate, Data, Rank, Source, TagFilter};
use crate::logging::{AbandonedEvent, DispatchEvent, DoneEvent, MapLogger, ResultEvent, StopEvent};
use crate::map::protocol::{MapTag, Outcome, TaskIndex, REPLY_TAG};
use crate::progress::Tracker;
use crate::{Error, Result};

/// Where the coordinator is in its receive loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Every worker is running; blocked on the next message.
    Waiting,
    /// Replying to a worker with its next index.
    Dispatching,
    /// Some workers have stopped; blocked on the next message.
    Draining,
    /// Every worker has stopped, or the protocol failed.
    Done,
}

/// The coordinator's protocol state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorState {
    /// The index the next `Start` or `Result` is answered with.
    pub next_index: TaskIndex,
    /// Workers that have not yet sent `Stop`.
    pub live_workers: usize,
    /// The current phase.
    pub phase: Phase,
    workers: usize,
    results: usize,
}

impl CoordinatorState {
    /// The initial state for `workers` workers.
    pub fn new(workers: usize) -> Self {
        CoordinatorState {
            next_index: 0,
            live_workers: workers,
            phase: if workers > 0 { Phase::Waiting } else { Phase::Done },
            workers,
            results: 0,
        }
    }

    /// Takes the next index to dispatch.
    fn dispatch(&mut self) -> TaskIndex {
        self.phase = Phase::Dispatching;
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Returns to waiting after a dispatch or a stop.
    fn settle(&mut self) {
        self.phase = if self.live_workers == 0 { Phase::Done }
                     else if self.live_workers < self.workers { Phase::Draining }
                     else { Phase::Waiting };
    }
}

/// What one received message amounts to.
enum Step<R> {
    Yield(Result<R>),
    Continue,
    Finished,
}

/// Drives the coordinator's receive loop, producing results as they arrive.
pub struct Coordinator<'a, C: Communicate, R> {
    comm: &'a mut C,
    state: CoordinatorState,
    progress: Tracker,
    logger: Option<MapLogger>,
    _marker: PhantomData<R>,
}

impl<'a, C: Communicate, R: Data> Coordinator<'a, C, R> {
    pub(crate) fn new(comm: &'a mut C, mut progress: Tracker, logger: Option<MapLogger>) -> Self {
        let state = CoordinatorState::new(comm.size() - 1);
        progress.busy(state.live_workers);
        Coordinator { comm, state, progress, logger, _marker: PhantomData }
    }

    /// The protocol state.
    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    /// Replies to `worker` with the next index, then advances it.
    fn reply(&mut self, worker: Rank) -> Result<()> {
        let index = self.state.dispatch();
        self.comm.send(&index, worker, REPLY_TAG)?;
        self.progress.increment();
        self.logger.as_ref().map(|l| l.log(DispatchEvent { worker: worker.index(), index }));
        self.state.settle();
        Ok(())
    }

    fn step(&mut self) -> Result<Step<R>> {
        let envelope = self.comm.fetch(&Filter::point(Source::Any, TagFilter::Any))?;
        let worker = envelope.source;
        let Channel::Point(tag) = envelope.channel else {
            unreachable!("point-to-point filters only match point-to-point traffic");
        };
        match MapTag::try_from(tag) {
            Ok(MapTag::Start) => {
                self.reply(worker)?;
                Ok(Step::Continue)
            },
            Ok(MapTag::Result) => {
                let (index, outcome): (TaskIndex, Outcome<R>) = envelope.decode()?;
                self.reply(worker)?;
                self.state.results += 1;
                self.logger.as_ref().map(|l| l.log(ResultEvent { worker: worker.index(), index, success: outcome.is_ok() }));
                Ok(Step::Yield(outcome.map_err(|failure| Error::Task { worker, index, failure })))
            },
            Ok(MapTag::Stop) => {
                self.state.live_workers = self.state.live_workers
                    .checked_sub(1)
                    .ok_or(Error::Protocol { tag, sender: worker })?;
                self.progress.busy(self.state.live_workers);
                self.logger.as_ref().map(|l| l.log(StopEvent { worker: worker.index(), live_workers: self.state.live_workers }));
                self.state.settle();
                if self.state.phase == Phase::Done {
                    assert_eq!(self.state.live_workers, 0);
                    self.progress.finish();
                    self.logger.as_ref().map(|l| l.log(DoneEvent { dispatched: self.state.next_index, results: self.state.results }));
                    Ok(Step::Finished)
                }
                else {
                    Ok(Step::Continue)
                }
            },
            Err(tag) => Err(Error::Protocol { tag, sender: worker }),
        }
    }
}

impl<C: Communicate, R: Data> Iterator for Coordinator<'_, C, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        while self.state.phase != Phase::Done {
            match self.step() {
                Ok(Step::Yield(result)) => return Some(result),
                Ok(Step::Continue) => { },
                Ok(Step::Finished) => return None,
                Err(error) => {
                    // The protocol cannot recover; report once and finish.
                    self.state.phase = Phase::Done;
                    return Some(Err(error));
                },
            }
        }
        None
    }
}

impl<C: Communicate, R: Data> FusedIterator for Coordinator<'_, C, R> { }

impl<C: Communicate, R> Drop for Coordinator<'_, C, R> {
    fn drop(&mut self) {
        if self.state.phase != Phase::Done {
            self.logger.as_ref().map(|l| l.log(AbandonedEvent {
                live_workers: self.state.live_workers,
                next_index: self.state.next_index,
            }));
        }
    }
}
