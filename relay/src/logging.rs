//! Events describing the progress of a distributed map.
//!
//! A [`MapLogger`] supplied through [`MapConfig`](crate::MapConfig) receives the
//! coordinator's dispatch decisions and the workers' task applications.

use serde::{Deserialize, Serialize};

use crate::map::TaskIndex;

/// Logger for map events.
pub type MapLogger = crate::logging_core::Logger<MapEvent>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The coordinator assigned an index to a worker.
pub struct DispatchEvent {
    /// The worker receiving the index.
    pub worker: usize,
    /// The dispatched index.
    pub index: TaskIndex,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The coordinator received a task result.
pub struct ResultEvent {
    /// The reporting worker.
    pub worker: usize,
    /// The index of the task.
    pub index: TaskIndex,
    /// `false` if the function panicked.
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// A worker applied the function.
pub struct AppliedEvent {
    /// The index the worker was assigned.
    pub index: TaskIndex,
    /// The position of the element the function was applied to.
    pub position: usize,
    /// `false` if the function panicked.
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// A worker exhausted its sequence.
pub struct StopEvent {
    /// The stopping worker.
    pub worker: usize,
    /// Workers still running after this one stopped.
    pub live_workers: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The coordinator finished, every worker having stopped.
pub struct DoneEvent {
    /// Indices dispatched over the run.
    pub dispatched: usize,
    /// Results received over the run.
    pub results: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// The coordinator's results were dropped before every worker stopped.
pub struct AbandonedEvent {
    /// Workers left waiting for a reply.
    pub live_workers: usize,
    /// The index that would have been dispatched next.
    pub next_index: TaskIndex,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
/// An event of a distributed map.
pub enum MapEvent {
    /// Dispatch.
    Dispatch(DispatchEvent),
    /// Result.
    Result(ResultEvent),
    /// Applied.
    Applied(AppliedEvent),
    /// Stop.
    Stop(StopEvent),
    /// Done.
    Done(DoneEvent),
    /// Abandoned.
    Abandoned(AbandonedEvent),
}

impl From<DispatchEvent> for MapEvent { fn from(v: DispatchEvent) -> MapEvent { MapEvent::Dispatch(v) } }
impl From<ResultEvent> for MapEvent { fn from(v: ResultEvent) -> MapEvent { MapEvent::Result(v) } }
impl From<AppliedEvent> for MapEvent { fn from(v: AppliedEvent) -> MapEvent { MapEvent::Applied(v) } }
impl From<StopEvent> for MapEvent { fn from(v: StopEvent) -> MapEvent { MapEvent::Stop(v) } }
impl From<DoneEvent> for MapEvent { fn from(v: DoneEvent) -> MapEvent { MapEvent::Done(v) } }
impl From<AbandonedEvent> for MapEvent { fn from(v: AbandonedEvent) -> MapEvent { MapEvent::Abandoned(v) } }
