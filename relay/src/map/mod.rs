//! Lazy, unordered, distributed application of a function over a shared sequence.
//!
//! Every participant calls the same map function with an identically enumerating
//! sequence. The master participant coordinates: it hands out positions in the sequence
//! to the other participants, the workers, which apply the function to the elements at
//! those positions and report back. The master's call returns an iterator over results
//! in the order they complete; the workers' calls return once their sequences are
//! exhausted, with an empty iterator.
//!
//! With a single participant, the function is applied in place and results come back in
//! sequence order. A single participant fails with
//! [`EnvironmentMismatch`](crate::communication::Error::EnvironmentMismatch) if a process
//! launcher announces that it started several.
//!
//! # Caller discipline
//!
//! The master must drain the returned iterator. Workers block until the coordinator
//! answers them, and the coordinator answers only while its iterator is being pulled
//! on; dropping the iterator early leaves every remaining worker blocked.

pub mod coordinator;
pub mod protocol;
mod worker;

use std::iter::FusedIterator;

pub use self::coordinator::{Coordinator, CoordinatorState, Phase};
pub use self::protocol::{MapTag, Outcome, TaskFailure, TaskIndex, REPLY_TAG};

use crate::communication::{Communicate, Config, Data};
use crate::logging::MapLogger;
use crate::progress::{self, Progress, Silent, Tracker};
use crate::Result;

/// Configures the reporting of a distributed map.
pub struct MapConfig {
    /// Receives progress reports on the participant that consumes results.
    pub progress: Box<dyn Progress>,
    /// Receives events on every participant.
    pub logger: Option<MapLogger>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig { progress: Box::new(Silent), logger: None }
    }
}

impl MapConfig {
    /// Reports progress to `progress`.
    pub fn progress<P: Progress + 'static>(mut self, progress: P) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Logs events to `logger`.
    pub fn logger(mut self, logger: MapLogger) -> Self {
        self.logger = Some(logger);
        self
    }
}

enum Mode<'a, C: Communicate, R> {
    Sequential {
        results: Box<dyn Iterator<Item = R> + 'a>,
        progress: Tracker,
    },
    Coordinator(Coordinator<'a, C, R>),
    Finished,
}

/// The results of a distributed map, in the order they complete.
///
/// On a worker the iterator is empty. See the [module documentation](self) for why the
/// coordinator's iterator must be drained.
pub struct MapUnordered<'a, C: Communicate, R> {
    mode: Mode<'a, C, R>,
}

impl<C: Communicate, R: Data> Iterator for MapUnordered<'_, C, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        match &mut self.mode {
            Mode::Sequential { results, progress } => {
                if let Some(result) = results.next() {
                    progress.increment();
                    return Some(Ok(result));
                }
                progress.finish();
                self.mode = Mode::Finished;
                None
            },
            Mode::Coordinator(coordinator) => coordinator.next(),
            Mode::Finished => None,
        }
    }
}

impl<C: Communicate, R: Data> FusedIterator for MapUnordered<'_, C, R> { }

/// The length of an iterator, when it reports one exactly.
fn exact_len<I: Iterator>(iter: &I) -> Option<usize> {
    match iter.size_hint() {
        (lower, Some(upper)) if lower == upper => Some(lower),
        _ => None,
    }
}

/// Applies `func` to each element of `sequence`, spread across the participants of `comm`.
///
/// Every participant must call `map_unordered` with a sequence enumerating the same elements
/// in the same order. When `progress` is set, the master shows a terminal progress bar.
///
/// # Examples
/// ```
/// use relay::communication::Config;
///
/// let guards = relay::execute(Config::Process(3), |comm| {
///     let results = relay::map_unordered(comm, |x: u64| x * x, 1 ..= 6, false).unwrap();
///     let mut squares = results.map(Result::unwrap).collect::<Vec<_>>();
///     squares.sort();
///     squares
/// }).unwrap();
///
/// let results = relay::join(guards).unwrap();
/// assert_eq!(results[0], vec![1, 4, 9, 16, 25, 36]);
/// assert!(results[1].is_empty());
/// ```
pub fn map_unordered<'a, C, I, F, R>(comm: &'a mut C, func: F, sequence: I, progress: bool) -> Result<MapUnordered<'a, C, R>>
where
    C: Communicate,
    I: IntoIterator,
    I::IntoIter: 'a,
    F: FnMut(I::Item) -> R + 'a,
    R: Data,
{
    let mut config = MapConfig::default();
    if progress && comm.is_master() {
        config = config.progress(progress::bar());
    }
    map_unordered_with(comm, func, sequence, config)
}

/// As [`map_unordered`], with explicit progress reporting and logging.
pub fn map_unordered_with<'a, C, I, F, R>(comm: &'a mut C, func: F, sequence: I, config: MapConfig) -> Result<MapUnordered<'a, C, R>>
where
    C: Communicate,
    I: IntoIterator,
    I::IntoIter: 'a,
    F: FnMut(I::Item) -> R + 'a,
    R: Data,
{
    let sequence = sequence.into_iter();
    let mut progress = Tracker::new(config.progress);
    if comm.size() == 1 {
        Config::Thread.check_environment()?;
        if let Some(total) = exact_len(&sequence) {
            progress.set_total(total);
        }
        let results = Box::new(sequence.map(func));
        return Ok(MapUnordered { mode: Mode::Sequential { results, progress } });
    }

    comm.barrier()?;
    if comm.is_master() {
        if let Some(total) = exact_len(&sequence) {
            progress.set_total(total);
        }
        Ok(MapUnordered { mode: Mode::Coordinator(Coordinator::new(comm, progress, config.logger)) })
    }
    else {
        worker::run(comm, func, sequence, config.logger.as_ref())?;
        Ok(MapUnordered { mode: Mode::Finished })
    }
}

/// As [`map_unordered_with`], for a sequence that supports indexing.
///
/// Workers look elements up by index instead of enumerating the sequence, and stop at the
/// first index past its end.
pub fn map_unordered_slice<'a, C, T, F, R>(comm: &'a mut C, func: F, sequence: &'a [T], config: MapConfig) -> Result<MapUnordered<'a, C, R>>
where
    C: Communicate,
    F: FnMut(&T) -> R + 'a,
    R: Data,
{
    let mut progress = Tracker::new(config.progress);
    if comm.size() == 1 {
        Config::Thread.check_environment()?;
        progress.set_total(sequence.len());
        let results = Box::new(sequence.iter().map(func));
        return Ok(MapUnordered { mode: Mode::Sequential { results, progress } });
    }

    comm.barrier()?;
    if comm.is_master() {
        progress.set_total(sequence.len());
        Ok(MapUnordered { mode: Mode::Coordinator(Coordinator::new(comm, progress, config.logger)) })
    }
    else {
        worker::run_indexed(comm, func, sequence, config.logger.as_ref())?;
        Ok(MapUnordered { mode: Mode::Finished })
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::communication::Thread;
    use crate::progress::Progress;
    use super::{map_unordered, map_unordered_slice, MapConfig};

    #[derive(Clone, Default)]
    struct Counter(Rc<RefCell<(Option<u64>, u64, bool)>>);

    impl Progress for Counter {
        fn set_total(&mut self, total: u64) { self.0.borrow_mut().0 = Some(total); }
        fn increment(&mut self) { self.0.borrow_mut().1 += 1; }
        fn set_label(&mut self, _label: String) { }
        fn finish(&mut self) { self.0.borrow_mut().2 = true; }
    }

    #[test]
    fn single_participant_keeps_order() {
        let mut comm = Thread::new();
        let results = map_unordered(&mut comm, |x: i64| x * x, vec![10, 20, 30, 40], false).unwrap();
        let results = results.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(results, vec![100, 400, 900, 1600]);
    }

    #[test]
    fn single_participant_is_lazy() {
        let mut comm = Thread::new();
        let applied = Rc::new(RefCell::new(0));
        let counted = Rc::clone(&applied);
        let mut results = map_unordered(&mut comm, move |x: u32| { *counted.borrow_mut() += 1; x + 1 }, 0 .. 100, false).unwrap();
        assert_eq!(*applied.borrow(), 0);
        assert_eq!(results.next().unwrap().unwrap(), 1);
        assert_eq!(results.next().unwrap().unwrap(), 2);
        assert_eq!(*applied.borrow(), 2);
    }

    #[test]
    fn single_participant_progress() {
        let mut comm = Thread::new();
        let counter = Counter::default();
        let config = MapConfig::default().progress(counter.clone());
        let words = ["relay", "map", "unordered"];
        let lengths = map_unordered_slice(&mut comm, |word: &&str| word.len(), &words[..], config).unwrap();
        assert_eq!(lengths.map(Result::unwrap).collect::<Vec<_>>(), vec![5, 3, 9]);
        assert_eq!(*counter.0.borrow(), (Some(3), 3, true));
    }

    #[test]
    fn unknown_lengths_report_no_total() {
        let mut comm = Thread::new();
        let counter = Counter::default();
        let config = MapConfig::default().progress(counter.clone());
        let evens = (0 .. 10u32).filter(|x| x % 2 == 0);
        let mut results = super::map_unordered_with(&mut comm, |x| x, evens, config).unwrap();
        assert_eq!(results.by_ref().take(5).count(), 5);
        assert_eq!(*counter.0.borrow(), (None, 5, false));
        assert!(results.next().is_none());
        assert_eq!(*counter.0.borrow(), (None, 5, true));
    }
}
