use std::cell::RefCell;
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize, Serializer};

use relay::communication::{Communicate, Config, Rank};
use relay::logging::{MapEvent, MapLogger};
use relay::map::REPLY_TAG;
use relay::progress::Progress;
use relay::{map_unordered, map_unordered_slice, map_unordered_with, Error, MapConfig};

fn recording_logger() -> (MapLogger, Rc<RefCell<Vec<MapEvent>>>) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let logger = MapLogger::new(Instant::now(), move |_time, batch| {
        sink.borrow_mut().extend(batch.drain(..).map(|(_, event)| event));
    });
    (logger, events)
}

#[test]
fn squares_in_order_alone() {
    let squares = relay::execute_directly(|comm| {
        map_unordered(comm, |x: u64| x * x, vec![10, 20, 30, 40], false)
            .unwrap()
            .map(Result::unwrap)
            .collect::<Vec<_>>()
    }).unwrap();
    assert_eq!(squares, vec![100, 400, 900, 1600]);
}

#[test]
fn identity_with_delays() {
    let guards = relay::execute(Config::Process(4), |comm| {
        let mut rng = SmallRng::seed_from_u64(comm.rank().index() as u64);
        let delayed = move |x: u64| {
            thread::sleep(Duration::from_millis(rng.gen_range(0 .. 25)));
            x
        };
        map_unordered(comm, delayed, 1 ..= 9, false)
            .unwrap()
            .map(Result::unwrap)
            .collect::<Vec<_>>()
    }).unwrap();

    let results = relay::join(guards).unwrap();
    assert_eq!(results[0].len(), 9);
    assert_eq!(results[0].iter().copied().sorted().collect::<Vec<_>>(), (1 ..= 9).collect::<Vec<_>>());
    assert!(results[1 ..].iter().all(|worker| worker.is_empty()));
}

#[test]
fn every_element_once() {
    for participants in [2, 3, 5] {
        let guards = relay::execute(Config::Process(participants), |comm| {
            let words = (0 .. 40).map(|x| format!("word-{}", x));
            map_unordered(comm, |word: String| word.len(), words, false)
                .unwrap()
                .map(Result::unwrap)
                .collect::<Vec<_>>()
        }).unwrap();

        let results = relay::join(guards).unwrap();
        let expected = (0 .. 40).map(|x| format!("word-{}", x).len()).sorted().collect::<Vec<_>>();
        assert_eq!(results[0].iter().copied().sorted().collect::<Vec<_>>(), expected);
    }
}

#[test]
fn coordinator_events() {
    let guards = relay::execute(Config::Process(4), |comm| {
        let (logger, events) = recording_logger();
        let config = MapConfig::default().logger(logger.clone());
        let count = map_unordered_with(comm, |x: u32| x + 1, 0 .. 50, config).unwrap().count();
        logger.flush();
        let recorded = events.borrow().clone();
        (count, recorded)
    }).unwrap();

    let results = relay::join(guards).unwrap();
    let (count, events) = &results[0];
    assert_eq!(*count, 50);

    // Indices go out in order, one for each `Start` and each `Result`.
    let dispatched = events.iter().filter_map(|event| match event {
        MapEvent::Dispatch(dispatch) => Some(dispatch.index),
        _ => None,
    }).collect::<Vec<_>>();
    assert_eq!(dispatched, (0 .. 53).collect::<Vec<_>>());

    let stops = events.iter().filter_map(|event| match event {
        MapEvent::Stop(stop) => Some(stop.live_workers),
        _ => None,
    }).collect::<Vec<_>>();
    assert_eq!(stops, vec![2, 1, 0]);

    let done = events.iter().filter_map(|event| match event {
        MapEvent::Done(done) => Some(*done),
        _ => None,
    }).collect::<Vec<_>>();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].dispatched, 53);
    assert_eq!(done[0].results, 50);
    assert!(!events.iter().any(|event| matches!(event, MapEvent::Abandoned(_))));
}

/// Counts increments and completions.
#[derive(Clone, Default)]
struct Tally(Rc<RefCell<(u64, u64)>>);

impl Progress for Tally {
    fn set_total(&mut self, _total: u64) { }
    fn increment(&mut self) { self.0.borrow_mut().0 += 1; }
    fn set_label(&mut self, _label: String) { }
    fn finish(&mut self) { self.0.borrow_mut().1 += 1; }
}

#[test]
fn progress_completes_with_the_map() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let tally = Tally::default();
        let config = MapConfig::default().progress(tally.clone());
        let mut results = map_unordered_with(comm, |x: u16| x, 0 .. 12, config).unwrap();
        let before = results.by_ref().take(12).count();
        let pending = *tally.0.borrow();
        assert!(results.next().is_none());
        let after = *tally.0.borrow();
        (before, pending.1, after)
    }).unwrap();

    let results = relay::join(guards).unwrap();
    let (count, finished_early, (increments, finishes)) = results[0];
    assert_eq!(count, 12);
    assert_eq!(finished_early, 0);
    // Dispatches past the end of the sequence do not count beyond its length.
    assert_eq!(increments, 12);
    assert_eq!(finishes, 1);
}

#[test]
fn workers_apply_assigned_positions() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let (logger, events) = recording_logger();
        let config = MapConfig::default().logger(logger.clone());
        let mut seen = Vec::new();
        let sequence = (0 .. 30).map(|x| x * 7);
        map_unordered_with(comm, |x: usize| { seen.push(x); x }, sequence, config).unwrap().count();
        logger.flush();
        let applied = events.borrow().iter().filter_map(|event| match event {
            MapEvent::Applied(applied) => Some(*applied),
            _ => None,
        }).collect::<Vec<_>>();
        (seen, applied)
    }).unwrap();

    let results = relay::join(guards).unwrap();
    let mut positions = Vec::new();
    for (seen, applied) in &results[1 ..] {
        assert_eq!(seen.len(), applied.len());
        for (value, event) in seen.iter().zip(applied.iter()) {
            assert_eq!(event.index, event.position);
            assert_eq!(*value, event.position * 7);
            assert!(event.success);
        }
        positions.extend(applied.iter().map(|event| event.position));
    }
    assert_eq!(positions.into_iter().sorted().collect::<Vec<_>>(), (0 .. 30).collect::<Vec<_>>());
}

#[test]
fn fewer_elements_than_workers() {
    for length in [0, 2] {
        let guards = relay::execute(Config::Process(4), move |comm| {
            map_unordered(comm, |x: i32| -x, 0 .. length, false)
                .unwrap()
                .map(Result::unwrap)
                .sorted()
                .collect::<Vec<_>>()
        }).unwrap();
        let results = relay::join(guards).unwrap();
        assert_eq!(results[0], (0 .. length).map(|x| -x).sorted().collect::<Vec<_>>());
    }
}

#[test]
fn indexed_sequences() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        map_unordered_slice(comm, |word: &&str| word.to_uppercase(), &words[..], MapConfig::default())
            .unwrap()
            .map(Result::unwrap)
            .sorted()
            .collect::<Vec<_>>()
    }).unwrap();
    let results = relay::join(guards).unwrap();
    assert_eq!(results[0], vec!["ALPHA", "BETA", "DELTA", "EPSILON", "GAMMA"]);
}

#[test]
fn panics_are_reported() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let results = map_unordered(comm, |x: u64| if x == 5 { panic!("five is right out") } else { x }, 1 ..= 8, false).unwrap();
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(Error::Task { worker, index, failure }) => failures.push((worker, index, failure.message)),
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        (values.into_iter().sorted().collect::<Vec<_>>(), failures)
    }).unwrap();

    let results = relay::join(guards).unwrap();
    let (values, failures) = &results[0];
    assert_eq!(values, &vec![1, 2, 3, 4, 6, 7, 8]);
    assert_eq!(failures.len(), 1);
    let (worker, index, message) = &failures[0];
    assert_ne!(*worker, Rank::MASTER);
    assert_eq!(*index, 4);
    assert_eq!(message, "five is right out");
}

/// A reading that cannot be encoded when negative.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(transparent)]
struct Reading(i64);

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 < 0 {
            Err(serde::ser::Error::custom("negative reading"))
        }
        else {
            serializer.serialize_i64(self.0)
        }
    }
}

#[test]
fn unencodable_results_are_reported() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let readings = map_unordered(comm, |x: i64| Reading(if x == 3 { -1 } else { x }), 0 .. 6, false).unwrap();
        let mut values = Vec::new();
        let mut failures = Vec::new();
        for result in readings {
            match result {
                Ok(Reading(value)) => values.push(value),
                Err(Error::Task { index, failure, .. }) => failures.push((index, failure.message)),
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        (values.into_iter().sorted().collect::<Vec<_>>(), failures)
    }).unwrap();

    let results = relay::join(guards).unwrap();
    let (values, failures) = &results[0];
    assert_eq!(values, &vec![0, 1, 2, 4, 5]);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 3);
    assert!(failures[0].1.contains("negative reading"));
}

#[test]
fn failing_sequences_still_stop() {
    let guards = relay::execute(Config::Process(3), |comm| {
        let rank = comm.rank().index();
        let sequence = (0 .. 6u64).inspect(move |x| if rank == 1 && *x == 4 { panic!("sequence failed") });
        map_unordered(comm, |x: u64| x, sequence, false)
            .unwrap()
            .map(Result::unwrap)
            .collect::<Vec<_>>()
    }).unwrap();

    // The failed worker loses at most the task it held; the master still terminates.
    let results = guards.join();
    assert!(results[1].is_err());
    let values = results[0].as_ref().unwrap();
    assert!(values.len() >= 5 && values.len() <= 6);
    assert!(values.iter().all_unique());
    assert!(results[2].is_ok());
}

#[test]
fn early_drops_are_logged() {
    let guards = relay::execute(Config::Process(2), |comm| {
        if comm.is_master() {
            let (logger, events) = recording_logger();
            let config = MapConfig::default().logger(logger.clone());
            let mut results = map_unordered_with(comm, |x: u32| x, 0 .. 4, config).unwrap();
            let first = results.next().map(Result::unwrap);
            drop(results);
            // Release the worker, which still waits on a reply.
            comm.send(&usize::MAX, Rank::new(1), REPLY_TAG).unwrap();
            logger.flush();
            let abandoned = events.borrow().iter().filter_map(|event| match event {
                MapEvent::Abandoned(abandoned) => Some((abandoned.live_workers, abandoned.next_index)),
                _ => None,
            }).collect::<Vec<_>>();
            (first, abandoned)
        }
        else {
            map_unordered(comm, |x: u32| x, 0 .. 4, false).unwrap().count();
            (None, Vec::new())
        }
    }).unwrap();

    let results = relay::join(guards).unwrap();
    assert_eq!(results[0], (Some(0), vec![(1, 2)]));
}

#[test]
fn foreign_tags_are_protocol_errors() {
    let guards = relay::execute(Config::Process(2), |comm| {
        if comm.is_master() {
            let results = map_unordered(comm, |x: u8| x, 0 .. 4, false).unwrap().collect::<Vec<_>>();
            // Release the worker, which still waits on a reply.
            comm.send(&usize::MAX, Rank::new(1), REPLY_TAG).unwrap();
            match &results[..] {
                [Err(Error::Protocol { tag, sender })] => Some((*tag, *sender)),
                _ => None,
            }
        }
        else {
            comm.send(&(), Rank::MASTER, 42).unwrap();
            map_unordered(comm, |x: u8| x, 0 .. 4, false).unwrap().count();
            None
        }
    }).unwrap();

    let results = relay::join(guards).unwrap();
    assert_eq!(results[0], Some((42, Rank::new(1))));
}

#[test]
fn across_processes() {
    let addresses: Vec<String> = {
        let listeners = (0 .. 3).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect::<Vec<_>>();
        listeners.iter().map(|listener| listener.local_addr().unwrap().to_string()).collect()
    };

    let handles = (0 .. 3).map(|process| {
        let config = Config::Cluster {
            process,
            addresses: addresses.clone(),
            report: false,
            log_fn: Arc::new(|_| None),
        };
        thread::spawn(move || {
            let guards = relay::execute(config, |comm| {
                map_unordered(comm, |x: u64| x * 3, 0 .. 20, false)
                    .unwrap()
                    .map(Result::unwrap)
                    .sorted()
                    .collect::<Vec<_>>()
            }).unwrap();
            relay::join(guards).unwrap()
        })
    }).collect::<Vec<_>>();

    let results = handles.into_iter().map(|handle| handle.join().unwrap()).collect::<Vec<_>>();
    assert_eq!(results[0], vec![(0 .. 20).map(|x| x * 3).collect::<Vec<_>>()]);
    assert_eq!(results[1], vec![Vec::<u64>::new()]);
    assert_eq!(results[2], vec![Vec::<u64>::new()]);
}
