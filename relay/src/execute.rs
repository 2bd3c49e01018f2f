//! Starts participants from configuration information and per-participant logic.

use std::sync::Arc;
use std::time::Instant;

use crate::communication::logging::{CommunicationLogger, CommunicationSetup};
use crate::communication::{initialize, Config, Generic, Thread, WorkerGuards};
use crate::logging_core::Logger;
use crate::{Error, Result};

/// Environment variable that, when set, prints communication events to standard error.
pub const COMMUNICATION_LOG_VARIABLE: &str = "RELAY_COMM_LOG";

/// A communication logger that prints events to standard error.
fn stderr_logger(setup: CommunicationSetup) -> Option<CommunicationLogger> {
    Some(Logger::new(Instant::now(), move |_time, batch| {
        for (elapsed, event) in batch.drain(..) {
            eprintln!("{:?}\t{:?}\t{:?}", elapsed, setup, event);
        }
    }))
}

/// Executes per-participant logic on the current thread, as the only participant.
///
/// # Examples
/// ```rust
/// let squares = relay::execute_directly(|comm| {
///     relay::map_unordered(comm, |x: u32| x * x, 0 .. 4, false)
///         .unwrap()
///         .map(Result::unwrap)
///         .collect::<Vec<_>>()
/// }).unwrap();
///
/// assert_eq!(squares, vec![0, 1, 4, 9]);
/// ```
pub fn execute_directly<T, F>(func: F) -> Result<T>
where
    F: FnOnce(&mut Thread)->T,
{
    Config::Thread.check_environment()?;
    let mut comm = Thread::new();
    Ok(func(&mut comm))
}

/// Executes per-participant logic from a configuration.
///
/// The `execute` method spins up a thread for each participant local to this process,
/// each of which executes the supplied closure with its communicator.
///
/// The closure may return a `T: Send+'static`. The `execute` method returns immediately
/// after starting the participants with a `WorkerGuards<T>`, which can be joined to
/// recover the `T` values of the local participants.
///
/// *Note*: if the caller drops the result of `execute`, the drop code will block awaiting
/// the completion of the participants.
///
/// When the [`COMMUNICATION_LOG_VARIABLE`] environment variable is set, cluster
/// communication events are printed to standard error.
///
/// # Examples
/// ```rust
/// use relay::communication::{Communicate, Config};
///
/// let guards = relay::execute(Config::Process(2), |comm| {
///     let total = relay::map_unordered(comm, |x: u64| x, 0 .. 10, false)
///         .unwrap()
///         .map(Result::unwrap)
///         .sum::<u64>();
///     relay::collective::broadcast(comm, total, None).unwrap()
/// }).unwrap();
///
/// assert_eq!(relay::join(guards).unwrap(), vec![45, 45]);
/// ```
pub fn execute<T, F>(mut config: Config, func: F) -> Result<WorkerGuards<T>>
where
    T: Send+'static,
    F: Fn(&mut Generic)->T+Send+Sync+'static,
{
    if let Config::Cluster { ref mut log_fn, .. } = config {
        if ::std::env::var_os(COMMUNICATION_LOG_VARIABLE).is_some() {
            eprintln!("enabled communication logging to standard error");
            *log_fn = Arc::new(stderr_logger);
        }
    }

    Ok(initialize(config, move |mut comm| func(&mut comm))?)
}

/// Executes per-participant logic from supplied arguments.
///
/// The arguments `execute_from_args` understands are:
///
/// `-w, --workers`: number of participant threads in this process.
///
/// `-n, --processes`: number of processes, each hosting one participant.
///
/// `-p, --process`: identity of this process; from 0 to n-1.
///
/// `-h, --hostfile`: a text file whose lines are "hostname:port" in order of process identity.
/// If not specified, `localhost` will be used, with port numbers increasing from 2101.
///
/// `-r, --report`: reports connection progress.
///
/// # Examples
///
/// ```rust
/// // execute using command line parameters
/// relay::execute_from_args(std::env::args(), |comm| {
///     let results = relay::map_unordered(comm, |x: u64| x + 1, 0 .. 10, false).unwrap();
///     for result in results {
///         println!("result: {:?}", result);
///     }
/// }).unwrap();
/// ```
/// ```ignore
/// host0% cargo run -- -n 4 -h hosts.txt -p 0
/// host1% cargo run -- -n 4 -h hosts.txt -p 1
/// host2% cargo run -- -n 4 -h hosts.txt -p 2
/// host3% cargo run -- -n 4 -h hosts.txt -p 3
/// ```
#[cfg(feature = "getopts")]
pub fn execute_from_args<I, T, F>(iter: I, func: F) -> Result<WorkerGuards<T>>
    where I: Iterator<Item=String>,
          T: Send+'static,
          F: Fn(&mut Generic)->T+Send+Sync+'static, {
    let mut opts = getopts::Options::new();
    Config::install_options(&mut opts);
    let matches = opts.parse(iter).map_err(|e| crate::communication::Error::Config(e.to_string()))?;
    let config = Config::from_matches(&matches)?;
    execute(config, func)
}

/// Waits on the participants and returns their results, in participant order.
///
/// Fails if any participant panicked.
pub fn join<T: Send+'static>(guards: WorkerGuards<T>) -> Result<Vec<T>> {
    guards.join().into_iter().collect::<std::result::Result<Vec<_>, _>>().map_err(Error::Participant)
}
