//! Initialization logic for a generic instance of the `Communicate` trait.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::thread;

#[cfg(feature = "getopts")]
use std::io::BufRead;

use crate::communicator::cluster::LogFn;
use crate::communicator::{ClusterBuilder, CommunicateBuilder, Generic, GenericBuilder, Process, Thread};
use crate::{Error, Result};

/// Environment variables through which process launchers announce the number of participants.
pub const SIZE_VARIABLES: &[&str] = &["RELAY_WORLD_SIZE", "OMPI_COMM_WORLD_SIZE", "PMI_SIZE"];

/// Possible configurations for the communication infrastructure.
#[derive(Clone)]
pub enum Config {
    /// Use one participant.
    Thread,
    /// Use one process with an indicated number of participant threads.
    Process(usize),
    /// Expect one participant in each of several processes.
    Cluster {
        /// Identity of this process
        process: usize,
        /// Addresses of all processes
        addresses: Vec<String>,
        /// Verbosely report connection process
        report: bool,
        /// Closure to create a new logger for a communication thread
        log_fn: LogFn,
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Config::Thread => write!(f, "Config::Thread()"),
            Config::Process(n) => write!(f, "Config::Process({})", n),
            Config::Cluster { process, addresses, report, .. } => f
                .debug_struct("Config::Cluster")
                .field("process", process)
                .field("addresses", addresses)
                .field("report", report)
                .finish_non_exhaustive()
        }
    }
}

impl Config {
    /// Installs options into a [`getopts::Options`] struct that corresponds
    /// to the parameters in the configuration.
    ///
    /// It is the caller's responsibility to ensure that the installed options
    /// do not conflict with any other options that may exist in `opts`, or
    /// that may be installed into `opts` in the future.
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn install_options(opts: &mut getopts::Options) {
        opts.optopt("w", "workers", "number of participant threads in this process", "NUM");
        opts.optopt("p", "process", "identity of this process", "IDX");
        opts.optopt("n", "processes", "number of processes", "NUM");
        opts.optopt("h", "hostfile", "text file whose lines are process addresses", "FILE");
        opts.optflag("r", "report", "reports connection progress");
    }

    /// Instantiates a configuration based upon the parsed options in `matches`.
    ///
    /// The `matches` object must have been constructed from a
    /// [`getopts::Options`] which contained at least the options installed by
    /// [`Self::install_options`].
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn from_matches(matches: &getopts::Matches) -> Result<Config> {
        let workers = parse_count(matches, "w", 1)?;
        let process = parse_count(matches, "p", 0)?;
        let processes = parse_count(matches, "n", 1)?;
        let report = matches.opt_present("report");

        if process >= processes {
            return Err(Error::Config(format!("process index {} out of range for {} processes", process, processes)));
        }

        if processes > 1 {
            if workers > 1 {
                return Err(Error::Config("each process hosts one participant; -w cannot be combined with -n".to_owned()));
            }
            let mut addresses = Vec::new();
            if let Some(hosts) = matches.opt_str("h") {
                let file = ::std::fs::File::open(&hosts)?;
                let reader = ::std::io::BufReader::new(file);
                for line in reader.lines().take(processes) {
                    addresses.push(line?);
                }
                if addresses.len() < processes {
                    return Err(Error::Config(format!("could only read {} addresses from {}, but -n: {}", addresses.len(), hosts, processes)));
                }
            }
            else {
                for index in 0..processes {
                    addresses.push(format!("localhost:{}", 2101 + index));
                }
            }

            assert_eq!(processes, addresses.len());
            Ok(Config::Cluster {
                process,
                addresses,
                report,
                log_fn: Arc::new(|_| None),
            })
        }
        else if workers > 1 { Ok(Config::Process(workers)) }
        else { Ok(Config::Thread) }
    }

    /// Constructs a new configuration by parsing the supplied text arguments.
    ///
    /// Most commonly, callers supply `std::env::args()` as the iterator.
    ///
    /// This method is only available if the `getopts` feature is enabled, which
    /// it is by default.
    #[cfg(feature = "getopts")]
    pub fn from_args<I: Iterator<Item=String>>(args: I) -> Result<Config> {
        let mut opts = getopts::Options::new();
        Config::install_options(&mut opts);
        let matches = opts.parse(args).map_err(|error| Error::Config(error.to_string()))?;
        Config::from_matches(&matches)
    }

    /// Fails if the environment announces more participants than a single-participant
    /// configuration provides.
    ///
    /// Process launchers announce the number of processes they started through
    /// environment variables (see [`SIZE_VARIABLES`]). Running each of those processes
    /// as a lone participant would silently compute everything several times over.
    pub fn check_environment(&self) -> Result<()> {
        self.check_environment_with(|variable| std::env::var(variable).ok())
    }

    /// As [`Self::check_environment`], reading variables through `lookup`.
    pub fn check_environment_with<F: Fn(&str) -> Option<String>>(&self, lookup: F) -> Result<()> {
        if let Config::Thread = self {
            for variable in SIZE_VARIABLES {
                if let Some(value) = lookup(variable) {
                    let size: usize = value.trim().parse().map_err(|_| {
                        Error::Config(format!("{}={:?} is not a number of participants", variable, value))
                    })?;
                    if size > 1 {
                        return Err(Error::EnvironmentMismatch { variable: variable.to_string(), size });
                    }
                }
            }
        }
        Ok(())
    }

    /// Attempts to assemble the described communication infrastructure.
    pub fn try_build(self) -> Result<Vec<GenericBuilder>> {
        match self {
            Config::Thread => {
                Ok(vec![GenericBuilder::Thread(Thread::new())])
            },
            Config::Process(0) => {
                Err(Error::Config("at least one participant is required".to_owned()))
            },
            Config::Process(threads) => {
                Ok(Process::new_vector(threads).into_iter().map(GenericBuilder::Process).collect())
            },
            Config::Cluster { process, addresses, report, log_fn } => {
                let builder = ClusterBuilder::new(addresses, process, report, log_fn)?;
                Ok(vec![GenericBuilder::Cluster(builder)])
            },
        }
    }
}

#[cfg(feature = "getopts")]
fn parse_count(matches: &getopts::Matches, name: &str, default: usize) -> Result<usize> {
    match matches.opt_str(name) {
        Some(text) => text.parse().map_err(|_| Error::Config(format!("-{} expects a number, found {:?}", name, text))),
        None => Ok(default),
    }
}

/// Initializes communication and executes a distributed computation.
///
/// This method checks the environment against the configuration, builds a communicator
/// for each local participant, spawns a thread per participant, and invokes the supplied
/// function with the participant's communicator.
/// The method returns a `WorkerGuards<T>` which can be `join`ed to retrieve the return values
/// (or errors) of the participants.
///
/// # Examples
/// ```
/// use relay_communication::{Communicate, Config, Rank};
///
/// // configure for two participants, just one process.
/// let config = Config::Process(2);
///
/// // initializes communication, spawns participants
/// let guards = relay_communication::initialize(config, |mut comm| {
///     println!("participant {} started", comm.rank());
///
///     // everyone learns the master's value.
///     let value = comm.broadcast(comm.rank().index() + 10, Rank::MASTER).unwrap();
///
///     // optionally, return something
///     (comm.rank().index(), value)
/// });
///
/// // computation runs until guards are joined or dropped.
/// if let Ok(guards) = guards {
///     for guard in guards.join() {
///         println!("result: {:?}", guard);
///     }
/// }
/// else { println!("error in computation"); }
/// ```
///
/// This should produce output like:
///
/// ```ignore
/// participant 0 started
/// participant 1 started
/// result: Ok((0, 10))
/// result: Ok((1, 10))
/// ```
pub fn initialize<T:Send+'static, F: Fn(Generic)->T+Send+Sync+'static>(
    config: Config,
    func: F,
) -> Result<WorkerGuards<T>> {
    config.check_environment()?;
    let builders = config.try_build()?;
    initialize_from(builders, func)
}

/// Initializes computation and runs a distributed computation.
///
/// This version of `initialize` allows you to explicitly specify the communicator builders
/// for the participants, rather than specifying a configuration.
pub fn initialize_from<B, T, F>(
    builders: Vec<B>,
    func: F,
) -> Result<WorkerGuards<T>>
where
    B: CommunicateBuilder+'static,
    T: Send+'static,
    F: Fn(<B as CommunicateBuilder>::Communicator)->T+Send+Sync+'static
{
    let logic = Arc::new(func);
    let mut guards = Vec::new();
    for (index, builder) in builders.into_iter().enumerate() {
        let clone = Arc::clone(&logic);
        guards.push(thread::Builder::new()
                            .name(format!("relay:participant-{}", index))
                            .spawn(move || {
                                let communicator = builder.build();
                                (*clone)(communicator)
                            })?);
    }

    Ok(WorkerGuards { guards })
}

/// Maintains `JoinHandle`s for participant threads.
pub struct WorkerGuards<T:Send+'static> {
    guards: Vec<::std::thread::JoinHandle<T>>
}

impl<T:Send+'static> WorkerGuards<T> {

    /// Waits on the participant threads and returns the results they produce.
    pub fn join(mut self) -> Vec<std::result::Result<T, String>> {
        self.guards
            .drain(..)
            .map(|guard| guard.join().map_err(|e| format!("{:?}", e)))
            .collect()
    }
}

impl<T:Send+'static> Drop for WorkerGuards<T> {
    fn drop(&mut self) {
        for guard in self.guards.drain(..) {
            guard.join().expect("Participant panic");
        }
    }
}
