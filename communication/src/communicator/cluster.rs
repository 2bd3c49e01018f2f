//! Communication between participants in different processes, over TCP.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;

use crate::communicator::{Communicate, CommunicateBuilder};
use crate::logging::{CommunicationLogger, CommunicationSetup, MessageEvent, StateEvent};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Filter};
use crate::networking::{create_sockets, read_envelope, write_envelope, MessageHeader};
use crate::{Error, Rank, Result};

/// Produces a logger for a communication thread, if one is wanted.
pub type LogFn = Arc<dyn Fn(CommunicationSetup) -> Option<CommunicationLogger> + Send + Sync>;

/// Builds a [`Cluster`] communicator.
///
/// Constructing the builder connects to every other process and starts a receive thread
/// for each. The builder may be moved to another thread, where `build` produces the
/// communicator, whose logger cannot move between threads.
pub struct ClusterBuilder {
    rank: Rank,
    size: usize,
    streams: Vec<Option<TcpStream>>,
    local: Sender<Envelope>,
    mailbox: Mailbox,
    recv_guards: Vec<JoinHandle<()>>,
    log_fn: LogFn,
}

impl ClusterBuilder {
    /// Connects to the processes at `addresses`, as process `process`.
    pub fn new(addresses: Vec<String>, process: usize, report: bool, log_fn: LogFn) -> Result<Self> {
        let size = addresses.len();
        if process >= size {
            return Err(Error::InvalidRank { rank: process, size });
        }
        let rank = Rank::new(process);
        let streams = create_sockets(addresses, process, report)?;
        let (local, mailbox) = Mailbox::new(rank);

        let mut recv_guards = Vec::new();
        for (remote, stream) in streams.iter().enumerate() {
            if let Some(stream) = stream {
                let reader = stream.try_clone()?;
                let target = local.clone();
                let log_fn = Arc::clone(&log_fn);
                let guard = thread::Builder::new()
                    .name(format!("relay:recv-{}", remote))
                    .spawn(move || {
                        let logger = log_fn(CommunicationSetup {
                            sender: false,
                            process,
                            remote: Some(remote),
                        });
                        recv_loop(reader, target, process, remote, logger);
                    })?;
                recv_guards.push(guard);
            }
        }

        Ok(ClusterBuilder { rank, size, streams, local, mailbox, recv_guards, log_fn })
    }
}

impl CommunicateBuilder for ClusterBuilder {
    type Communicator = Cluster;
    fn build(self) -> Cluster {
        let logger = (self.log_fn)(CommunicationSetup {
            sender: true,
            process: self.rank.index(),
            remote: None,
        });
        Cluster {
            rank: self.rank,
            size: self.size,
            writers: self.streams.into_iter().map(|stream| stream.map(BufWriter::new)).collect(),
            seqnos: vec![0; self.size],
            local: self.local,
            mailbox: self.mailbox,
            recv_guards: self.recv_guards,
            logger,
        }
    }
}

/// A communicator for participants in separate processes, connected by TCP.
///
/// Each process hosts exactly one participant, whose rank is the index of its address.
/// Sends write a frame directly to the destination's stream; a thread per remote
/// process reads frames and delivers them to the local mailbox.
pub struct Cluster {
    rank: Rank,
    size: usize,
    writers: Vec<Option<BufWriter<TcpStream>>>,  // writers[x] -> goes to process x.
    seqnos: Vec<usize>,
    local: Sender<Envelope>,
    mailbox: Mailbox,
    recv_guards: Vec<JoinHandle<()>>,
    logger: Option<CommunicationLogger>,
}

impl Communicate for Cluster {
    fn rank(&self) -> Rank { self.rank }
    fn size(&self) -> usize { self.size }
    fn post(&mut self, target: Rank, envelope: Envelope) -> Result<()> {
        self.check_rank(target)?;
        if target == self.rank {
            return self.local.send(envelope).map_err(|_| Error::Disconnected { rank: target.index() });
        }
        let writer = self.writers[target.index()]
            .as_mut()
            .ok_or(Error::Disconnected { rank: target.index() })?;
        let seqno = self.seqnos[target.index()];
        self.seqnos[target.index()] += 1;
        let header = write_envelope(writer, &envelope, target, seqno)?;
        writer.flush()?;
        self.logger.as_ref().map(|l| l.log(MessageEvent { is_send: true, header }));
        Ok(())
    }
    fn fetch(&mut self, filter: &Filter) -> Result<Envelope> {
        self.mailbox.receive(filter)
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        let process = self.rank.index();
        for (remote, writer) in self.writers.iter_mut().enumerate() {
            if let Some(mut writer) = writer.take() {
                // Write a final shutdown header, so the remote receive thread can stop.
                let header = MessageHeader::shutdown(self.rank, Rank::new(remote));
                let closed = header.write_to(&mut writer)
                    .and_then(|_| writer.flush())
                    .and_then(|_| writer.get_ref().shutdown(Shutdown::Write));
                if let Err(error) = closed {
                    eprintln!("process {}:\tfailed to shut down stream to process {}: {}", process, remote, error);
                }
                self.logger.as_ref().map(|l| l.log(StateEvent { send: true, process, remote, start: false }));
            }
        }
        for guard in self.recv_guards.drain(..) {
            if guard.join().is_err() {
                eprintln!("process {}:\treceive thread panicked", process);
            }
        }
    }
}

/// Repeatedly reads frames from a TcpStream and delivers their envelopes.
///
/// The intended communication pattern is a sequence of frames, followed by a shutdown
/// header indicating the end of stream. A stream that ends without a shutdown header is
/// reported, and no further envelopes arrive from that process.
fn recv_loop(
    reader: TcpStream,
    target: Sender<Envelope>,
    process: usize,
    remote: usize,
    logger: Option<CommunicationLogger>)
{
    // Log the receive thread's start.
    logger.as_ref().map(|l| l.log(StateEvent { send: false, process, remote, start: true }));

    let mut reader = BufReader::with_capacity(1 << 16, reader);
    loop {
        match read_envelope(&mut reader) {
            Ok((header, envelope)) => {
                logger.as_ref().map(|l| l.log(MessageEvent { is_send: false, header }));
                match envelope {
                    // A failed send means the local participant has finished.
                    Some(envelope) => if target.send(envelope).is_err() { break; },
                    None => break,
                }
            },
            Err(error) => {
                eprintln!("process {}:\tstream from process {} ended abruptly: {}", process, remote, error);
                break;
            },
        }
    }

    // Log the receive thread's stop.
    logger.as_ref().map(|l| l.log(StateEvent { send: false, process, remote, start: false }));
}

#[cfg(test)]
mod test {
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    use super::{ClusterBuilder, LogFn};
    use crate::communicator::{Communicate, CommunicateBuilder};
    use crate::logging::{CommunicationLogger, CommunicationSetup};
    use crate::{Rank, Source, TagFilter};

    fn free_addresses(count: usize) -> Vec<String> {
        let listeners: Vec<_> = (0 .. count).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect();
        listeners.iter().map(|listener| listener.local_addr().unwrap().to_string()).collect()
    }

    #[test]
    fn three_processes() {
        let addresses = free_addresses(3);
        let handles: Vec<_> = (0 .. 3).map(|process| {
            let addresses = addresses.clone();
            thread::spawn(move || {
                let log_fn: LogFn = Arc::new(|_: CommunicationSetup| -> Option<CommunicationLogger> { None });
                let builder = ClusterBuilder::new(addresses, process, false, log_fn).unwrap();
                let mut comm = builder.build();
                comm.barrier().unwrap();

                let rank = comm.rank();
                comm.send(&format!("hello from {}", rank), Rank::MASTER, 5).unwrap();
                let gathered = comm.gather(rank.index() as u64, Rank::MASTER).unwrap();
                let shared = comm.broadcast(rank.index() + 40, Rank::MASTER).unwrap();

                let mut greetings = Vec::new();
                if comm.is_master() {
                    for _ in 0 .. comm.size() {
                        greetings.push(comm.receive::<String>(Source::Any, TagFilter::Exact(5)).unwrap().payload);
                    }
                    greetings.sort();
                }
                comm.barrier().unwrap();
                (greetings, gathered, shared)
            })
        }).collect();

        let results: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
        assert_eq!(results[0].0, vec!["hello from 0", "hello from 1", "hello from 2"]);
        assert_eq!(results[0].1, Some(vec![0, 1, 2]));
        assert!(results[1].1.is_none());
        assert!(results.iter().all(|result| result.2 == 40));
    }
}
