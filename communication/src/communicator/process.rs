//! Communication between participants running as threads of one process.

use std::sync::{Arc, Barrier};

use crossbeam_channel::Sender;

use crate::communicator::{Communicate, CommunicateBuilder};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Filter};
use crate::{Error, Rank, Result};

/// A communicator for intra-process, inter-thread communication.
pub struct Process {
    rank: Rank,
    size: usize,
    senders: Vec<Sender<Envelope>>,   // senders[x] delivers to participant x, including ourselves.
    mailbox: Mailbox,
    barrier: Arc<Barrier>,
}

impl Process {
    /// Allocates a list of connected communicators, one for each of `count` participants.
    pub fn new_vector(count: usize) -> Vec<Process> {
        let (senders, mailboxes): (Vec<_>, Vec<_>) = Rank::all(count).map(Mailbox::new).unzip();
        let barrier = Arc::new(Barrier::new(count));
        mailboxes
            .into_iter()
            .enumerate()
            .map(|(index, mailbox)| Process {
                rank: Rank::new(index),
                size: count,
                senders: senders.clone(),
                mailbox,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

impl Communicate for Process {
    fn rank(&self) -> Rank { self.rank }
    fn size(&self) -> usize { self.size }
    fn post(&mut self, target: Rank, envelope: Envelope) -> Result<()> {
        self.check_rank(target)?;
        self.senders[target.index()]
            .send(envelope)
            .map_err(|_| Error::Disconnected { rank: target.index() })
    }
    fn fetch(&mut self, filter: &Filter) -> Result<Envelope> {
        self.mailbox.receive(filter)
    }
    fn barrier(&mut self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }
}

impl CommunicateBuilder for Process {
    type Communicator = Process;
    fn build(self) -> Process { self }
}
