//! Communication for a lone participant.

use crossbeam_channel::Sender;

use crate::communicator::{Communicate, CommunicateBuilder};
use crate::mailbox::Mailbox;
use crate::message::{Envelope, Filter};
use crate::{Error, Rank, Result};

/// A communicator for a computation with exactly one participant.
///
/// Collectives complete immediately. Messages sent to oneself are queued, and a receive
/// that no queued message satisfies fails with [`Error::Deadlock`], rather than waiting
/// for a message nobody could send.
pub struct Thread {
    sender: Sender<Envelope>,
    mailbox: Mailbox,
}

impl Thread {
    /// Allocates a new single-participant communicator.
    ///
    /// The environment is not consulted; see [`Config::check_environment`](crate::Config::check_environment)
    /// for detecting a process launcher that started several participants.
    pub fn new() -> Self {
        let (sender, mailbox) = Mailbox::new(Rank::MASTER);
        Thread { sender, mailbox }
    }
}

impl Default for Thread {
    fn default() -> Self { Self::new() }
}

impl Communicate for Thread {
    fn rank(&self) -> Rank { Rank::MASTER }
    fn size(&self) -> usize { 1 }
    fn post(&mut self, target: Rank, envelope: Envelope) -> Result<()> {
        self.check_rank(target)?;
        self.sender.send(envelope).map_err(|_| Error::Disconnected { rank: target.index() })
    }
    fn fetch(&mut self, filter: &Filter) -> Result<Envelope> {
        self.mailbox.try_receive(filter)?.ok_or(Error::Deadlock)
    }
    fn barrier(&mut self) -> Result<()> { Ok(()) }
}

impl CommunicateBuilder for Thread {
    type Communicator = Thread;
    fn build(self) -> Thread { self }
}
