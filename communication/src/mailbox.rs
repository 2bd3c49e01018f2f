//! A participant's inbox, supporting filtered receives.
//!
//! Envelopes arrive on a channel in the order they were sent by each participant. A
//! filtered receive takes the first matching envelope, and sets aside (stashes) those
//! it passes over. Later receives look through the stash, in arrival order, before
//! pulling from the channel again, so that envelopes from each participant are always
//! received in send order among those a filter matches.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::message::{Envelope, Filter};
use crate::{Error, Rank, Result};

/// The receiving half of a participant's channels.
pub struct Mailbox {
    rank: Rank,
    receiver: Receiver<Envelope>,
    stash: VecDeque<Envelope>,
}

impl Mailbox {
    /// Allocates a mailbox for `rank`, and the sender that delivers into it.
    pub fn new(rank: Rank) -> (Sender<Envelope>, Mailbox) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (sender, Mailbox { rank, receiver, stash: VecDeque::new() })
    }

    /// Blocks until an envelope matching `filter` is available, and returns it.
    pub fn receive(&mut self, filter: &Filter) -> Result<Envelope> {
        if let Some(envelope) = self.unstash(filter) {
            return Ok(envelope);
        }
        loop {
            let envelope = self.receiver.recv().map_err(|_| Error::Disconnected { rank: self.rank.index() })?;
            if filter.matches(&envelope) {
                return Ok(envelope);
            }
            self.stash.push_back(envelope);
        }
    }

    /// Returns an envelope matching `filter` if one has already arrived.
    pub fn try_receive(&mut self, filter: &Filter) -> Result<Option<Envelope>> {
        if let Some(envelope) = self.unstash(filter) {
            return Ok(Some(envelope));
        }
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if filter.matches(&envelope) => return Ok(Some(envelope)),
                Ok(envelope) => self.stash.push_back(envelope),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(Error::Disconnected { rank: self.rank.index() }),
            }
        }
    }

    fn unstash(&mut self, filter: &Filter) -> Option<Envelope> {
        let position = self.stash.iter().position(|envelope| filter.matches(envelope))?;
        self.stash.remove(position)
    }
}

#[cfg(test)]
mod test {
    use super::Mailbox;
    use crate::message::{Channel, Envelope, Filter, Source, TagFilter};
    use crate::Rank;

    fn envelope(source: usize, tag: u64, value: u32) -> Envelope {
        Envelope::encode(Rank::new(source), Channel::Point(tag), &value).unwrap()
    }

    #[test]
    fn filtered_receives_keep_send_order() {
        let (sender, mut mailbox) = Mailbox::new(Rank::MASTER);
        sender.send(envelope(1, 5, 10)).unwrap();
        sender.send(envelope(2, 5, 20)).unwrap();
        sender.send(envelope(1, 6, 11)).unwrap();
        sender.send(envelope(1, 5, 12)).unwrap();

        let from_two = Filter::point(Source::Exact(Rank::new(2)), TagFilter::Any);
        assert_eq!(mailbox.receive(&from_two).unwrap().decode::<u32>().unwrap(), 20);

        let tag_five = Filter::point(Source::Exact(Rank::new(1)), TagFilter::Exact(5));
        assert_eq!(mailbox.receive(&tag_five).unwrap().decode::<u32>().unwrap(), 10);
        assert_eq!(mailbox.receive(&tag_five).unwrap().decode::<u32>().unwrap(), 12);

        let any = Filter::point(Source::Any, TagFilter::Any);
        assert_eq!(mailbox.receive(&any).unwrap().decode::<u32>().unwrap(), 11);
        assert!(mailbox.try_receive(&any).unwrap().is_none());
    }

    #[test]
    fn try_receive_does_not_block() {
        let (sender, mut mailbox) = Mailbox::new(Rank::MASTER);
        let tag_one = Filter::point(Source::Any, TagFilter::Exact(1));
        sender.send(envelope(0, 2, 3)).unwrap();
        assert!(mailbox.try_receive(&tag_one).unwrap().is_none());
        sender.send(envelope(0, 1, 4)).unwrap();
        assert_eq!(mailbox.try_receive(&tag_one).unwrap().unwrap().decode::<u32>().unwrap(), 4);
        let tag_two = Filter::point(Source::Any, TagFilter::Exact(2));
        assert_eq!(mailbox.try_receive(&tag_two).unwrap().unwrap().decode::<u32>().unwrap(), 3);
    }

    #[test]
    fn closed_channels_disconnect() {
        let (sender, mut mailbox) = Mailbox::new(Rank::new(3));
        drop(sender);
        let any = Filter::point(Source::Any, TagFilter::Any);
        assert!(mailbox.receive(&any).is_err());
    }
}
