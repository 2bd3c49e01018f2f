//! Envelopes, tags, and the filters that select among them.

use crate::{Data, Rank, Result};

/// A user-chosen discriminator on point-to-point messages.
pub type Tag = u64;

/// Selects the sender of a message to receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Any participant.
    Any,
    /// Only the indicated participant.
    Exact(Rank),
}

impl Source {
    /// True if a message from `rank` is selected.
    pub fn matches(&self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Exact(source) => *source == rank,
        }
    }
}

impl From<Rank> for Source {
    fn from(rank: Rank) -> Self { Source::Exact(rank) }
}

/// Selects the tag of a point-to-point message to receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagFilter {
    /// Any tag.
    Any,
    /// Only the indicated tag.
    Exact(Tag),
}

impl TagFilter {
    /// True if a message with `tag` is selected.
    pub fn matches(&self, tag: Tag) -> bool {
        match self {
            TagFilter::Any => true,
            TagFilter::Exact(expected) => *expected == tag,
        }
    }
}

/// Traffic generated by the collective operations.
///
/// Collective traffic is kept apart from point-to-point traffic, so that a receive
/// with wildcard filters never consumes a message meant for a collective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collective {
    /// A participant has arrived at a barrier.
    Arrive,
    /// The master releases participants from a barrier.
    Release,
    /// A broadcast value from the root.
    Broadcast,
    /// A gathered value headed to the root.
    Gather,
}

impl Collective {
    /// Stable numeric code, for the wire.
    pub fn code(self) -> u64 {
        match self {
            Collective::Arrive => 0,
            Collective::Release => 1,
            Collective::Broadcast => 2,
            Collective::Gather => 3,
        }
    }

    /// Decodes a numeric code, if it names a collective.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Collective::Arrive),
            1 => Some(Collective::Release),
            2 => Some(Collective::Broadcast),
            3 => Some(Collective::Gather),
            _ => None,
        }
    }
}

/// The logical channel a message travels on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Point-to-point traffic with a user tag.
    Point(Tag),
    /// Traffic of a collective operation.
    Collective(Collective),
}

/// A message in flight: its sender, channel, and encoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// The participant that sent the message.
    pub source: Rank,
    /// The logical channel of the message.
    pub channel: Channel,
    /// The `bincode` encoding of the payload.
    pub bytes: Vec<u8>,
}

impl Envelope {
    /// Encodes `value` into an envelope.
    pub fn encode<T: Data>(source: Rank, channel: Channel, value: &T) -> Result<Self> {
        let bytes = bincode::serialize(value)?;
        Ok(Envelope { source, channel, bytes })
    }

    /// Decodes the payload as a `T`.
    pub fn decode<T: Data>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.bytes[..])?)
    }
}

/// Selects messages by sender and channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filter {
    /// The sender to accept.
    pub source: Source,
    /// The channel to accept.
    pub kind: FilterKind,
}

/// The channel half of a [`Filter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    /// Point-to-point traffic whose tag matches.
    Point(TagFilter),
    /// Traffic of exactly this collective.
    Collective(Collective),
}

impl Filter {
    /// A filter for point-to-point traffic.
    pub fn point(source: Source, tag: TagFilter) -> Self {
        Filter { source, kind: FilterKind::Point(tag) }
    }

    /// A filter for one collective's traffic from one participant.
    pub fn collective(source: Rank, collective: Collective) -> Self {
        Filter { source: Source::Exact(source), kind: FilterKind::Collective(collective) }
    }

    /// True if `envelope` is selected.
    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.source.matches(envelope.source) && match (self.kind, envelope.channel) {
            (FilterKind::Point(filter), Channel::Point(tag)) => filter.matches(tag),
            (FilterKind::Collective(expected), Channel::Collective(found)) => expected == found,
            _ => false,
        }
    }
}

/// A received point-to-point message, with its actual sender and tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Received<T> {
    /// The decoded payload.
    pub payload: T,
    /// The participant that sent the message.
    pub source: Rank,
    /// The tag the message was sent with.
    pub tag: Tag,
}
