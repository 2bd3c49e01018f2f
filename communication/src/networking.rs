//! Networking code for exchanging framed envelopes between processes.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::thread::sleep;
use std::time::Duration;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::message::{Channel, Collective, Envelope};
use crate::{Error, Rank, Result};

// This constant is sent along immediately after establishing a TCP stream, so
// that it is easy to sniff out relay traffic when it is multiplexed with
// other traffic on the same port.
const HANDSHAKE_MAGIC: u64 = 0x7e1a_9c35_d04b_2f61;

/// The byte order for writing message headers and stream initialization.
type ByteOrder = byteorder::BigEndian;

/// Frame kind marking the end of a stream.
const KIND_SHUTDOWN: u64 = 0;
/// Frame kind of point-to-point traffic; `tag` holds the user tag.
const KIND_POINT: u64 = 1;
/// Frame kind of collective traffic; `tag` holds the collective code.
const KIND_COLLECTIVE: u64 = 2;

/// Framing data for each envelope transmission, indicating the channel, the source
/// and destination participants, and the payload length in bytes.
// *Warning*: Adding, removing and altering fields requires to adjust the implementation below!
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct MessageHeader {
    /// frame kind: shutdown, point-to-point, or collective.
    pub kind:       u64,
    /// user tag or collective code, depending on `kind`.
    pub tag:        u64,
    /// rank of participant sending message.
    pub source:     usize,
    /// rank of participant receiving message.
    pub target:     usize,
    /// number of payload bytes following the header.
    pub length:     usize,
    /// sequence number.
    pub seqno:      usize,
}

impl MessageHeader {

    /// The number of `u64` fields in [MessageHeader].
    const FIELDS: usize = 6;

    /// The number of bytes in an encoded header.
    pub const BYTES: usize = std::mem::size_of::<u64>() * Self::FIELDS;

    /// A header describing `envelope` on its way to `target`.
    pub fn for_envelope(envelope: &Envelope, target: Rank, seqno: usize) -> Self {
        let (kind, tag) = match envelope.channel {
            Channel::Point(tag) => (KIND_POINT, tag),
            Channel::Collective(collective) => (KIND_COLLECTIVE, collective.code()),
        };
        MessageHeader {
            kind,
            tag,
            source: envelope.source.index(),
            target: target.index(),
            length: envelope.bytes.len(),
            seqno,
        }
    }

    /// The header announcing that no further frames follow.
    pub fn shutdown(source: Rank, target: Rank) -> Self {
        MessageHeader {
            kind: KIND_SHUTDOWN,
            tag: 0,
            source: source.index(),
            target: target.index(),
            length: 0,
            seqno: 0,
        }
    }

    /// True for the final header of a stream.
    pub fn is_shutdown(&self) -> bool {
        self.kind == KIND_SHUTDOWN
    }

    /// The logical channel of the frame, if the frame carries an envelope.
    pub fn channel(&self) -> Option<Channel> {
        match self.kind {
            KIND_POINT => Some(Channel::Point(self.tag)),
            KIND_COLLECTIVE => Collective::from_code(self.tag).map(Channel::Collective),
            _ => None,
        }
    }

    /// Returns a header when there is enough supporting data
    #[inline]
    pub fn try_read(bytes: &[u8]) -> Option<MessageHeader> {
        let mut cursor = io::Cursor::new(bytes);
        let mut buffer = [0; Self::FIELDS];
        cursor.read_u64_into::<ByteOrder>(&mut buffer).ok()?;
        Some(MessageHeader {
            // Order must match writing order.
            kind: buffer[0],
            tag: buffer[1],
            source: buffer[2] as usize,
            target: buffer[3] as usize,
            length: buffer[4] as usize,
            seqno: buffer[5] as usize,
        })
    }

    /// Writes the header as binary data.
    #[inline]
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buffer = [0u8; Self::BYTES];
        let mut cursor = io::Cursor::new(&mut buffer[..]);
        // Order must match reading order.
        cursor.write_u64::<ByteOrder>(self.kind)?;
        cursor.write_u64::<ByteOrder>(self.tag)?;
        cursor.write_u64::<ByteOrder>(self.source as u64)?;
        cursor.write_u64::<ByteOrder>(self.target as u64)?;
        cursor.write_u64::<ByteOrder>(self.length as u64)?;
        cursor.write_u64::<ByteOrder>(self.seqno as u64)?;

        writer.write_all(&buffer[..])
    }
}

/// Writes `envelope` to `writer` as one frame.
pub fn write_envelope<W: Write>(writer: &mut W, envelope: &Envelope, target: Rank, seqno: usize) -> io::Result<MessageHeader> {
    let header = MessageHeader::for_envelope(envelope, target, seqno);
    header.write_to(writer)?;
    writer.write_all(&envelope.bytes[..])?;
    Ok(header)
}

/// Reads one frame from `reader`.
///
/// Returns the header, and the envelope it carries unless the frame is a shutdown.
pub fn read_envelope<R: Read>(reader: &mut R) -> Result<(MessageHeader, Option<Envelope>)> {
    let mut buffer = [0u8; MessageHeader::BYTES];
    reader.read_exact(&mut buffer[..])?;
    let header = MessageHeader::try_read(&buffer[..])
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "truncated header"))?;
    if header.is_shutdown() {
        return Ok((header, None));
    }
    let channel = header.channel()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("unknown frame kind {}", header.kind)))?;
    let mut bytes = vec![0u8; header.length];
    reader.read_exact(&mut bytes[..])?;
    let envelope = Envelope { source: Rank::new(header.source), channel, bytes };
    Ok((header, Some(envelope)))
}

/// Creates socket connections from a list of host addresses.
///
/// The item at index i in the resulting vec, is a Some(TcpSocket) to process i, except
/// for item `my_index` which is None (no socket to self).
pub fn create_sockets(addresses: Vec<String>, my_index: usize, noisy: bool) -> Result<Vec<Option<TcpStream>>> {

    let hosts1 = Arc::new(addresses);
    let hosts2 = Arc::clone(&hosts1);

    let start_task = thread::spawn(move || start_connections(hosts1, my_index, noisy));
    let await_task = thread::spawn(move || await_connections(hosts2, my_index, noisy));

    let mut results = start_task.join().map_err(|_| Error::Handshake("connecting thread panicked".to_owned()))??;
    results.push(None);
    let to_extend = await_task.join().map_err(|_| Error::Handshake("accepting thread panicked".to_owned()))??;
    results.extend(to_extend);

    if noisy { println!("process {}:\tinitialization complete", my_index) }

    Ok(results)
}

/// Result contains connections [0, my_index - 1].
pub fn start_connections(addresses: Arc<Vec<String>>, my_index: usize, noisy: bool) -> Result<Vec<Option<TcpStream>>> {
    let mut results = Vec::with_capacity(my_index);
    for (index, address) in addresses.iter().take(my_index).enumerate() {
        let stream = loop {
            match TcpStream::connect(address) {
                Ok(mut stream) => {
                    stream.set_nodelay(true)?;
                    stream.write_u64::<ByteOrder>(HANDSHAKE_MAGIC)?;
                    stream.write_u64::<ByteOrder>(my_index as u64)?;
                    if noisy { println!("process {}:\tconnection to process {}", my_index, index); }
                    break stream;
                },
                Err(error) => {
                    if noisy { println!("process {}:\terror connecting to process {}: {}; retrying", my_index, index, error); }
                    sleep(Duration::from_millis(250));
                },
            }
        };
        results.push(Some(stream));
    }

    Ok(results)
}

/// Result contains connections [my_index + 1, addresses.len() - 1].
pub fn await_connections(addresses: Arc<Vec<String>>, my_index: usize, noisy: bool) -> Result<Vec<Option<TcpStream>>> {
    let mut results: Vec<_> = (0..(addresses.len() - my_index - 1)).map(|_| None).collect();
    let listener = TcpListener::bind(&addresses[my_index][..])?;

    for _ in (my_index + 1) .. addresses.len() {
        let mut stream = listener.accept()?.0;
        stream.set_nodelay(true)?;
        let mut buffer = [0u8;16];
        stream.read_exact(&mut buffer)?;
        let mut cursor = io::Cursor::new(buffer);
        let magic = cursor.read_u64::<ByteOrder>()?;
        if magic != HANDSHAKE_MAGIC {
            return Err(Error::Handshake(format!("received incorrect magic {:#x}", magic)));
        }
        let identifier = cursor.read_u64::<ByteOrder>()? as usize;
        if identifier <= my_index || identifier >= addresses.len() {
            return Err(Error::Handshake(format!("unexpected process identifier {}", identifier)));
        }
        results[identifier - my_index - 1] = Some(stream);
        if noisy { println!("process {}:\tconnection from process {}", my_index, identifier); }
    }

    Ok(results)
}
