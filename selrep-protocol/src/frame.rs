//! Frame structure, checksum and wire format
//!
//! Every frame exchanged between the two entities has the same fixed layout:
//!
//! ```text
//!  0        4        8                       28       32
//!  +--------+--------+-----------------------+--------+
//!  | seqnum | acknum |   payload (20 bytes)  |checksum|
//!  +--------+--------+-----------------------+--------+
//! ```
//!
//! All integers are big-endian `i32`. An `acknum` of `-1` marks the field as
//! not in use (data frames). The checksum is the wrapping sum of `seqnum`,
//! `acknum` and every payload byte; it detects damage with high probability
//! but is not collision free.

use crate::sequence::SeqNumber;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Size of the application payload carried by every frame
pub const PAYLOAD_SIZE: usize = 20;

/// Encoded size of a frame in bytes
pub const FRAME_SIZE: usize = 4 + 4 + PAYLOAD_SIZE + 4;

/// Header value used for fields that are not in use
pub const NOT_IN_USE: i32 = -1;

/// Filler byte for frames that carry no application data
pub const ACK_FILLER: u8 = b'0';

/// Raw payload bytes
pub type Payload = [u8; PAYLOAD_SIZE];

/// Frame codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame truncated: {0} bytes, expected {}", FRAME_SIZE)]
    Truncated(usize),

    #[error("Payload too large: {0} bytes, maximum {}", PAYLOAD_SIZE)]
    PayloadTooLarge(usize),
}

/// Application message: exactly one frame payload
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message {
    data: Payload,
}

impl Message {
    /// Create a message from a full payload
    pub fn new(data: Payload) -> Self {
        Message { data }
    }

    /// Create a message from up to [`PAYLOAD_SIZE`] bytes, zero padded
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() > PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge(bytes.len()));
        }
        let mut data = [0u8; PAYLOAD_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Ok(Message { data })
    }

    /// Payload bytes
    pub fn data(&self) -> &Payload {
        &self.data
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", String::from_utf8_lossy(&self.data))
    }
}

/// A protocol frame (data or acknowledgment)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number of this frame
    pub seqnum: SeqNumber,
    /// Acknowledged sequence number, `None` on data frames
    pub acknum: Option<SeqNumber>,
    /// Payload bytes
    pub payload: Payload,
    /// Integrity checksum
    pub checksum: i32,
}

impl Frame {
    /// Build a frame and fill in its checksum
    pub fn encode(seqnum: SeqNumber, acknum: Option<SeqNumber>, payload: Payload) -> Self {
        let checksum = compute_checksum(seqnum, acknum, &payload);
        Frame {
            seqnum,
            acknum,
            payload,
            checksum,
        }
    }

    /// Build a data frame carrying `message`
    pub fn data(seqnum: SeqNumber, message: &Message) -> Self {
        Frame::encode(seqnum, None, *message.data())
    }

    /// Build an acknowledgment frame for `acknum`
    pub fn ack(seqnum: SeqNumber, acknum: SeqNumber) -> Self {
        Frame::encode(seqnum, Some(acknum), [ACK_FILLER; PAYLOAD_SIZE])
    }

    /// Recompute the checksum over the current header and payload
    pub fn compute_checksum(&self) -> i32 {
        compute_checksum(self.seqnum, self.acknum, &self.payload)
    }

    /// Whether the stored checksum disagrees with the frame contents
    #[inline]
    pub fn is_corrupted(&self) -> bool {
        self.checksum != self.compute_checksum()
    }

    /// Application message carried by this frame
    pub fn message(&self) -> Message {
        Message::new(self.payload)
    }

    /// Serialize to the fixed wire layout
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_SIZE);

        buf.put_i32(self.seqnum.as_raw() as i32);
        buf.put_i32(ack_field(self.acknum));
        buf.put_slice(&self.payload);
        buf.put_i32(self.checksum);

        buf.freeze()
    }

    /// Parse a frame from the fixed wire layout
    ///
    /// The checksum is not verified here; call [`Frame::is_corrupted`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_SIZE {
            return Err(FrameError::Truncated(bytes.len()));
        }

        let mut buf = bytes;
        let seqnum = SeqNumber::new(buf.get_i32() as u32);
        let acknum = match buf.get_i32() {
            NOT_IN_USE => None,
            raw => Some(SeqNumber::new(raw as u32)),
        };
        let mut payload = [0u8; PAYLOAD_SIZE];
        buf.copy_to_slice(&mut payload);
        let checksum = buf.get_i32();

        Ok(Frame {
            seqnum,
            acknum,
            payload,
            checksum,
        })
    }
}

#[inline]
fn ack_field(acknum: Option<SeqNumber>) -> i32 {
    acknum.map_or(NOT_IN_USE, |seq| seq.as_raw() as i32)
}

/// `seqnum + acknum + sum(payload)` with wrapping 32-bit arithmetic
pub fn compute_checksum(seqnum: SeqNumber, acknum: Option<SeqNumber>, payload: &Payload) -> i32 {
    payload.iter().fold(
        (seqnum.as_raw() as i32).wrapping_add(ack_field(acknum)),
        |sum, &byte| sum.wrapping_add(byte as i32),
    )
}
