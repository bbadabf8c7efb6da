//! Acknowledgment generation
//!
//! Decides which sequence number the receiver reports for each accepted data
//! frame and builds the corresponding ACK frame. ACK frames are numbered on
//! their own alternating 1, 0, 1, ... sequence; they are never windowed.

use crate::frame::Frame;
use crate::sequence::{SeqNumber, SeqSpace};

/// Which sequence number an ACK reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AckMode {
    /// Acknowledge exactly the frame just processed
    #[default]
    Selective,
    /// Acknowledge the last frame delivered in order
    Cumulative,
}

/// ACK generator
pub struct AckGenerator {
    mode: AckMode,
    /// Control sequence number for the next ACK frame (alternates 1, 0)
    next_seqnum: SeqNumber,
    control_space: SeqSpace,
}

impl AckGenerator {
    /// Create a new ACK generator
    pub fn new(mode: AckMode) -> Self {
        AckGenerator {
            mode,
            next_seqnum: SeqNumber::new(1),
            control_space: SeqSpace::new(2),
        }
    }

    /// Sequence number to report after processing `seq`
    ///
    /// `expected` is the receiver's next expected sequence number after the
    /// frame was handled.
    pub fn ack_value(&self, seq: SeqNumber, expected: SeqNumber, space: SeqSpace) -> SeqNumber {
        match self.mode {
            AckMode::Selective => seq,
            AckMode::Cumulative => space.sub(expected, 1),
        }
    }

    /// Build the next ACK frame for `acknum`
    pub fn generate_ack(&mut self, acknum: SeqNumber) -> Frame {
        let frame = Frame::ack(self.next_seqnum, acknum);
        self.next_seqnum = self.control_space.next(self.next_seqnum);
        frame
    }
}
