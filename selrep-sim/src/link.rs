//! Unreliable link model
//!
//! | Fault       | Model                                                   |
//! |-------------|---------------------------------------------------------|
//! | Loss        | Frame silently dropped with probability `loss_prob`.    |
//! | Corruption  | One wire byte XORed with a random non-zero mask.        |
//! | Delay       | `min_delay + U[0, max_jitter]` per frame.               |
//! | Reordering  | Only when enabled; otherwise FIFO per direction.        |
//!
//! Damage is applied to the encoded bytes, so the receiving entity sees
//! exactly what the codec makes of a flipped bit.

use crate::config::SimConfig;
use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::Rng;
use selrep_protocol::{Entity, Frame, Timestamp};
use std::time::Duration;
use tracing::trace;

/// Link statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames handed to the link
    pub frames: u64,
    /// Frames dropped
    pub lost: u64,
    /// Frames damaged in transit
    pub corrupted: u64,
}

/// Lossy, corrupting, delaying link between the two entities
#[derive(Debug)]
pub struct Link {
    loss_prob: f64,
    corrupt_prob: f64,
    min_delay: Duration,
    max_jitter: Duration,
    reorder: bool,
    /// Latest scheduled arrival towards the sender and the receiver
    last_arrival: [Timestamp; 2],
    stats: LinkStats,
}

impl Link {
    /// Create a link from the emulation settings
    pub fn new(config: &SimConfig) -> Self {
        Link {
            loss_prob: config.loss_prob,
            corrupt_prob: config.corrupt_prob,
            min_delay: config.min_delay,
            max_jitter: config.max_jitter,
            reorder: config.reorder,
            last_arrival: [Timestamp::ZERO; 2],
            stats: LinkStats::default(),
        }
    }

    /// Put `frame` on the wire towards `to`
    ///
    /// Returns the arrival time and the (possibly damaged) bytes, or `None`
    /// if the frame is lost.
    pub fn transmit(
        &mut self,
        to: Entity,
        frame: &Frame,
        now: Timestamp,
        rng: &mut StdRng,
    ) -> Option<(Timestamp, Bytes)> {
        self.stats.frames += 1;

        if rng.gen::<f64>() < self.loss_prob {
            trace!(%to, seq = %frame.seqnum, "link: frame lost");
            self.stats.lost += 1;
            return None;
        }

        let mut bytes = frame.to_bytes();
        if rng.gen::<f64>() < self.corrupt_prob {
            trace!(%to, seq = %frame.seqnum, "link: frame corrupted");
            self.stats.corrupted += 1;
            bytes = corrupt(&bytes, rng);
        }

        let lane = &mut self.last_arrival[lane(to)];
        let start = if self.reorder { now } else { now.max(*lane) };
        let jitter = self.max_jitter.mul_f64(rng.gen::<f64>());
        let at = start + self.min_delay + jitter;
        if at > *lane {
            *lane = at;
        }

        Some((at, bytes))
    }

    /// Get link statistics
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }
}

#[inline]
fn lane(to: Entity) -> usize {
    match to {
        Entity::Sender => 0,
        Entity::Receiver => 1,
    }
}

fn corrupt(bytes: &[u8], rng: &mut StdRng) -> Bytes {
    let mut damaged = BytesMut::from(bytes);
    let idx = rng.gen_range(0..damaged.len());
    damaged[idx] ^= rng.gen_range(1..=u8::MAX);
    damaged.freeze()
}
