//! Sender side: send window and retransmission logic
//!
//! The send window is a ring of `window_size` slots. The slot holding the
//! window base sits at ring index `head`; the frame `k` steps past the base
//! sits at `(head + k) % window_size`. Sequence numbers wrap over the
//! (larger) sequence space independently of the ring.
//!
//! ```text
//!   base                    next
//!    |                       |
//!  --+-----------------------+--------------> seq space (mod SEQSPACE)
//!    |<-- count outstanding->|<-- free ---->
//! ```
//!
//! Per slot: `InFlight -> Acked -> (reclaimed)`, or `InFlight -> Abandoned`
//! once its retry budget is spent.

use crate::ack::AckMode;
use crate::config::{ConfigError, ProtocolConfig};
use crate::frame::{Frame, Message};
use crate::io::{Channel, Entity, TimerService};
use crate::rtt::RttEstimator;
use crate::sequence::{SeqNumber, SeqSpace};
use crate::time::Timestamp;
use thiserror::Error;
use tracing::{debug, error, trace};

/// Sender errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Send window is full")]
    WindowFull,

    #[error("Retries exhausted for frame {0}")]
    RetriesExhausted(SeqNumber),
}

/// State of one outstanding frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Sent, waiting for its acknowledgment
    InFlight,
    /// Acknowledged, waiting for older frames before it can be reclaimed
    Acked,
    /// Retry budget spent; no longer retransmitted
    Abandoned,
}

/// Stored frame with retransmission metadata
#[derive(Debug, Clone)]
pub struct SendSlot {
    /// The frame exactly as first sent
    pub frame: Frame,
    /// Acknowledgment state
    pub state: SlotState,
    /// Time of the most recent transmission
    pub sent_at: Timestamp,
    /// Number of retransmissions so far
    pub retries: u32,
}

/// Ring buffer of outstanding frames
pub struct SendWindow {
    slots: Vec<Option<SendSlot>>,
    /// Ring index of the slot holding `base`
    head: usize,
    /// Oldest unreclaimed sequence number
    base: SeqNumber,
    /// Sequence number for the next new frame
    next: SeqNumber,
    /// Number of unreclaimed slots
    count: u32,
    space: SeqSpace,
}

impl SendWindow {
    /// Create an empty window of `window_size` slots over `space`
    pub fn new(window_size: u32, space: SeqSpace) -> Self {
        SendWindow {
            slots: vec![None; window_size as usize],
            head: 0,
            base: SeqNumber::new(0),
            next: SeqNumber::new(0),
            count: 0,
            space,
        }
    }

    #[inline]
    fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    #[inline]
    fn ring_index(&self, offset: u32) -> usize {
        (self.head + offset as usize) % self.slots.len()
    }

    /// Ring index of `seq`, if it is outstanding
    fn index(&self, seq: SeqNumber) -> Option<usize> {
        if self.space.in_window(seq, self.base, self.count) {
            Some(self.ring_index(self.space.distance(self.base, seq)))
        } else {
            None
        }
    }

    /// Number of outstanding (unreclaimed) frames
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Check if the window is full
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Oldest unreclaimed sequence number
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Next sequence number to be assigned
    pub fn next_seq(&self) -> SeqNumber {
        self.next
    }

    /// Assign the next sequence number to `message` and store its frame
    pub fn push(&mut self, message: &Message, now: Timestamp) -> Result<Frame, SendError> {
        if self.is_full() {
            return Err(SendError::WindowFull);
        }

        let frame = Frame::data(self.next, message);
        let idx = self.ring_index(self.count);
        self.slots[idx] = Some(SendSlot {
            frame,
            state: SlotState::InFlight,
            sent_at: now,
            retries: 0,
        });

        self.next = self.space.next(self.next);
        self.count += 1;

        Ok(frame)
    }

    /// Get a slot by sequence number (read-only)
    pub fn get(&self, seq: SeqNumber) -> Option<&SendSlot> {
        let idx = self.index(seq)?;
        self.slots[idx].as_ref()
    }

    /// Get a slot by sequence number
    pub fn get_mut(&mut self, seq: SeqNumber) -> Option<&mut SendSlot> {
        let idx = self.index(seq)?;
        self.slots[idx].as_mut()
    }

    /// Outstanding slots from the base forward
    pub fn iter(&self) -> impl Iterator<Item = &SendSlot> + '_ {
        (0..self.count).filter_map(move |offset| self.slots[self.ring_index(offset)].as_ref())
    }

    /// Outstanding slots from the base forward
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SendSlot> + '_ {
        let len = self.slots.len();
        let head = self.head;
        let count = self.count as usize;
        let (wrapped, from_head) = self.slots.split_at_mut(head);
        // Ring order: [head..len) then [0..head), truncated to count
        from_head
            .iter_mut()
            .chain(wrapped.iter_mut())
            .take(count.min(len))
            .filter_map(Option::as_mut)
    }

    /// Whether any outstanding frame still awaits its acknowledgment
    pub fn has_in_flight(&self) -> bool {
        self.iter().any(|slot| slot.state == SlotState::InFlight)
    }

    /// Reclaim every contiguously acknowledged slot at the front
    ///
    /// Returns the number of slots reclaimed.
    pub fn slide(&mut self) -> u32 {
        let mut reclaimed = 0;

        while self.count > 0 {
            match &self.slots[self.head] {
                Some(slot) if slot.state == SlotState::Acked => {
                    self.slots[self.head] = None;
                    self.head = (self.head + 1) % self.slots.len();
                    self.base = self.space.next(self.base);
                    self.count -= 1;
                    reclaimed += 1;
                }
                _ => break,
            }
        }

        reclaimed
    }
}

/// Sender statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages accepted from the application
    pub messages_sent: u64,
    /// Messages rejected because the window was full
    pub window_full: u64,
    /// Data frames handed to the channel (first sends and resends)
    pub frames_sent: u64,
    /// Data frames retransmitted
    pub packets_resent: u64,
    /// Uncorrupted ACK frames received
    pub total_acks_received: u64,
    /// ACKs that acknowledged a previously unacknowledged frame
    pub new_acks: u64,
    /// ACKs for frames already acknowledged
    pub duplicate_acks: u64,
    /// ACKs outside the outstanding range
    pub stale_acks: u64,
    /// ACK frames discarded for checksum mismatch
    pub corrupted_acks: u64,
    /// Round-trip samples fed to the estimator
    pub rtt_samples: u64,
    /// Frames abandoned after exhausting their retries
    pub retries_exhausted: u64,
}

/// Result of handling an incoming frame at the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; discarded
    Corrupted,
    /// Frame carried no acknowledgment
    NotAck,
    /// Acknowledged sequence number is not outstanding
    Stale(SeqNumber),
    /// Frame was already acknowledged
    Duplicate(SeqNumber),
    /// New acknowledgment
    Accepted {
        /// Frames newly marked acknowledged
        acked: u32,
        /// Frames reclaimed from the front of the window
        slid: u32,
    },
}

/// Result of a retransmission timeout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutOutcome {
    /// Frames retransmitted
    pub resent: u32,
    /// Frames abandoned on this timeout
    pub abandoned: Vec<SeqNumber>,
}

impl TimeoutOutcome {
    /// `Err` naming the first abandoned frame, if any
    pub fn into_result(self) -> Result<u32, SendError> {
        match self.abandoned.first() {
            Some(&seq) => Err(SendError::RetriesExhausted(seq)),
            None => Ok(self.resent),
        }
    }
}

/// Selective repeat sender (entity A)
pub struct Sender {
    window: SendWindow,
    space: SeqSpace,
    rtt: RttEstimator,
    ack_mode: AckMode,
    max_retries: u32,
    timer_armed: bool,
    stats: SenderStats,
}

impl Sender {
    /// Create a sender from a validated configuration
    pub fn new(config: &ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let space = SeqSpace::new(config.seq_space);

        Ok(Sender {
            window: SendWindow::new(config.window_size, space),
            space,
            rtt: RttEstimator::new(&config.rtt),
            ack_mode: config.ack_mode,
            max_retries: config.max_retries,
            timer_armed: false,
            stats: SenderStats::default(),
        })
    }

    /// Accept a message from the application and send its frame
    ///
    /// Never blocks: a full window rejects the message and the caller decides
    /// whether to try again later.
    pub fn submit<E>(
        &mut self,
        message: Message,
        now: Timestamp,
        env: &mut E,
    ) -> Result<SeqNumber, SendError>
    where
        E: Channel + TimerService,
    {
        let frame = match self.window.push(&message, now) {
            Ok(frame) => frame,
            Err(err) => {
                debug!("A: new message arrives, send window is full");
                self.stats.window_full += 1;
                return Err(err);
            }
        };

        debug!(seq = %frame.seqnum, "A: sending packet to layer 3");
        env.send(Entity::Sender, frame);
        self.stats.messages_sent += 1;
        self.stats.frames_sent += 1;

        if !self.timer_armed {
            self.arm_timer(env);
        }

        Ok(frame.seqnum)
    }

    /// Handle a frame arriving from the receiver
    pub fn on_ack<E>(&mut self, frame: &Frame, now: Timestamp, env: &mut E) -> AckOutcome
    where
        E: Channel + TimerService,
    {
        if frame.is_corrupted() {
            debug!("A: corrupted ACK is received, do nothing");
            self.stats.corrupted_acks += 1;
            return AckOutcome::Corrupted;
        }

        let Some(acknum) = frame.acknum else {
            trace!(seq = %frame.seqnum, "A: frame without acknowledgment ignored");
            return AckOutcome::NotAck;
        };

        self.stats.total_acks_received += 1;
        debug!(ack = %acknum, "A: uncorrupted ACK is received");

        let state = match self.window.get(acknum) {
            Some(slot) => slot.state,
            None => {
                debug!(ack = %acknum, "A: ACK outside the window, do nothing");
                self.stats.stale_acks += 1;
                return AckOutcome::Stale(acknum);
            }
        };

        if state == SlotState::Acked {
            debug!(ack = %acknum, "A: duplicate ACK received, do nothing");
            self.stats.duplicate_acks += 1;
            return AckOutcome::Duplicate(acknum);
        }

        let acked = match self.ack_mode {
            AckMode::Selective => self.acknowledge(acknum, now),
            AckMode::Cumulative => {
                let mut acked = 0;
                let mut seq = self.window.base();
                loop {
                    acked += self.acknowledge(seq, now);
                    if seq == acknum {
                        break;
                    }
                    seq = self.space.next(seq);
                }
                acked
            }
        };

        let slid = self.window.slide();
        debug!(ack = %acknum, acked, slid, base = %self.window.base(), "A: ACK is not a duplicate");

        self.cancel_timer(env);
        if self.window.has_in_flight() {
            self.arm_timer(env);
        }

        AckOutcome::Accepted { acked, slid }
    }

    /// Mark one outstanding frame acknowledged, sampling its RTT if unambiguous
    fn acknowledge(&mut self, seq: SeqNumber, now: Timestamp) -> u32 {
        let Some(slot) = self.window.get_mut(seq) else {
            return 0;
        };
        if slot.state == SlotState::Acked {
            return 0;
        }

        slot.state = SlotState::Acked;
        let sample = (slot.retries == 0).then(|| now - slot.sent_at);

        self.stats.new_acks += 1;
        if let Some(sample) = sample {
            self.rtt.update(sample);
            self.stats.rtt_samples += 1;
            trace!(?sample, timeout = ?self.rtt.timeout(), "A: RTT sample");
        }
        1
    }

    /// Handle expiry of the retransmission timer
    ///
    /// Every outstanding unacknowledged frame is resent.
    pub fn on_timeout<E>(&mut self, now: Timestamp, env: &mut E) -> TimeoutOutcome
    where
        E: Channel + TimerService,
    {
        self.timer_armed = false;
        debug!("A: time out, resend packets");

        let max_retries = self.max_retries;
        let mut outcome = TimeoutOutcome::default();

        for slot in self.window.iter_mut() {
            if slot.state != SlotState::InFlight {
                continue;
            }

            if slot.retries >= max_retries {
                slot.state = SlotState::Abandoned;
                let err = SendError::RetriesExhausted(slot.frame.seqnum);
                error!(retries = slot.retries, "A: {}", err);
                outcome.abandoned.push(slot.frame.seqnum);
                continue;
            }

            debug!(seq = %slot.frame.seqnum, "A: resending packet");
            env.send(Entity::Sender, slot.frame);
            slot.retries += 1;
            slot.sent_at = now;
            outcome.resent += 1;
        }

        self.stats.packets_resent += outcome.resent as u64;
        self.stats.frames_sent += outcome.resent as u64;
        self.stats.retries_exhausted += outcome.abandoned.len() as u64;

        if self.window.has_in_flight() {
            self.arm_timer(env);
        }

        outcome
    }

    fn arm_timer<E: TimerService>(&mut self, env: &mut E) {
        self.cancel_timer(env);
        env.arm(Entity::Sender, self.rtt.timeout());
        self.timer_armed = true;
    }

    fn cancel_timer<E: TimerService>(&mut self, env: &mut E) {
        if self.timer_armed {
            env.cancel(Entity::Sender);
            self.timer_armed = false;
        }
    }

    /// Send window
    pub fn window(&self) -> &SendWindow {
        &self.window
    }

    /// RTT estimator
    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    /// Whether the retransmission timer is running
    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    /// Get sender statistics
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Frame>,
        armed: Vec<Duration>,
        cancels: usize,
    }

    impl Channel for Recorder {
        fn send(&mut self, from: Entity, frame: Frame) {
            assert_eq!(from, Entity::Sender);
            self.sent.push(frame);
        }
    }

    impl TimerService for Recorder {
        fn arm(&mut self, _entity: Entity, after: Duration) {
            self.armed.push(after);
        }

        fn cancel(&mut self, _entity: Entity) {
            self.cancels += 1;
        }
    }

    fn msg(i: u8) -> Message {
        Message::new([b'a' + i; crate::frame::PAYLOAD_SIZE])
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_offset(Duration::from_millis(ms))
    }

    fn ack(seq: u32) -> Frame {
        Frame::ack(SeqNumber::new(0), SeqNumber::new(seq))
    }

    fn sender() -> Sender {
        Sender::new(&ProtocolConfig::default()).unwrap()
    }

    #[test]
    fn test_send_window_push_slide() {
        let mut window = SendWindow::new(3, SeqSpace::new(4));

        for i in 0..3 {
            window.push(&msg(i), Timestamp::ZERO).unwrap();
        }
        assert!(window.is_full());
        assert_eq!(window.push(&msg(3), Timestamp::ZERO), Err(SendError::WindowFull));

        window.get_mut(SeqNumber::new(1)).unwrap().state = SlotState::Acked;
        assert_eq!(window.slide(), 0);

        window.get_mut(SeqNumber::new(0)).unwrap().state = SlotState::Acked;
        assert_eq!(window.slide(), 2);
        assert_eq!(window.base(), SeqNumber::new(2));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_send_window_wraparound() {
        let mut window = SendWindow::new(3, SeqSpace::new(4));

        // Cycle through the sequence space more than once
        for i in 0..10u8 {
            let frame = window.push(&msg(i % 26), Timestamp::ZERO).unwrap();
            assert_eq!(frame.seqnum, SeqNumber::new(i as u32 % 4));
            window.get_mut(frame.seqnum).unwrap().state = SlotState::Acked;
            assert_eq!(window.slide(), 1);
        }
        assert!(window.is_empty());
        assert_eq!(window.base(), SeqNumber::new(2));
    }

    #[test]
    fn test_iter_in_ring_order() {
        let mut window = SendWindow::new(3, SeqSpace::new(7));
        for i in 0..3 {
            window.push(&msg(i), Timestamp::ZERO).unwrap();
        }
        window.get_mut(SeqNumber::new(0)).unwrap().state = SlotState::Acked;
        window.slide();
        window.push(&msg(3), Timestamp::ZERO).unwrap();

        let seqs: Vec<u32> = window.iter_mut().map(|s| s.frame.seqnum.as_raw()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_submit_arms_timer_once() {
        let mut sender = sender();
        let mut env = Recorder::default();

        sender.submit(msg(0), at(0), &mut env).unwrap();
        sender.submit(msg(1), at(1), &mut env).unwrap();

        assert_eq!(env.sent.len(), 2);
        assert_eq!(env.armed, vec![Duration::from_millis(16)]);
        assert!(sender.timer_armed());
    }

    #[test]
    fn test_window_full_rejection() {
        let mut sender = sender();
        let mut env = Recorder::default();

        for i in 0..6 {
            sender.submit(msg(i), at(0), &mut env).unwrap();
        }
        assert_eq!(sender.submit(msg(6), at(0), &mut env), Err(SendError::WindowFull));
        assert_eq!(sender.stats().window_full, 1);
        assert_eq!(sender.window().len(), 6);
    }

    #[test]
    fn test_ack_slides_and_samples_rtt() {
        let mut sender = sender();
        let mut env = Recorder::default();

        sender.submit(msg(0), at(0), &mut env).unwrap();
        let outcome = sender.on_ack(&ack(0), at(8), &mut env);

        assert_eq!(outcome, AckOutcome::Accepted { acked: 1, slid: 1 });
        assert!(sender.window().is_empty());
        assert_eq!(sender.stats().rtt_samples, 1);
        assert!(!sender.timer_armed());
        assert_eq!(env.cancels, 1);
    }

    #[test]
    fn test_out_of_order_ack_holds_base() {
        let mut sender = sender();
        let mut env = Recorder::default();

        for i in 0..3 {
            sender.submit(msg(i), at(0), &mut env).unwrap();
        }
        let outcome = sender.on_ack(&ack(1), at(5), &mut env);

        assert_eq!(outcome, AckOutcome::Accepted { acked: 1, slid: 0 });
        assert_eq!(sender.window().base(), SeqNumber::new(0));
        assert_eq!(sender.window().len(), 3);
        assert!(sender.timer_armed());
    }

    #[test]
    fn test_duplicate_ack_is_idempotent() {
        let mut sender = sender();
        let mut env = Recorder::default();

        for i in 0..3 {
            sender.submit(msg(i), at(0), &mut env).unwrap();
        }
        sender.on_ack(&ack(2), at(5), &mut env);
        let count = sender.window().len();

        assert_eq!(
            sender.on_ack(&ack(2), at(6), &mut env),
            AckOutcome::Duplicate(SeqNumber::new(2))
        );
        assert_eq!(sender.window().len(), count);
        assert_eq!(sender.stats().total_acks_received, 2);
        assert_eq!(sender.stats().new_acks, 1);
    }

    #[test]
    fn test_stale_and_corrupted_acks() {
        let mut sender = sender();
        let mut env = Recorder::default();
        sender.submit(msg(0), at(0), &mut env).unwrap();

        assert_eq!(
            sender.on_ack(&ack(4), at(1), &mut env),
            AckOutcome::Stale(SeqNumber::new(4))
        );

        let mut bad = ack(0);
        bad.payload[3] ^= 0x40;
        assert_eq!(sender.on_ack(&bad, at(1), &mut env), AckOutcome::Corrupted);
        assert_eq!(sender.stats().corrupted_acks, 1);
        assert_eq!(sender.window().len(), 1);
    }

    #[test]
    fn test_timeout_resends_unacked_only() {
        let mut sender = sender();
        let mut env = Recorder::default();

        for i in 0..3 {
            sender.submit(msg(i), at(0), &mut env).unwrap();
        }
        sender.on_ack(&ack(1), at(4), &mut env);
        env.sent.clear();

        let outcome = sender.on_timeout(at(20), &mut env);
        assert_eq!(outcome.resent, 2);
        let resent: Vec<u32> = env.sent.iter().map(|f| f.seqnum.as_raw()).collect();
        assert_eq!(resent, vec![0, 2]);
        assert_eq!(sender.stats().packets_resent, 2);
        assert!(sender.timer_armed());
    }

    #[test]
    fn test_retransmitted_frame_gives_no_rtt_sample() {
        let mut sender = sender();
        let mut env = Recorder::default();

        sender.submit(msg(0), at(0), &mut env).unwrap();
        sender.on_timeout(at(16), &mut env);
        sender.on_ack(&ack(0), at(20), &mut env);

        assert_eq!(sender.stats().new_acks, 1);
        assert_eq!(sender.stats().rtt_samples, 0);
        assert_eq!(sender.rtt().sample_count(), 0);
    }

    #[test]
    fn test_retries_exhausted() {
        let config = ProtocolConfig {
            max_retries: 2,
            ..ProtocolConfig::default()
        };
        let mut sender = Sender::new(&config).unwrap();
        let mut env = Recorder::default();

        sender.submit(msg(0), at(0), &mut env).unwrap();
        assert_eq!(sender.on_timeout(at(16), &mut env).resent, 1);
        assert_eq!(sender.on_timeout(at(32), &mut env).resent, 1);

        let outcome = sender.on_timeout(at(48), &mut env);
        assert_eq!(outcome.abandoned, vec![SeqNumber::new(0)]);
        assert_eq!(
            outcome.into_result(),
            Err(SendError::RetriesExhausted(SeqNumber::new(0)))
        );
        assert_eq!(sender.stats().retries_exhausted, 1);
        assert!(!sender.timer_armed());

        // A late ACK still releases the slot
        let outcome = sender.on_ack(&ack(0), at(50), &mut env);
        assert_eq!(outcome, AckOutcome::Accepted { acked: 1, slid: 1 });
        assert!(sender.window().is_empty());
    }

    #[test]
    fn test_cumulative_ack() {
        let config = ProtocolConfig {
            ack_mode: AckMode::Cumulative,
            ..ProtocolConfig::default()
        };
        let mut sender = Sender::new(&config).unwrap();
        let mut env = Recorder::default();

        for i in 0..4 {
            sender.submit(msg(i), at(0), &mut env).unwrap();
        }
        let outcome = sender.on_ack(&ack(2), at(5), &mut env);

        assert_eq!(outcome, AckOutcome::Accepted { acked: 3, slid: 3 });
        assert_eq!(sender.window().base(), SeqNumber::new(3));
        assert_eq!(sender.stats().rtt_samples, 3);
    }
}
