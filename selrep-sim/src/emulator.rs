//! Discrete-event network emulator
//!
//! Drives one [`Session`] through an application that produces messages at
//! random intervals, a [`Link`] that loses, damages and delays frames, and a
//! pair of timers. Time only advances when the next event is popped.

use crate::config::{SimConfig, SimError};
use crate::link::{Link, LinkStats};
use crate::queue::{EventQueue, Pending};
use crate::timer::Timers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use selrep_protocol::{
    Application, Channel, Entity, Event, Frame, Message, Outcome, ProtocolConfig, ReceiverStats,
    SendError, SenderStats, Session, TimerService, Timestamp, PAYLOAD_SIZE,
};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Everything the engine talks to while handling an event
struct Env {
    now: Timestamp,
    queue: EventQueue,
    link: Link,
    timers: Timers,
    rng: StdRng,
    delivered: Vec<Message>,
}

impl Channel for Env {
    fn send(&mut self, from: Entity, frame: Frame) {
        let to = from.peer();
        if let Some((at, bytes)) = self.link.transmit(to, &frame, self.now, &mut self.rng) {
            self.queue.push(at, Pending::Arrival { to, bytes });
        }
    }
}

impl TimerService for Env {
    fn arm(&mut self, entity: Entity, after: Duration) {
        let generation = self.timers.arm(entity);
        self.queue
            .push(self.now + after, Pending::Timeout { entity, generation });
    }

    fn cancel(&mut self, entity: Entity) {
        self.timers.cancel(entity);
    }
}

impl Application for Env {
    fn deliver(&mut self, message: Message) {
        trace!(?message, "layer5 delivery");
        self.delivered.push(message);
    }
}

/// Summary of a finished (or interrupted) run
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    pub link: LinkStats,
    /// Messages produced by the application
    pub generated: u64,
    /// Messages the sender took into its window
    pub accepted: u64,
    /// Messages handed to the receiving application
    pub delivered: u64,
    /// Delivered messages are exactly a prefix of the accepted ones
    pub in_order: bool,
    /// Timer expiries discarded as stale
    pub stale_timeouts: u64,
    pub end_time: Timestamp,
    pub rtt_estimate: Duration,
    pub rtt_timeout: Duration,
}

impl Report {
    /// Every accepted message was delivered, once and in order
    pub fn is_complete(&self) -> bool {
        self.in_order && self.delivered == self.accepted
    }
}

/// Emulation driver
pub struct Emulator {
    config: SimConfig,
    session: Session,
    env: Env,
    generated: u64,
    accepted: Vec<Message>,
}

impl Emulator {
    /// Create an emulator with the first application message scheduled
    pub fn new(protocol: &ProtocolConfig, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let session = Session::new(protocol)?;

        let mut emulator = Emulator {
            session,
            env: Env {
                now: Timestamp::ZERO,
                queue: EventQueue::new(),
                link: Link::new(&config),
                timers: Timers::new(),
                rng: StdRng::seed_from_u64(config.seed),
                delivered: Vec::new(),
            },
            config,
            generated: 0,
            accepted: Vec::new(),
        };

        if emulator.config.messages > 0 {
            emulator.schedule_message();
        }

        info!(
            window = protocol.window_size,
            seq_space = protocol.seq_space,
            messages = emulator.config.messages,
            loss = emulator.config.loss_prob,
            corrupt = emulator.config.corrupt_prob,
            seed = emulator.config.seed,
            "emulation configured"
        );

        Ok(emulator)
    }

    fn schedule_message(&mut self) {
        let factor = 2.0 * self.env.rng.gen::<f64>();
        let at = self.env.now + self.config.mean_interarrival.mul_f64(factor);
        self.env.queue.push(at, Pending::AppMessage);
    }

    fn next_message(&self) -> Message {
        let fill = b'a' + (self.generated % 26) as u8;
        Message::new([fill; PAYLOAD_SIZE])
    }

    /// Process the next event
    ///
    /// Returns `None` once the queue is drained or the next event lies
    /// beyond the time limit.
    pub fn step(&mut self) -> Option<Outcome> {
        let limit = Timestamp::from_offset(self.config.max_time);
        if self.env.queue.peek_time()? > limit {
            return None;
        }
        let (at, pending) = self.env.queue.pop()?;
        self.env.now = at;

        let outcome = match pending {
            Pending::AppMessage => {
                let message = self.next_message();
                self.generated += 1;
                if self.generated < self.config.messages {
                    self.schedule_message();
                }

                let outcome =
                    self.session
                        .handle(Event::MessageReady(message), at, &mut self.env);
                match outcome {
                    Outcome::Submitted(Ok(_)) => self.accepted.push(message),
                    Outcome::Submitted(Err(SendError::WindowFull)) => {
                        debug!(%at, "window full, message dropped");
                    }
                    _ => {}
                }
                outcome
            }
            Pending::Arrival { to, bytes } => match Frame::from_bytes(&bytes) {
                Ok(frame) => self
                    .session
                    .handle(Event::FrameArrived(to, frame), at, &mut self.env),
                Err(err) => {
                    warn!(%to, %err, "undecodable frame discarded");
                    Outcome::Ignored
                }
            },
            Pending::Timeout { entity, generation } => {
                if self.env.timers.fire(entity, generation) {
                    self.session
                        .handle(Event::TimerFired(entity), at, &mut self.env)
                } else {
                    trace!(%entity, generation, "stale timeout");
                    Outcome::Ignored
                }
            }
        };

        Some(outcome)
    }

    /// Run until the queue drains or the time limit is reached
    pub fn run(&mut self) -> Report {
        while self.step().is_some() {}

        let report = self.report();
        info!(
            generated = report.generated,
            accepted = report.accepted,
            delivered = report.delivered,
            end = %report.end_time,
            "emulation finished"
        );
        if !report.in_order {
            warn!("delivered stream diverges from the accepted stream");
        }
        report
    }

    /// Snapshot of the statistics so far
    pub fn report(&self) -> Report {
        let delivered = &self.env.delivered;
        let rtt = self.session.sender().rtt();

        Report {
            sender: self.session.sender().stats().clone(),
            receiver: self.session.receiver().stats().clone(),
            link: self.env.link.stats().clone(),
            generated: self.generated,
            accepted: self.accepted.len() as u64,
            delivered: delivered.len() as u64,
            in_order: self.accepted.starts_with(delivered),
            stale_timeouts: self.env.timers.stale(),
            end_time: self.env.now,
            rtt_estimate: rtt.estimated(),
            rtt_timeout: rtt.timeout(),
        }
    }

    /// Current simulated time
    pub fn now(&self) -> Timestamp {
        self.env.now
    }

    /// The session being driven
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Messages accepted by the sender, in submission order
    pub fn accepted(&self) -> &[Message] {
        &self.accepted
    }

    /// Messages delivered to the receiving application, in delivery order
    pub fn delivered(&self) -> &[Message] {
        &self.env.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol() -> ProtocolConfig {
        ProtocolConfig {
            seq_space: 12,
            ..ProtocolConfig::default()
        }
    }

    #[test]
    fn test_perfect_channel_delivers_everything() {
        let mut emulator = Emulator::new(&protocol(), SimConfig::default()).unwrap();
        let report = emulator.run();

        assert_eq!(report.generated, 20);
        assert!(report.is_complete());
        assert_eq!(report.link.lost, 0);
        assert_eq!(emulator.delivered()[0], Message::new([b'a'; PAYLOAD_SIZE]));
        assert!(emulator.session().sender().window().is_empty());
    }

    #[test]
    fn test_lossy_channel_recovers() {
        let config = SimConfig {
            messages: 200,
            loss_prob: 0.1,
            corrupt_prob: 0.1,
            seed: 42,
            ..SimConfig::default()
        };
        let mut emulator = Emulator::new(&protocol(), config).unwrap();
        let report = emulator.run();

        assert!(report.is_complete());
        assert!(report.link.lost > 0);
        assert!(report.link.corrupted > 0);
        assert!(report.sender.packets_resent > 0);
        assert_eq!(emulator.accepted(), emulator.delivered());
    }

    #[test]
    fn test_no_messages() {
        let config = SimConfig {
            messages: 0,
            ..SimConfig::default()
        };
        let mut emulator = Emulator::new(&protocol(), config).unwrap();
        let report = emulator.run();

        assert_eq!(report.generated, 0);
        assert_eq!(report.end_time, Timestamp::ZERO);
    }

    #[test]
    fn test_time_limit() {
        let config = SimConfig {
            messages: 1_000,
            max_time: Duration::from_millis(50),
            ..SimConfig::default()
        };
        let mut emulator = Emulator::new(&protocol(), config).unwrap();
        let report = emulator.run();

        assert!(report.generated < 1_000);
        assert!(report.end_time <= Timestamp::from_offset(Duration::from_millis(50)));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad_sim = SimConfig {
            loss_prob: -0.1,
            ..SimConfig::default()
        };
        assert!(matches!(
            Emulator::new(&protocol(), bad_sim),
            Err(SimError::InvalidProbability { .. })
        ));

        let bad_protocol = ProtocolConfig {
            window_size: 0,
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            Emulator::new(&bad_protocol, SimConfig::default()),
            Err(SimError::Protocol(_))
        ));
    }
}
