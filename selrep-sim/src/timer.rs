//! Per-entity single-shot timers
//!
//! A cancelled timer cannot be pulled back out of the event queue, so every
//! arm gets a fresh generation number and only an expiry carrying the current
//! generation is honored.

use selrep_protocol::Entity;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
struct TimerState {
    generation: u64,
    running: bool,
}

/// Timer bookkeeping for both entities
#[derive(Debug, Default)]
pub struct Timers {
    sender: TimerState,
    receiver: TimerState,
    /// Expiries discarded because the timer was cancelled or re-armed
    stale: u64,
}

impl Timers {
    /// Create idle timers
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&mut self, entity: Entity) -> &mut TimerState {
        match entity {
            Entity::Sender => &mut self.sender,
            Entity::Receiver => &mut self.receiver,
        }
    }

    /// Start the timer of `entity`, returning the generation to schedule
    ///
    /// A running timer is cancelled first.
    pub fn arm(&mut self, entity: Entity) -> u64 {
        let state = self.state(entity);
        if state.running {
            warn!(%entity, "attempt to start a timer that is already started");
        }
        state.generation += 1;
        state.running = true;
        state.generation
    }

    /// Stop the timer of `entity`; no-op if it is not running
    pub fn cancel(&mut self, entity: Entity) {
        let state = self.state(entity);
        if state.running {
            state.generation += 1;
            state.running = false;
        }
    }

    /// Whether an expiry for `generation` should be delivered
    ///
    /// Consumes the timer when it does.
    pub fn fire(&mut self, entity: Entity, generation: u64) -> bool {
        let state = self.state(entity);
        if state.running && state.generation == generation {
            state.running = false;
            true
        } else {
            self.stale += 1;
            false
        }
    }

    /// Whether the timer of `entity` is running
    pub fn is_running(&self, entity: Entity) -> bool {
        match entity {
            Entity::Sender => self.sender.running,
            Entity::Receiver => self.receiver.running,
        }
    }

    /// Number of expiries discarded as stale
    pub fn stale(&self) -> u64 {
        self.stale
    }
}
