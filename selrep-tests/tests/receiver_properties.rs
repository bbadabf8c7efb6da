//! Property-based tests for the receive side
//!
//! Whatever order in-window frames arrive in, and however often each is
//! duplicated, the application must see every message exactly once and in
//! sequence order.

use proptest::prelude::*;
use selrep_protocol::{
    Application, Channel, Entity, Frame, Message, ProtocolConfig, Receiver, SeqNumber, SeqSpace,
    PAYLOAD_SIZE,
};

#[derive(Default)]
struct Sink {
    acks: Vec<Frame>,
    delivered: Vec<Message>,
}

impl Channel for Sink {
    fn send(&mut self, from: Entity, frame: Frame) {
        assert_eq!(from, Entity::Receiver);
        self.acks.push(frame);
    }
}

impl Application for Sink {
    fn deliver(&mut self, message: Message) {
        self.delivered.push(message);
    }
}

/// Message number `n` of the stream
fn message(n: u32) -> Message {
    let mut data = [0u8; PAYLOAD_SIZE];
    data[..4].copy_from_slice(&n.to_be_bytes());
    Message::new(data)
}

/// Window size, sequence space, and per-window arrival orders
///
/// Each arrival order lists offsets from the window base: every offset at
/// least once, some repeated, shuffled.
fn arrivals_strategy() -> impl Strategy<Value = (u32, u32, Vec<Vec<u32>>)> {
    (1u32..=8)
        .prop_flat_map(|window| {
            let extra = prop::collection::vec(0..window, 0..(3 * window as usize));
            (Just(window), (2 * window)..=(2 * window + 5), extra)
        })
        .prop_flat_map(|(window, seq_space, extra)| {
            let mut order: Vec<u32> = (0..window).collect();
            order.extend(extra);
            let rounds = prop::collection::vec(Just(order).prop_shuffle(), 1..5);
            (Just(window), Just(seq_space), rounds)
        })
}

proptest! {
    #[test]
    fn prop_in_order_exactly_once((window, seq_space, rounds) in arrivals_strategy()) {
        let config = ProtocolConfig {
            window_size: window,
            seq_space,
            ..ProtocolConfig::default()
        };
        let space = SeqSpace::new(seq_space);
        let mut receiver = Receiver::new(&config).unwrap();
        let mut sink = Sink::default();

        let mut arrivals = 0;
        for (round, order) in rounds.iter().enumerate() {
            let first = round as u32 * window;
            let base = receiver.expected();

            for &offset in order {
                let seq = space.add(base, offset);
                let frame = Frame::data(seq, &message(first + offset));
                receiver.on_frame(&frame, &mut sink);
                arrivals += 1;
            }

            // The whole window is in: nothing may stay buffered
            prop_assert_eq!(receiver.buffer().buffered(), 0);
            prop_assert_eq!(receiver.expected(), space.add(base, window));
        }

        let expected: Vec<Message> = (0..rounds.len() as u32 * window).map(message).collect();
        prop_assert_eq!(&sink.delivered, &expected);
        prop_assert_eq!(sink.acks.len(), arrivals);
        prop_assert!(sink.acks.iter().all(|ack| !ack.is_corrupted()));
    }

    #[test]
    fn prop_selective_ack_names_frame(window in 1u32..=8, offset in 0u32..8) {
        let offset = offset % window;
        let config = ProtocolConfig {
            window_size: window,
            seq_space: 2 * window,
            ..ProtocolConfig::default()
        };
        let mut receiver = Receiver::new(&config).unwrap();
        let mut sink = Sink::default();

        let seq = SeqNumber::new(offset);
        receiver.on_frame(&Frame::data(seq, &message(offset)), &mut sink);

        prop_assert_eq!(sink.acks.len(), 1);
        prop_assert_eq!(sink.acks[0].acknum, Some(seq));
    }
}
