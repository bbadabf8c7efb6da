//! End-to-end tests through the network emulator

use selrep::{Emulator, ProtocolConfig, SimConfig};
use selrep_protocol::AckMode;
use std::time::Duration;

/// Protocol settings with a sequence space wide enough to tell old
/// retransmissions from new data
fn wide_protocol() -> ProtocolConfig {
    ProtocolConfig {
        seq_space: 12,
        ..ProtocolConfig::default()
    }
}

fn lossy(seed: u64) -> SimConfig {
    SimConfig {
        messages: 300,
        loss_prob: 0.1,
        corrupt_prob: 0.1,
        seed,
        ..SimConfig::default()
    }
}

#[test]
fn test_lossy_corrupting_channel() {
    for seed in [1, 2, 3, 9999] {
        let mut emulator = Emulator::new(&wide_protocol(), lossy(seed)).unwrap();
        let report = emulator.run();

        assert!(report.is_complete(), "seed {}: {:?}", seed, report);
        assert_eq!(emulator.accepted(), emulator.delivered());
        assert!(report.sender.packets_resent > 0);
        assert_eq!(report.sender.retries_exhausted, 0);
    }
}

#[test]
fn test_reordering_channel() {
    // Slow traffic keeps stale copies from outliving a full sequence cycle
    let config = SimConfig {
        messages: 100,
        mean_interarrival: Duration::from_millis(50),
        loss_prob: 0.05,
        corrupt_prob: 0.05,
        reorder: true,
        max_jitter: Duration::from_millis(30),
        seed: 5,
        ..SimConfig::default()
    };
    let mut emulator = Emulator::new(&wide_protocol(), config).unwrap();
    let report = emulator.run();

    assert!(report.is_complete(), "{:?}", report);
}

#[test]
fn test_cumulative_mode() {
    let protocol = ProtocolConfig {
        ack_mode: AckMode::Cumulative,
        ..wide_protocol()
    };
    let mut emulator = Emulator::new(&protocol, lossy(11)).unwrap();
    let report = emulator.run();

    assert!(report.is_complete(), "{:?}", report);
}

#[test]
fn test_default_window_without_timeouts() {
    // Round trip well under the initial timeout: nothing is ever resent
    let config = SimConfig {
        messages: 100,
        max_jitter: Duration::ZERO,
        ..SimConfig::default()
    };
    let mut emulator = Emulator::new(&ProtocolConfig::default(), config).unwrap();
    let report = emulator.run();

    assert!(report.is_complete(), "{:?}", report);
    assert_eq!(report.sender.packets_resent, 0);
    assert_eq!(report.receiver.out_of_window, 0);
}

#[test]
fn test_same_seed_same_run() {
    let run = |seed| {
        let mut emulator = Emulator::new(&wide_protocol(), lossy(seed)).unwrap();
        emulator.run()
    };

    assert_eq!(run(77), run(77));
}

#[test]
fn test_rtt_estimate_tracks_link_delay() {
    let config = SimConfig {
        messages: 200,
        min_delay: Duration::from_millis(5),
        max_jitter: Duration::ZERO,
        // Frames never queue behind each other on a lane
        reorder: true,
        ..SimConfig::default()
    };
    let mut emulator = Emulator::new(&wide_protocol(), config).unwrap();
    let report = emulator.run();

    assert!(report.is_complete());
    // Every unambiguous sample is exactly 10ms
    let estimate = report.rtt_estimate.as_secs_f64() * 1_000.0;
    assert!((estimate - 10.0).abs() < 0.5, "estimate {}ms", estimate);
}
