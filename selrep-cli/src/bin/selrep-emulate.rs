//! Selective repeat emulator
//!
//! Runs one sender and one receiver over an emulated lossy, corrupting,
//! delaying link and prints what happened.
//!
//! Examples:
//!   selrep-emulate --messages 1000 --loss 0.1 --corrupt 0.1 --seq-space 12
//!   selrep-emulate --config lossy.toml --seed 7 -vv
//!   selrep-emulate --write-config lossy.toml

use clap::Parser;
use selrep_cli::{display_compact_report, display_report, Config};
use selrep_protocol::AckMode;
use selrep_sim::Emulator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "selrep-emulate")]
#[command(about = "Selective repeat ARQ over an emulated unreliable link", long_about = None)]
struct Args {
    /// Number of messages to send
    #[arg(short = 'n', long)]
    messages: Option<u64>,

    /// Frame loss probability
    #[arg(short, long)]
    loss: Option<f64>,

    /// Frame corruption probability
    #[arg(short, long)]
    corrupt: Option<f64>,

    /// Mean time between messages from the sending application (ms)
    #[arg(short, long)]
    interval: Option<f64>,

    /// Fixed one-way delay (ms)
    #[arg(long)]
    delay: Option<f64>,

    /// Maximum random extra one-way delay (ms)
    #[arg(long)]
    jitter: Option<f64>,

    /// Let frames overtake each other on the link
    #[arg(long)]
    reorder: bool,

    /// Window size
    #[arg(short, long)]
    window: Option<u32>,

    /// Sequence space
    #[arg(long)]
    seq_space: Option<u32>,

    /// Retransmission timeout before the first RTT sample (ms)
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Retransmissions allowed per frame
    #[arg(long)]
    max_retries: Option<u32>,

    /// Acknowledge the last in-order frame instead of each frame
    #[arg(long)]
    cumulative: bool,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Read settings from a TOML file (flags take precedence)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write an example configuration file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Print a one-line summary instead of the full report
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Apply command-line overrides on top of `config`
    fn apply(&self, config: &mut Config) {
        let protocol = &mut config.protocol;
        if let Some(window) = self.window {
            protocol.window_size = window;
        }
        if let Some(seq_space) = self.seq_space {
            protocol.seq_space = seq_space;
        }
        if let Some(timeout) = self.timeout {
            protocol.timeout_ms = timeout;
        }
        if let Some(max_retries) = self.max_retries {
            protocol.max_retries = max_retries;
        }
        if self.cumulative {
            protocol.ack_policy = AckMode::Cumulative;
        }

        let channel = &mut config.channel;
        if let Some(messages) = self.messages {
            channel.messages = messages;
        }
        if let Some(loss) = self.loss {
            channel.loss = loss;
        }
        if let Some(corrupt) = self.corrupt {
            channel.corrupt = corrupt;
        }
        if let Some(interval) = self.interval {
            channel.interval_ms = interval;
        }
        if let Some(delay) = self.delay {
            channel.delay_ms = delay;
        }
        if let Some(jitter) = self.jitter {
            channel.jitter_ms = jitter;
        }
        if self.reorder {
            channel.reorder = true;
        }
        if let Some(seed) = self.seed {
            channel.seed = seed;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(path) = &args.write_config {
        Config::example().to_file(path)?;
        tracing::info!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    args.apply(&mut config);

    let protocol = config.protocol_config()?;
    let sim = config.sim_config()?;

    let mut emulator = Emulator::new(&protocol, sim)?;
    let report = emulator.run();

    if args.compact {
        display_compact_report(&report);
    } else {
        display_report(&report);
    }

    if !report.in_order {
        anyhow::bail!("Delivered messages diverge from the sent stream");
    }
    if !report.is_complete() {
        tracing::warn!(
            "{} of {} accepted messages were not delivered",
            report.accepted - report.delivered,
            report.accepted
        );
    }

    Ok(())
}
