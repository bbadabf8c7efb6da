//! Statistics display and formatting

use selrep_sim::Report;
use std::time::Duration;

/// Format a simulated duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1_000.0;
    if ms >= 60_000.0 {
        let secs = duration.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if ms >= 1_000.0 {
        format!("{:.2}s", ms / 1_000.0)
    } else {
        format!("{:.3}ms", ms)
    }
}

/// Format a message rate in human-readable form
pub fn format_rate(count: u64, elapsed: Duration) -> String {
    if elapsed.is_zero() {
        return "N/A".to_string();
    }
    format!("{:.2} msg/s", count as f64 / elapsed.as_secs_f64())
}

/// Format `part` as a percentage of `whole`
pub fn format_ratio(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "N/A".to_string();
    }
    format!("{:.1}%", 100.0 * part as f64 / whole as f64)
}

/// Counter rows of the report table, grouped by section
pub fn report_sections(report: &Report) -> Vec<(&'static str, Vec<(&'static str, String)>)> {
    let s = &report.sender;
    let r = &report.receiver;
    let l = &report.link;
    let elapsed = report.end_time.offset();

    vec![
        (
            "APPLICATION",
            vec![
                ("Generated", report.generated.to_string()),
                ("Accepted", report.accepted.to_string()),
                ("Dropped (window full)", s.window_full.to_string()),
                ("Delivered", report.delivered.to_string()),
                ("In order", if report.in_order { "yes" } else { "NO" }.to_string()),
                ("Goodput", format_rate(report.delivered, elapsed)),
            ],
        ),
        (
            "SENDER (A)",
            vec![
                ("Frames sent", s.frames_sent.to_string()),
                ("Retransmissions", s.packets_resent.to_string()),
                ("ACKs received", s.total_acks_received.to_string()),
                ("New ACKs", s.new_acks.to_string()),
                ("Duplicate ACKs", s.duplicate_acks.to_string()),
                ("Stale ACKs", s.stale_acks.to_string()),
                ("Corrupted ACKs", s.corrupted_acks.to_string()),
                ("Retries exhausted", s.retries_exhausted.to_string()),
                ("RTT samples", s.rtt_samples.to_string()),
                ("Smoothed RTT", format_duration(report.rtt_estimate)),
                ("Timeout", format_duration(report.rtt_timeout)),
            ],
        ),
        (
            "RECEIVER (B)",
            vec![
                ("Frames received", r.frames_received.to_string()),
                ("Corrupted frames", r.corrupted_frames.to_string()),
                ("Duplicate frames", r.duplicate_frames.to_string()),
                ("Outside window", r.out_of_window.to_string()),
                ("ACKs sent", r.acks_sent.to_string()),
            ],
        ),
        (
            "LINK",
            vec![
                ("Frames", l.frames.to_string()),
                ("Lost", format!("{} ({})", l.lost, format_ratio(l.lost, l.frames))),
                (
                    "Corrupted",
                    format!("{} ({})", l.corrupted, format_ratio(l.corrupted, l.frames)),
                ),
                ("Stale timeouts", report.stale_timeouts.to_string()),
            ],
        ),
    ]
}

/// Display the end-of-run report
pub fn display_report(report: &Report) {
    println!("\n┌───────────────────────────────────────────────┐");
    println!("│ EMULATION REPORT {:>28} │", format_duration(report.end_time.offset()));

    for (title, rows) in report_sections(report) {
        println!("├───────────────────────────────────────────────┤");
        println!("│ {:45} │", title);
        println!("├────────────────────────┬──────────────────────┤");
        for (label, value) in rows {
            println!("│ {:22} │ {:>20} │", label, value);
        }
    }

    println!("└────────────────────────┴──────────────────────┘");
}

/// Display a one-line summary
pub fn display_compact_report(report: &Report) {
    println!(
        "[{}] delivered {}/{} | resent {} | lost {} | corrupted {} | {}",
        format_duration(report.end_time.offset()),
        report.delivered,
        report.accepted,
        report.sender.packets_resent,
        report.link.lost,
        report.link.corrupted,
        if report.is_complete() { "complete" } else { "INCOMPLETE" },
    );
}
