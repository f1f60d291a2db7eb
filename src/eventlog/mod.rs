//! Event log and run statistics.
//!
//! The event log is the text file read by the dashboard; run statistics
//! are in-memory counters for the current process.

pub mod sink;
pub mod stats;

pub use sink::{
    clear, format_line, minute_stats, read_lines, EventKind, EventLog, LogCooldowns, MinuteCount,
};
pub use stats::{create_shared_stats, RunStats, RunStatsSnapshot, SharedRunStats};
