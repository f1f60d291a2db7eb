//! Text event log consumed by the dashboard.
//!
//! Every line has the form `HH:MM:SS - message`. The stats endpoint groups
//! lines by their first five characters (`HH:MM`), so the prefix must never
//! change shape.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Category of a logged event, used for throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Motion,
    Pet,
    NoPet,
    Pir,
    Rfid,
    Alert,
}

/// Minimum seconds between two lines of the same kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogCooldowns {
    pub motion: u64,
    pub pet: u64,
    pub no_pet: u64,
    pub pir: u64,
    pub rfid: u64,
    pub alert: u64,
}

impl Default for LogCooldowns {
    fn default() -> Self {
        Self {
            motion: 1,
            pet: 5,
            no_pet: 5,
            pir: 0,
            rfid: 0,
            alert: 30,
        }
    }
}

impl LogCooldowns {
    fn for_kind(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Motion => self.motion,
            EventKind::Pet => self.pet,
            EventKind::NoPet => self.no_pet,
            EventKind::Pir => self.pir,
            EventKind::Rfid => self.rfid,
            EventKind::Alert => self.alert,
        }
    }
}

/// Event count for one `HH:MM` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteCount {
    pub time: String,
    pub count: u64,
}

/// Append-only event log file.
pub struct EventLog {
    path: PathBuf,
    timezone: Option<Tz>,
    cooldowns: LogCooldowns,
    last_written: HashMap<EventKind, DateTime<Utc>>,
}

impl EventLog {
    /// Create a log writing to `path` with local-time prefixes.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            timezone: None,
            cooldowns: LogCooldowns::default(),
            last_written: HashMap::new(),
        }
    }

    /// Format prefixes in the given timezone instead of local time.
    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_cooldowns(mut self, cooldowns: LogCooldowns) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event unless one of the same kind was written within its
    /// cooldown. Returns whether a line was written.
    pub fn record(
        &mut self,
        kind: EventKind,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, std::io::Error> {
        let cooldown = self.cooldowns.for_kind(kind) as i64;
        if let Some(last) = self.last_written.get(&kind) {
            let elapsed = (at - *last).num_seconds();
            if elapsed >= 0 && elapsed < cooldown {
                return Ok(false);
            }
        }

        self.append(message, at)?;
        self.last_written.insert(kind, at);
        Ok(true)
    }

    /// Append a line without throttling.
    pub fn append(&self, message: &str, at: DateTime<Utc>) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_line(at, self.timezone, message))
    }
}

/// Render one log line: `HH:MM:SS - message`.
///
/// Line breaks inside the message are flattened so each event stays on one line.
pub fn format_line(at: DateTime<Utc>, timezone: Option<Tz>, message: &str) -> String {
    let clock = match timezone {
        Some(tz) => at.with_timezone(&tz).format("%H:%M:%S").to_string(),
        None => at.with_timezone(&Local).format("%H:%M:%S").to_string(),
    };
    let message = message.replace(['\r', '\n'], " ");
    format!("{clock} - {}", message.trim())
}

/// Read all non-empty lines, oldest first. A missing file reads as empty.
pub fn read_lines(path: &Path) -> Result<Vec<String>, std::io::Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Count events per `HH:MM` key, sorted by key.
pub fn minute_stats<S: AsRef<str>>(lines: &[S]) -> Vec<MinuteCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for line in lines {
        let stamp = line.as_ref().split(" - ").next().unwrap_or_default();
        let minute: String = stamp.chars().take(5).collect();
        if minute.is_empty() {
            continue;
        }
        *counts.entry(minute).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(time, count)| MinuteCount { time, count })
        .collect()
}

/// Remove the log file if it exists.
pub fn clear(path: &Path) -> Result<(), std::io::Error> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
