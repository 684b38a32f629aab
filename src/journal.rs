//! In-memory, append-only session log.
//!
//! History is never truncated. A display surface reads `displayed()`, which
//! only covers entries since the last `clear_display()`, so the on-screen view
//! can be emptied without losing anything that `export` writes.

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Note recorded whenever the display is cleared.
pub const DISPLAY_CLEARED: &str = "On-screen log cleared automatically.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    /// `[HH:MM:SS] message`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogBook {
    entries: Vec<LogEntry>,
    display_from: usize,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current local time.
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(Local::now(), message);
    }

    /// Insert a message in time order, after any entry with the same stamp.
    pub fn push_at(&mut self, at: DateTime<Local>, message: impl Into<String>) {
        let index = self.entries.partition_point(|e| e.at <= at);
        if index < self.display_from {
            self.display_from += 1;
        }
        self.entries.insert(
            index,
            LogEntry {
                at,
                message: message.into(),
            },
        );
    }

    /// Full history, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries added since the display was last cleared.
    pub fn displayed(&self) -> &[LogEntry] {
        &self.entries[self.display_from..]
    }

    /// The last `n` displayed entries.
    pub fn tail(&self, n: usize) -> &[LogEntry] {
        let shown = self.displayed();
        &shown[shown.len().saturating_sub(n)..]
    }

    /// Empty the on-screen view. History keeps a quiet note of it.
    pub fn clear_display(&mut self) {
        self.push(DISPLAY_CLEARED);
        self.display_from = self.entries.len();
    }

    /// Write the full history, one `[HH:MM:SS] message` line per entry.
    pub fn export<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{entry}")?;
        }
        writer.flush()
    }

    pub fn export_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| Error::io(path_ref, e))?;
        self.export(BufWriter::new(file))
            .map_err(|e| Error::io(path_ref, e))?;
        debug!(
            target: "clicker::journal",
            path = %path_ref.display(), entries = self.entries.len(),
            "Exported log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, h, m, s).single().unwrap()
    }

    #[test]
    fn export_format_is_one_line_per_entry() {
        let mut log = LogBook::new();
        log.push_at(at(9, 5, 3), "Added action: Key press 'a'");
        log.push_at(at(23, 59, 59), "Automation stopped.");

        let mut out = Vec::new();
        log.export(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[09:05:03] Added action: Key press 'a'\n[23:59:59] Automation stopped.\n"
        );
    }

    #[test]
    fn clearing_display_keeps_history() {
        let mut log = LogBook::new();
        log.push("one");
        log.push("two");
        log.clear_display();
        assert!(log.displayed().is_empty());
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[2].message, DISPLAY_CLEARED);

        log.push("three");
        assert_eq!(log.displayed().len(), 1);
        assert_eq!(log.displayed()[0].message, "three");
    }

    #[test]
    fn late_entries_land_in_time_order() {
        let mut log = LogBook::new();
        log.push_at(at(10, 0, 0), "first");
        log.push_at(at(10, 0, 5), "stopped");
        log.push_at(at(10, 0, 2), "engine line");
        log.push_at(at(10, 0, 5), "same second");

        let order: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(order, ["first", "engine line", "stopped", "same second"]);
    }

    #[test]
    fn entry_older_than_clear_stays_hidden() {
        let mut log = LogBook::new();
        log.push_at(at(10, 0, 0), "old");
        log.clear_display();
        log.push_at(at(10, 0, 1), "late but old");
        assert!(log.displayed().iter().all(|e| e.message != "late but old"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn tail_is_bounded_by_display() {
        let mut log = LogBook::new();
        for i in 0..5 {
            log.push(format!("m{i}"));
        }
        let tail: Vec<_> = log.tail(2).iter().map(|e| e.message.as_str()).collect();
        assert_eq!(tail, ["m3", "m4"]);
        assert_eq!(log.tail(50).len(), 5);

        log.clear_display();
        assert!(log.tail(3).is_empty());
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let mut log = LogBook::new();
        log.push_at(at(12, 0, 0), "hello");
        log.export_to_path(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[12:00:00] hello\n");
    }
}
