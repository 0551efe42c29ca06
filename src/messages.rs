use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};

/// A user-facing message stamped with the time it was generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub at: DateTime<Local>,
    pub message: String,
}

impl Report {
    pub fn new(at: DateTime<Local>, message: impl Into<String>) -> Self {
        Self {
            at,
            message: message.into(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.format("%H:%M:%S"), self.message)
    }
}

pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Rolling message log, newest batch first.
///
/// Each batch keeps its own order and goes on top of everything logged
/// before it. The oldest entries fall off once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<Report>,
    capacity: usize,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn push_batch<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Report>,
        I::IntoIter: DoubleEndedIterator,
    {
        for report in batch.into_iter().rev() {
            self.entries.push_front(report);
        }
        self.entries.truncate(self.capacity);
    }

    pub fn push(&mut self, report: Report) {
        self.push_batch([report]);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    fn messages(log: &MessageLog) -> Vec<&str> {
        log.iter().map(|r| r.message.as_str()).collect()
    }

    #[test]
    fn report_display_has_clock_time() {
        let r = Report::new(at(9, 5, 7), "Error #53 connecting Z:");
        assert_eq!(r.to_string(), "09:05:07 Error #53 connecting Z:");
    }

    #[test]
    fn newer_batches_go_on_top() {
        let mut log = MessageLog::default();
        log.push_batch(vec![Report::new(at(1, 0, 0), "a1"), Report::new(at(1, 0, 0), "a2")]);
        log.push_batch(vec![Report::new(at(2, 0, 0), "b1"), Report::new(at(2, 0, 0), "b2")]);
        assert_eq!(messages(&log), ["b1", "b2", "a1", "a2"]);
    }

    #[test]
    fn oldest_entries_fall_off() {
        let mut log = MessageLog::with_capacity(2);
        log.push(Report::new(at(1, 0, 0), "old"));
        log.push(Report::new(at(2, 0, 0), "mid"));
        log.push(Report::new(at(3, 0, 0), "new"));
        assert_eq!(messages(&log), ["new", "mid"]);
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = MessageLog::default();
        log.push(Report::new(at(1, 0, 0), "x"));
        log.clear();
        assert!(log.is_empty());
    }
}
