//! Sent/failed outcome logs
//!
//! Two append-only CSV files, created with a header row when absent.
//! Logging is best effort: a file that cannot be created or written only
//! produces a warning and never changes a recipient's outcome.

use crate::config::LogConfig;
use crate::error::Result;
use crate::outcome::types::{format_timestamp, LogMode, OutcomeEntry};
use chrono::Utc;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Recipients sharing one (subject, body preview) pair
#[derive(Debug, Default)]
struct OutcomeGroup {
    subject: String,
    preview: String,
    emails: Vec<String>,
    names: Vec<String>,
    reasons: Vec<String>,
}

impl OutcomeGroup {
    fn row(&self, timestamp: &str, with_reasons: bool) -> Vec<String> {
        let mut row = vec![
            timestamp.to_string(),
            self.emails.join(";"),
            self.names.join(";"),
            self.subject.clone(),
            self.preview.clone(),
        ];
        if with_reasons {
            row.push(self.reasons.join(";"));
        }
        row
    }
}

/// Insertion-ordered groups with keyed lookup
#[derive(Debug, Default)]
struct GroupedOutcomes {
    groups: Vec<OutcomeGroup>,
    index: HashMap<(String, String), usize>,
}

impl GroupedOutcomes {
    fn add(&mut self, entry: &OutcomeEntry) {
        let preview = entry.body_preview().to_string();
        let key = (entry.subject.clone(), preview.clone());

        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.groups.push(OutcomeGroup {
                    subject: entry.subject.clone(),
                    preview,
                    ..OutcomeGroup::default()
                });
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[position];
        group.emails.push(entry.recipient_email.clone());
        group.names.push(entry.recipient_name.clone());
        if let Some(reason) = entry.reason() {
            group.reasons.push(reason.to_string());
        }
    }

    fn take(&mut self) -> Vec<OutcomeGroup> {
        self.index.clear();
        std::mem::take(&mut self.groups)
    }

    fn len(&self) -> usize {
        self.groups.len()
    }
}

/// Outcome logger for one batch
pub struct OutcomeLog {
    mode: LogMode,
    sent_path: PathBuf,
    failed_path: PathBuf,
    sent: GroupedOutcomes,
    failed: GroupedOutcomes,
    sent_count: usize,
    failed_count: usize,
}

impl OutcomeLog {
    /// Create the logger and make sure both log files exist
    pub fn open(config: &LogConfig) -> Self {
        let log = Self {
            mode: config.mode,
            sent_path: config.sent_path.clone(),
            failed_path: config.failed_path.clone(),
            sent: GroupedOutcomes::default(),
            failed: GroupedOutcomes::default(),
            sent_count: 0,
            failed_count: 0,
        };
        log.ensure_files();
        for path in log.mismatched_headers() {
            warn!(
                "Log file '{}' was written in another log mode; new {:?} rows will not match its header",
                path.display(),
                log.mode
            );
        }
        log
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    /// Create missing log files with their header row
    pub fn ensure_files(&self) {
        for (path, headers) in [
            (&self.sent_path, self.mode.sent_headers()),
            (&self.failed_path, self.mode.failed_headers()),
        ] {
            if let Err(e) = ensure_file(path, headers) {
                warn!("Could not create log file '{}': {}", path.display(), e);
            }
        }
    }

    /// Existing log files whose header row differs from this mode's columns
    pub fn mismatched_headers(&self) -> Vec<&Path> {
        [
            (self.sent_path.as_path(), self.mode.sent_headers()),
            (self.failed_path.as_path(), self.mode.failed_headers()),
        ]
        .into_iter()
        .filter(|(path, headers)| matches!(header_matches(path, headers), Ok(false)))
        .map(|(path, _)| path)
        .collect()
    }

    /// Record one recipient's outcome
    pub fn record(&mut self, entry: OutcomeEntry) {
        if entry.is_sent() {
            self.sent_count += 1;
        } else {
            self.failed_count += 1;
        }

        match self.mode {
            LogMode::Grouped => {
                if entry.is_sent() {
                    self.sent.add(&entry);
                } else {
                    self.failed.add(&entry);
                }
            }
            LogMode::Immediate => self.append_entry(&entry),
        }
    }

    /// Write accumulated groups; a no-op in immediate mode
    pub fn flush(&mut self) {
        let timestamp = format_timestamp(&Utc::now());

        let sent = self.sent.take();
        if !sent.is_empty() {
            let rows = sent.iter().map(|group| group.row(&timestamp, false));
            self.append_rows(&self.sent_path, self.mode.sent_headers(), rows);
        }

        let failed = self.failed.take();
        if !failed.is_empty() {
            let rows = failed.iter().map(|group| group.row(&timestamp, true));
            self.append_rows(&self.failed_path, self.mode.failed_headers(), rows);
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Groups waiting for [`flush`](Self::flush)
    pub fn pending_groups(&self) -> usize {
        self.sent.len() + self.failed.len()
    }

    fn append_entry(&self, entry: &OutcomeEntry) {
        let mut row = vec![
            format_timestamp(&entry.timestamp),
            entry.recipient_email.clone(),
            entry.recipient_name.clone(),
            entry.subject.clone(),
            entry.body.clone(),
        ];

        match entry.reason() {
            Some(reason) => {
                row.push(reason.to_string());
                self.append_rows(&self.failed_path, self.mode.failed_headers(), [row]);
            }
            None => self.append_rows(&self.sent_path, self.mode.sent_headers(), [row]),
        }
    }

    fn append_rows<I>(&self, path: &Path, headers: &[&str], rows: I)
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        if let Err(e) = append_rows(path, headers, rows) {
            warn!("Failed to write to '{}': {}", path.display(), e);
        }
    }
}

fn ensure_file(path: &Path, headers: &[&str]) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    writer.flush()?;
    debug!("Created log file {}", path.display());
    Ok(())
}

fn header_matches(path: &Path, headers: &[&str]) -> Result<bool> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    Ok(reader.headers()?.iter().eq(headers.iter().copied()))
}

fn append_rows<I>(path: &Path, headers: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    ensure_file(path, headers)?;

    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailMergeError;
    use tempfile::TempDir;

    fn log_config(dir: &TempDir, mode: LogMode) -> LogConfig {
        LogConfig {
            sent_path: dir.path().join("sent.csv"),
            failed_path: dir.path().join("failed.csv"),
            mode,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_open_creates_files_with_headers() {
        let dir = TempDir::new().unwrap();
        let config = log_config(&dir, LogMode::Grouped);
        OutcomeLog::open(&config);

        let sent = read_rows(&config.sent_path);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][1], "recipient_emails");

        let failed = read_rows(&config.failed_path);
        assert_eq!(failed[0].last().unwrap(), "reason");
    }

    #[test]
    fn test_grouped_mode_merges_identical_messages() {
        let dir = TempDir::new().unwrap();
        let config = log_config(&dir, LogMode::Grouped);
        let mut log = OutcomeLog::open(&config);

        log.record(OutcomeEntry::sent("a@example.com", "A", "Hello", "Same body"));
        log.record(OutcomeEntry::sent("b@example.com", "B", "Hello", "Same body"));
        log.record(OutcomeEntry::sent("c@example.com", "C", "Hello", "Other body"));
        log.record(OutcomeEntry::failed(
            "",
            "D",
            "Hello",
            "Same body",
            &MailMergeError::NoRecipientEmail,
        ));

        // Nothing reaches disk before flush
        assert_eq!(read_rows(&config.sent_path).len(), 1);
        assert_eq!(log.pending_groups(), 3);

        log.flush();
        assert_eq!(log.pending_groups(), 0);

        let sent = read_rows(&config.sent_path);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1][1], "a@example.com;b@example.com");
        assert_eq!(sent[1][2], "A;B");
        assert_eq!(sent[2][4], "Other body");

        let failed = read_rows(&config.failed_path);
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[1][2], "D");
        assert_eq!(failed[1][5], "no recipient email");

        assert_eq!(log.sent_count(), 3);
        assert_eq!(log.failed_count(), 1);
    }

    #[test]
    fn test_grouped_mode_truncates_preview() {
        let dir = TempDir::new().unwrap();
        let config = log_config(&dir, LogMode::Grouped);
        let mut log = OutcomeLog::open(&config);

        let body = "x".repeat(1000);
        log.record(OutcomeEntry::sent("a@example.com", "A", "Hello", body));
        log.flush();

        let sent = read_rows(&config.sent_path);
        assert_eq!(sent[1][4].len(), 400);
    }

    #[test]
    fn test_immediate_mode_appends_per_entry() {
        let dir = TempDir::new().unwrap();
        let config = log_config(&dir, LogMode::Immediate);
        let mut log = OutcomeLog::open(&config);

        log.record(OutcomeEntry::sent("a@example.com", "A", "Hello", "Body"));
        assert_eq!(read_rows(&config.sent_path).len(), 2);

        log.record(OutcomeEntry::failed(
            "b@example.com",
            "B",
            "Hello",
            "",
            &MailMergeError::RelayRejected("550 mailbox unavailable".to_string()),
        ));

        let failed = read_rows(&config.failed_path);
        assert_eq!(failed[0][1], "recipient_email");
        assert_eq!(failed[1][1], "b@example.com");
        assert_eq!(failed[1][5], "relay rejected message: 550 mailbox unavailable");

        log.flush();
        assert_eq!(read_rows(&config.sent_path).len(), 2);
    }

    #[test]
    fn test_second_batch_appends_history() {
        let dir = TempDir::new().unwrap();
        let config = log_config(&dir, LogMode::Grouped);

        for email in ["a@example.com", "b@example.com"] {
            let mut log = OutcomeLog::open(&config);
            log.record(OutcomeEntry::sent(email, "X", "Hello", "Body"));
            log.flush();
        }

        let sent = read_rows(&config.sent_path);
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0][0], "timestamp");
        assert_eq!(sent[1][1], "a@example.com");
        assert_eq!(sent[2][1], "b@example.com");
    }

    #[test]
    fn test_detects_header_from_other_mode() {
        let dir = TempDir::new().unwrap();
        OutcomeLog::open(&log_config(&dir, LogMode::Immediate));

        let same = OutcomeLog::open(&log_config(&dir, LogMode::Immediate));
        assert!(same.mismatched_headers().is_empty());

        let config = log_config(&dir, LogMode::Grouped);
        let other = OutcomeLog::open(&config);
        assert_eq!(
            other.mismatched_headers(),
            [config.sent_path.as_path(), config.failed_path.as_path()]
        );
    }

    #[test]
    fn test_unwritable_log_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            sent_path: dir.path().join("missing-dir").join("sent.csv"),
            failed_path: dir.path().join("missing-dir").join("failed.csv"),
            mode: LogMode::Immediate,
        };

        let mut log = OutcomeLog::open(&config);
        log.record(OutcomeEntry::sent("a@example.com", "A", "Hello", "Body"));
        log.flush();

        assert_eq!(log.sent_count(), 1);
        assert!(!config.sent_path.exists());
    }
}
