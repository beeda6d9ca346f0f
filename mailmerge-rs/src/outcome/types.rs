//! Outcome entries and log layout

use crate::error::{FailureKind, MailMergeError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Characters of body kept in grouped rows and used as the grouping key
pub const PREVIEW_CHARS: usize = 400;

/// How outcomes reach the log files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Accumulate per (subject, body preview) and write one row per group on flush
    #[default]
    Grouped,
    /// Append one row per recipient as soon as the attempt concludes
    Immediate,
}

impl LogMode {
    pub fn sent_headers(&self) -> &'static [&'static str] {
        match self {
            LogMode::Grouped => &[
                "timestamp",
                "recipient_emails",
                "recipient_names",
                "subject",
                "body_preview",
            ],
            LogMode::Immediate => &[
                "timestamp",
                "recipient_email",
                "recipient_name",
                "subject",
                "body",
            ],
        }
    }

    pub fn failed_headers(&self) -> &'static [&'static str] {
        match self {
            LogMode::Grouped => &[
                "timestamp",
                "recipient_emails",
                "recipient_names",
                "subject",
                "body_preview",
                "reason",
            ],
            LogMode::Immediate => &[
                "timestamp",
                "recipient_email",
                "recipient_name",
                "subject",
                "body",
                "reason",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Sent,
    Failed { kind: FailureKind, reason: String },
}

/// Result of one recipient's attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEntry {
    pub timestamp: DateTime<Utc>,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub status: OutcomeStatus,
}

impl OutcomeEntry {
    pub fn sent(
        recipient_email: impl Into<String>,
        recipient_name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            recipient_email: recipient_email.into(),
            recipient_name: recipient_name.into(),
            subject: subject.into(),
            body: body.into(),
            status: OutcomeStatus::Sent,
        }
    }

    pub fn failed(
        recipient_email: impl Into<String>,
        recipient_name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        error: &MailMergeError,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            recipient_email: recipient_email.into(),
            recipient_name: recipient_name.into(),
            subject: subject.into(),
            body: body.into(),
            status: OutcomeStatus::Failed {
                kind: error.failure_kind().unwrap_or(FailureKind::Delivery),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.status, OutcomeStatus::Sent)
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Sent => None,
            OutcomeStatus::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match &self.status {
            OutcomeStatus::Sent => None,
            OutcomeStatus::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn body_preview(&self) -> &str {
        preview(&self.body, PREVIEW_CHARS)
    }
}

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
