//! Delivery types

use crate::relay::Relay;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether rendered messages actually leave the machine
#[derive(Clone, Copy)]
pub enum DeliveryMode<'r> {
    /// Render, validate and preview only; no network I/O
    DryRun,
    /// Submit through a held relay session
    Live(&'r dyn Relay),
}

impl DeliveryMode<'_> {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, DeliveryMode::DryRun)
    }
}

impl fmt::Debug for DeliveryMode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::DryRun => f.write_str("DryRun"),
            DeliveryMode::Live(_) => f.write_str("Live"),
        }
    }
}

/// Content type of the message body part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Html,
    Plain,
}

/// Aggregate counts reported at the end of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Records read from the source
    pub total: usize,
    /// Messages sent (formatted, in a dry run)
    pub sent: usize,
    /// Records that ended as failures
    pub skipped: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CSV rows processed: {}, sent: {}, skipped: {}",
            self.total, self.sent, self.skipped
        )
    }
}
