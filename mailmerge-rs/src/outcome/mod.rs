//! Outcome logging
//!
//! Every recipient ends as exactly one [`OutcomeEntry`], sent or failed,
//! recorded in an [`OutcomeLog`] owned by the batch.

pub mod logger;
pub mod types;

pub use logger::OutcomeLog;
pub use types::{LogMode, OutcomeEntry, OutcomeStatus};
