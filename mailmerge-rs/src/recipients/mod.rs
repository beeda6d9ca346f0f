//! Recipient source
//!
//! - [`reader`]: CSV reader with header validation
//! - [`types`]: the per-row record

pub mod reader;
pub mod types;

pub use reader::RecipientReader;
pub use types::RecipientRecord;
