//! Delivery engine
//!
//! Turns recipient records into rendered messages and hands them to a
//! relay, or to the dry-run previewer, one record at a time.

pub mod engine;
pub mod message;
pub mod types;

pub use engine::{DeliveryEngine, PreparedMessage, Rejection};
pub use message::compose;
pub use types::{BatchSummary, BodyFormat, DeliveryMode};
