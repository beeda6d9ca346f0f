//! Outbound relay
//!
//! - [`Relay`]: the seam the delivery engine sends through
//! - [`smtp`]: one held, authenticated SMTP connection backed by lettre

pub mod smtp;

pub use smtp::SmtpRelay;

use crate::error::Result;
use async_trait::async_trait;
use lettre::Message;

/// A held session able to submit messages one at a time
///
/// Errors returned by [`send`](Relay::send) are per-message: the engine
/// records them against the recipient and moves on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Relay: Send + Sync {
    /// Submit one message
    async fn send(&self, message: Message) -> Result<()>;
}
