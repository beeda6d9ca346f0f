//! mailmerge-rs: Personalized bulk email delivery
//!
//! Reads recipients from a CSV file, renders a subject and an HTML body
//! template per recipient, and submits each message through one
//! authenticated SMTP session.
//!
//! # Features
//!
//! - **Templates**: `{column}` placeholders; other braces (CSS, JSON) pass through
//! - **Isolation**: a failing recipient is logged and the batch moves on
//! - **Dry run**: render, validate and preview without connecting anywhere
//! - **Outcome logs**: append-only `sent_emails.csv` / `failed_emails.csv`
//!
//! # Example
//!
//! ```no_run
//! use mailmerge_rs::batch::{Batch, BatchSettings};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut settings = BatchSettings::new("people.csv", "subject.txt", "body.html");
//!     settings.dry_run = true;
//!
//!     let summary = Batch::prepare(settings)?.run().await?;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`batch`]: Batch preparation and sequencing
//! - [`config`]: Sender identity, relay and log settings
//! - [`delivery`]: Per-recipient render/send loop
//! - [`error`]: Error types and failure classification
//! - [`outcome`]: Sent/failed outcome logs
//! - [`recipients`]: CSV recipient source
//! - [`relay`]: Outbound SMTP session
//! - [`templates`]: Template loading and rendering

pub mod batch;
pub mod config;
pub mod delivery;
pub mod error;
pub mod outcome;
pub mod recipients;
pub mod relay;
pub mod templates;

// Re-export commonly used types
pub use config::Config;
pub use error::{MailMergeError, Result};
