//! Batch orchestration
//!
//! A batch is one run over one recipient source with one pair of
//! templates. Fatal errors surface from [`Batch::prepare`] or from opening
//! the relay session; everything after that is per recipient.

pub mod orchestrator;
pub mod settings;

pub use orchestrator::Batch;
pub use settings::BatchSettings;
