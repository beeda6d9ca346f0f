//! Email templates
//!
//! Subject and body templates are plain files with `{column}` placeholders,
//! rendered once per recipient against that recipient's fields.

pub mod renderer;
pub mod types;

pub use renderer::TemplateRenderer;
pub use types::{MessageTemplate, RenderContext, RenderedMessage, Template};
