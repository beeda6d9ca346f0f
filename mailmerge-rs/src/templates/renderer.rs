//! Template rendering with brace-safe variable substitution
//!
//! Templates use single-brace placeholders (`{name}`). Bodies are usually
//! HTML with inline stylesheets, so a naive formatter would trip over
//! `.cls{color:red}`. Rendering therefore runs in three passes:
//!
//! 1. every brace is escaped by doubling it, so nothing is live;
//! 2. `{{key}}` is turned back into `{key}` for each key of the context;
//! 3. live placeholders are substituted and doubled braces collapse back.
//!
//! A placeholder-shaped token left dormant after pass 2 whose name is not a
//! context key is reported as [`MailMergeError::MissingVariable`]. Brace
//! groups that do not look like a name (CSS rules, JSON fragments) are
//! copied through untouched.

use crate::error::{MailMergeError, Result};
use crate::templates::types::RenderContext;

/// Renders subject and body templates against a recipient context
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a template string
    ///
    /// # Errors
    /// - [`MailMergeError::MissingVariable`] if the template names a
    ///   placeholder the context does not provide
    /// - [`MailMergeError::MalformedTemplate`] if a live placeholder is not
    ///   closed
    pub fn render(template: &str, context: &RenderContext) -> Result<String> {
        let escaped = Self::escape_braces(template);
        let armed = Self::restore_placeholders(escaped, context);
        Self::substitute(&armed, context)
    }

    /// Extract the placeholder names a template refers to
    ///
    /// Returns sorted, deduplicated names without braces.
    pub fn placeholders(template: &str) -> Vec<String> {
        let mut names = Vec::new();

        for (start, _) in template.match_indices('{') {
            let after = &template[start + 1..];
            if let Some(end) = after.find('}') {
                let name = &after[..end];
                if is_placeholder_name(name) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        names.dedup();
        names
    }

    fn escape_braces(template: &str) -> String {
        template.replace('{', "{{").replace('}', "}}")
    }

    fn restore_placeholders(mut escaped: String, context: &RenderContext) -> String {
        for key in context.keys() {
            let dormant = format!("{{{{{}}}}}", key);
            if escaped.contains(&dormant) {
                escaped = escaped.replace(&dormant, &format!("{{{}}}", key));
            }
        }
        escaped
    }

    fn substitute(armed: &str, context: &RenderContext) -> Result<String> {
        let mut output = String::with_capacity(armed.len());
        let mut rest = armed;

        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            output.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("{{") {
                if let Some(name) = dormant_placeholder(after) {
                    if !context.contains_key(name) {
                        return Err(MailMergeError::MissingVariable(name.to_string()));
                    }
                }
                output.push('{');
                rest = after;
            } else if let Some(after) = tail.strip_prefix("}}") {
                output.push('}');
                rest = after;
            } else if let Some(after) = tail.strip_prefix('{') {
                let end = after.find('}').ok_or_else(|| {
                    MailMergeError::MalformedTemplate("unclosed placeholder".to_string())
                })?;
                let name = &after[..end];
                let value = context
                    .get(name)
                    .ok_or_else(|| MailMergeError::MissingVariable(name.to_string()))?;
                output.push_str(value);
                rest = &after[end + 1..];
            } else {
                return Err(MailMergeError::MalformedTemplate(
                    "single '}' encountered".to_string(),
                ));
            }
        }

        output.push_str(rest);
        Ok(output)
    }
}

/// Name of an escaped `{{name}}` token starting right after its opening pair
fn dormant_placeholder(after: &str) -> Option<&str> {
    let end = after.find("}}")?;
    let name = &after[..end];
    is_placeholder_name(name).then_some(name)
}

/// Column-like names: word characters, inner spaces and hyphens allowed
fn is_placeholder_name(name: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    match (name.chars().next(), name.chars().last()) {
        (Some(first), Some(last)) => {
            is_word(first) && is_word(last) && name.chars().all(|c| is_word(c) || c == '-' || c == ' ')
        }
        _ => false,
    }
}
