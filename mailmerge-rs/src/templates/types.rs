//! Template types and data structures

use crate::error::{MailMergeError, Result};
use crate::recipients::RecipientRecord;
use std::path::Path;

/// Context keys added to every recipient's fields
pub const SENDER_NAME_KEYS: [&str; 2] = ["sender_name", "SENDER_NAME"];

/// A subject or body template loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Where the template came from, for diagnostics
    pub source: String,
    /// Trimmed template text
    pub content: String,
}

impl Template {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }

    /// Load a template file, rejecting missing or blank files
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();

        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                MailMergeError::TemplateMissing(format!("'{}' not found", source))
            }
            _ => MailMergeError::TemplateMissing(format!("'{}' could not be read: {}", source, e)),
        })?;

        let content = raw.trim();
        if content.is_empty() {
            return Err(MailMergeError::TemplateMissing(format!("'{}' is empty", source)));
        }

        Ok(Self::new(source, content))
    }
}

/// Subject and body templates shared by every record of a batch
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub subject: Template,
    pub body: Template,
}

impl MessageTemplate {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(subject: P, body: Q) -> Result<Self> {
        Ok(Self {
            subject: Template::from_file(subject)?,
            body: Template::from_file(body)?,
        })
    }
}

/// Ordered key/value mapping used to resolve placeholders for one recipient
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    entries: Vec<(String, String)>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fields plus the sender name, with null fields rendered as ""
    pub fn for_recipient(record: &RecipientRecord, sender_name: &str) -> Self {
        let mut context = Self::new();
        for (column, value) in record.fields() {
            context.insert(column.clone(), value.clone().unwrap_or_default());
        }
        for key in SENDER_NAME_KEYS {
            context.insert(key, sender_name);
        }
        context
    }

    /// Insert or replace a value, keeping the first insertion position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RenderContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Self::new();
        for (key, value) in iter {
            context.insert(key, value);
        }
        context
    }
}

/// Subject and body after substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_template_from_file_trims() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "\n  Hello {{name}}  \n").unwrap();

        let template = Template::from_file(file.path()).unwrap();
        assert_eq!(template.content, "Hello {name}");
    }

    #[test]
    fn test_template_empty_file_is_missing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();

        let err = Template::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MailMergeError::TemplateMissing(_)));
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_template_absent_file_is_missing() {
        let err = Template::from_file("/nonexistent/subject.txt").unwrap_err();
        assert!(matches!(err, MailMergeError::TemplateMissing(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_context_for_recipient() {
        let record = RecipientRecord::new(vec![
            ("name".to_string(), Some("Ana".to_string())),
            ("phone".to_string(), None),
        ]);

        let context = RenderContext::for_recipient(&record, "Org");

        assert_eq!(context.get("name"), Some("Ana"));
        assert_eq!(context.get("phone"), Some(""));
        assert_eq!(context.get("sender_name"), Some("Org"));
        assert_eq!(context.get("SENDER_NAME"), Some("Org"));
        assert_eq!(context.len(), 4);
    }

    #[test]
    fn test_context_insert_replaces() {
        let mut context: RenderContext = [("a", "1"), ("b", "2")].into_iter().collect();
        context.insert("a", "3");

        assert_eq!(context.get("a"), Some("3"));
        assert_eq!(context.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
