//! Recipient record types

/// One CSV row, keyed by column name in header order
///
/// A field is `None` when the row is shorter than the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRecord {
    /// 1-based data row number (header excluded)
    pub row: usize,
    fields: Vec<(String, Option<String>)>,
}

impl RecipientRecord {
    pub fn new(fields: Vec<(String, Option<String>)>) -> Self {
        Self { row: 0, fields }
    }

    /// Build a record from raw CSV values aligned with `headers`
    pub fn from_row(row: usize, headers: &[String], values: &csv::StringRecord) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), values.get(i).map(str::to_string)))
            .collect();

        Self { row, fields }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Option<String>)> {
        self.fields.iter().map(|(k, v)| (k, v))
    }

    /// Raw field lookup: `None` if the column is unknown, `Some(None)` if null
    pub fn field(&self, column: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_deref())
    }

    /// Recipient address, trimmed; `None` when absent, null or blank
    pub fn email(&self, column: &str) -> Option<&str> {
        self.field(column)
            .flatten()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// Display name, `"Unknown"` when the column does not exist
    pub fn display_name(&self, column: &str) -> String {
        match self.field(column) {
            Some(value) => value.unwrap_or_default().to_string(),
            None => "Unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RecipientRecord {
        RecipientRecord::new(vec![
            ("email".to_string(), Some("  ana@example.com ".to_string())),
            ("name".to_string(), None),
            ("blank".to_string(), Some("   ".to_string())),
        ])
    }

    #[test]
    fn test_email_lookup() {
        let record = record();

        assert_eq!(record.email("email"), Some("ana@example.com"));
        assert_eq!(record.email("blank"), None);
        assert_eq!(record.email("name"), None);
        assert_eq!(record.email("missing"), None);
    }

    #[test]
    fn test_display_name() {
        let record = record();

        assert_eq!(record.display_name("name"), "");
        assert_eq!(record.display_name("missing"), "Unknown");
    }

    #[test]
    fn test_from_short_row() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let values = csv::StringRecord::from(vec!["1"]);

        let record = RecipientRecord::from_row(3, &headers, &values);

        assert_eq!(record.row, 3);
        assert_eq!(record.field("a"), Some(Some("1")));
        assert_eq!(record.field("b"), Some(None));
    }
}
