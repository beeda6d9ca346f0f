//! CSV recipient source

use crate::error::{MailMergeError, Result};
use crate::recipients::RecipientRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reads recipient records from a delimited file
///
/// The first row names the columns unless an explicit column list is
/// given, in which case every row is data. The configured email column
/// must exist either way.
pub struct RecipientReader<R = File> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
}

impl RecipientReader<File> {
    /// Open a CSV file and validate its header
    pub fn open<P: AsRef<Path>>(
        path: P,
        email_column: &str,
        columns: Option<&[String]>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            MailMergeError::DataSource(format!("'{}' could not be opened: {}", path.display(), e))
        })?;

        debug!("Reading recipients from {}", path.display());
        Self::from_reader(file, email_column, columns)
    }
}

impl<R: Read> RecipientReader<R> {
    pub fn from_reader(source: R, email_column: &str, columns: Option<&[String]>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(columns.is_none())
            .flexible(true)
            .from_reader(source);

        let headers = match columns {
            Some(columns) => columns.to_vec(),
            None => reader
                .headers()
                .map_err(|e| MailMergeError::DataSource(format!("failed to read CSV header: {}", e)))?
                .iter()
                .map(str::to_string)
                .collect(),
        };

        if !headers.iter().any(|h| h == email_column) {
            return Err(MailMergeError::MissingColumn {
                column: email_column.to_string(),
                headers,
            });
        }

        Ok(Self { reader, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Consume the reader, yielding one result per data row
    ///
    /// A row that cannot be decoded is yielded as
    /// [`MailMergeError::UnreadableRecord`] so it can be counted and logged
    /// like any other failed recipient.
    pub fn into_records(self) -> impl Iterator<Item = Result<RecipientRecord>> {
        let headers = self.headers;

        self.reader
            .into_records()
            .enumerate()
            .map(move |(index, row)| {
                let row = row.map_err(|e| {
                    MailMergeError::UnreadableRecord(format!("row {}: {}", index + 1, e))
                })?;
                Ok(RecipientRecord::from_row(index + 1, &headers, &row))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Ad-Soyad,E-Posta Adresi,Telefon\n\
                       Ana,ana@example.com,555\n\
                       Lee,,\n\
                       Short\n";

    #[test]
    fn test_reads_header_and_rows() {
        let reader = RecipientReader::from_reader(CSV.as_bytes(), "E-Posta Adresi", None).unwrap();
        assert_eq!(reader.headers(), ["Ad-Soyad", "E-Posta Adresi", "Telefon"]);

        let records: Vec<_> = reader.into_records().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].email("E-Posta Adresi"), Some("ana@example.com"));
        assert_eq!(records[1].email("E-Posta Adresi"), None);
        assert_eq!(records[2].row, 3);
        assert_eq!(records[2].field("Telefon"), Some(None));
    }

    #[test]
    fn test_missing_email_column() {
        let err = RecipientReader::from_reader(CSV.as_bytes(), "email", None)
            .err()
            .unwrap();

        match err {
            MailMergeError::MissingColumn { column, headers } => {
                assert_eq!(column, "email");
                assert_eq!(headers.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_columns_read_first_row_as_data() {
        let columns = vec!["name".to_string(), "email".to_string()];
        let data = "Ana,ana@example.com\nLee,lee@example.com\n";

        let reader = RecipientReader::from_reader(data.as_bytes(), "email", Some(&columns)).unwrap();
        let records: Vec<_> = reader.into_records().collect::<Result<_>>().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display_name("name"), "Ana");
    }

    #[test]
    fn test_empty_file_has_no_email_column() {
        let err = RecipientReader::from_reader("".as_bytes(), "email", None)
            .err()
            .unwrap();

        assert!(matches!(err, MailMergeError::MissingColumn { .. }));
    }

    #[test]
    fn test_invalid_utf8_row_is_unreadable() {
        let mut data = b"name,email\nAna,ana@example.com\n".to_vec();
        data.extend_from_slice(b"\xff\xfe,bad@example.com\n");

        let reader = RecipientReader::from_reader(data.as_slice(), "email", None).unwrap();
        let rows: Vec<_> = reader.into_records().collect();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        assert!(matches!(rows[1], Err(MailMergeError::UnreadableRecord(_))));
    }
}
