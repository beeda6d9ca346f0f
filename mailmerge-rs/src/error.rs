use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailMergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("Template missing or empty: {0}")]
    TemplateMissing(String),

    #[error("Missing credentials: {0}")]
    CredentialsMissing(String),

    #[error("Email column '{column}' not found in CSV headers: {headers:?}")]
    MissingColumn {
        column: String,
        headers: Vec<String>,
    },

    #[error("Relay authentication failed: {0}")]
    RelayAuthFailed(String),

    #[error("Could not establish relay session: {0}")]
    RelayUnavailable(String),

    #[error("template error: variable {0} not found")]
    MissingVariable(String),

    #[error("template error: {0}")]
    MalformedTemplate(String),

    #[error("no recipient email")]
    NoRecipientEmail,

    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("relay rejected message: {0}")]
    RelayRejected(String),

    #[error("unreadable record: {0}")]
    UnreadableRecord(String),
}

/// How a per-record failure is classified in the outcome log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Subject or body could not be rendered
    Template,
    /// The record has no usable recipient address
    MissingRecipient,
    /// The relay refused or failed to carry the message
    Delivery,
    /// The CSV row itself could not be decoded
    Source,
}

impl MailMergeError {
    /// Errors that stop the batch before or instead of processing records
    pub fn is_fatal(&self) -> bool {
        self.failure_kind().is_none()
    }

    /// Per-record classification, `None` for batch-level errors
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            MailMergeError::MissingVariable(_) | MailMergeError::MalformedTemplate(_) => {
                Some(FailureKind::Template)
            }
            MailMergeError::NoRecipientEmail | MailMergeError::InvalidAddress(_) => {
                Some(FailureKind::MissingRecipient)
            }
            MailMergeError::RelayRejected(_) => Some(FailureKind::Delivery),
            MailMergeError::UnreadableRecord(_) => Some(FailureKind::Source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MailMergeError>;
