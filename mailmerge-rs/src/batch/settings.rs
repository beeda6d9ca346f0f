//! Batch settings

use crate::delivery::BodyFormat;
use crate::outcome::LogMode;
use std::path::PathBuf;

pub const DEFAULT_EMAIL_COLUMN: &str = "E-Posta Adresi";
pub const DEFAULT_NAME_COLUMN: &str = "Ad-Soyad";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Everything needed to prepare one batch
///
/// The `Option` log fields override the config file when set.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub data_source: PathBuf,
    pub subject_template: PathBuf,
    pub body_template: PathBuf,
    pub config_path: PathBuf,
    pub dry_run: bool,
    pub email_column: String,
    pub name_column: String,
    /// Column names for a headerless source
    pub columns: Option<Vec<String>>,
    pub log_mode: Option<LogMode>,
    pub sent_log: Option<PathBuf>,
    pub failed_log: Option<PathBuf>,
    pub body_format: BodyFormat,
}

impl BatchSettings {
    pub fn new(
        data_source: impl Into<PathBuf>,
        subject_template: impl Into<PathBuf>,
        body_template: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_source: data_source.into(),
            subject_template: subject_template.into(),
            body_template: body_template.into(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            dry_run: false,
            email_column: DEFAULT_EMAIL_COLUMN.to_string(),
            name_column: DEFAULT_NAME_COLUMN.to_string(),
            columns: None,
            log_mode: None,
            sent_log: None,
            failed_log: None,
            body_format: BodyFormat::default(),
        }
    }
}
