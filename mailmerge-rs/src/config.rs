//! Sender identity, relay and log settings
//!
//! Settings come from a config file (`config.json` by default, format
//! inferred from the extension) layered under `MAILMERGE_*` environment
//! variables, so a password can stay out of the file
//! (`MAILMERGE_SENDER_PASSWORD`). Nested keys use a double underscore, as in
//! `MAILMERGE_RELAY__PORT`.
//!
//! ```json
//! {
//!   "sender_email": "committee@example.com",
//!   "sender_password": "app-password",
//!   "sender_name": "Organizing Committee",
//!   "relay": { "host": "smtp.gmail.com", "port": 465, "tls": "wrapper" },
//!   "logs": { "sent_path": "sent_emails.csv", "mode": "grouped" }
//! }
//! ```

use crate::error::{MailMergeError, Result};
use crate::outcome::LogMode;
use lettre::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "MAILMERGE";

/// Sender address used when a dry run has no usable config
pub const PLACEHOLDER_SENDER_EMAIL: &str = "no-reply@example.com";

/// Sender name used when a dry run has no usable config
pub const PLACEHOLDER_SENDER_NAME: &str = "Unknown Sender";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_password: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub logs: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_host")]
    pub host: String,
    #[serde(default = "default_relay_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// How the relay connection is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS from the first byte (port 465)
    #[default]
    Wrapper,
    /// Plain connection upgraded with STARTTLS (port 587)
    Starttls,
    /// No encryption, local relays and tests only
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_sent_path")]
    pub sent_path: PathBuf,
    #[serde(default = "default_failed_path")]
    pub failed_path: PathBuf,
    #[serde(default)]
    pub mode: LogMode,
}

fn default_relay_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_relay_port() -> u16 {
    465
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sent_path() -> PathBuf {
    PathBuf::from("sent_emails.csv")
}

fn default_failed_path() -> PathBuf {
    PathBuf::from("failed_emails.csv")
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            tls: TlsMode::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sent_path: default_sent_path(),
            failed_path: default_failed_path(),
            mode: LogMode::default(),
        }
    }
}

/// Who the messages are from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub email: String,
    pub name: String,
}

impl SenderIdentity {
    pub fn placeholder() -> Self {
        Self {
            email: PLACEHOLDER_SENDER_EMAIL.to_string(),
            name: PLACEHOLDER_SENDER_NAME.to_string(),
        }
    }
}

/// Relay login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load settings from `path` (optional) and `MAILMERGE_*` variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading overrides from `vars` instead of
    /// the process environment when given
    pub fn load_with_env<P: AsRef<Path>>(
        path: P,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .map_err(|e| MailMergeError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| MailMergeError::Config(e.to_string()))
    }

    /// Sender identity for real sending; all three keys are mandatory
    pub fn sender_identity(&self) -> Result<SenderIdentity> {
        let missing: Vec<&str> = [
            ("sender_email", &self.sender_email),
            ("sender_password", &self.sender_password),
            ("sender_name", &self.sender_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Err(MailMergeError::CredentialsMissing(missing.join(", ")));
        }

        let email = self.sender_email.as_deref().unwrap_or_default().trim();
        parse_sender(email)?;

        Ok(SenderIdentity {
            email: email.to_string(),
            name: self.sender_name.clone().unwrap_or_default(),
        })
    }

    /// Sender identity for a dry run, filling gaps with placeholders
    pub fn dry_run_identity(&self) -> SenderIdentity {
        let fallback = SenderIdentity::placeholder();
        let pick = |value: &Option<String>, default: String| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or(default)
        };

        let email = pick(&self.sender_email, fallback.email.clone());
        SenderIdentity {
            email: if parse_sender(&email).is_ok() { email } else { fallback.email },
            name: pick(&self.sender_name, fallback.name),
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let identity = self.sender_identity()?;
        Ok(Credentials {
            username: identity.email,
            password: self.sender_password.clone().unwrap_or_default(),
        })
    }
}

fn parse_sender(email: &str) -> Result<Address> {
    email.parse().map_err(|e| {
        MailMergeError::Config(format!("sender_email '{}' is not a valid address: {}", email, e))
    })
}
