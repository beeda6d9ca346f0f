//! SMTP relay session
//!
//! Holds one lettre connection for the whole batch. [`SmtpRelay::connect`]
//! opens it, secures it and authenticates before any recipient is
//! processed; every [`Relay::send`] then runs one mail transaction on that
//! same connection. A refused transaction is reset with `RSET` so the
//! session survives it. The session ends with [`SmtpRelay::close`] or when
//! the relay is dropped.

use crate::config::{Credentials, RelayConfig, TlsMode};
use crate::error::{MailMergeError, Result};
use crate::relay::Relay;
use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials as SmtpCredentials, DEFAULT_MECHANISMS};
use lettre::transport::smtp::client::{AsyncSmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Data, Mail, Rcpt, Rset};
use lettre::transport::smtp::extension::{ClientId, Extension, MailBodyParameter, MailParameter};
use lettre::transport::smtp::Error as SmtpError;
use lettre::Message;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Reply codes meaning the relay refused our credentials
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

/// Authenticated session with the outbound relay
pub struct SmtpRelay {
    session: Mutex<AsyncSmtpConnection>,
    server: String,
    timeout: Duration,
}

impl SmtpRelay {
    /// Open, secure and authenticate the relay session
    ///
    /// # Errors
    /// - [`MailMergeError::RelayAuthFailed`] if the relay rejects the login
    /// - [`MailMergeError::RelayUnavailable`] for any other failure to
    ///   establish the session (DNS, TLS, refused connection, timeout)
    pub async fn connect(config: &RelayConfig, credentials: &Credentials) -> Result<Self> {
        let server = format!("{}:{}", config.host, config.port);
        let timeout = Duration::from_secs(config.timeout_secs);
        let hello = ClientId::default();

        info!("Connecting to relay {} as {}", server, credentials.username);

        let wrapper = match config.tls {
            TlsMode::Wrapper => Some(tls_parameters(&config.host)?),
            TlsMode::Starttls | TlsMode::None => None,
        };

        let mut session = AsyncSmtpConnection::connect_tokio1(
            (config.host.as_str(), config.port),
            Some(timeout),
            &hello,
            wrapper,
            None,
        )
        .await
        .map_err(|e| unavailable(&server, e))?;

        if config.tls == TlsMode::Starttls {
            session
                .starttls(tls_parameters(&config.host)?, &hello)
                .await
                .map_err(|e| unavailable(&server, e))?;
        }

        let login = SmtpCredentials::new(credentials.username.clone(), credentials.password.clone());
        if let Err(e) = session.auth(DEFAULT_MECHANISMS, &login).await {
            error!("Login on {} failed: {}", server, e);
            session.abort().await;
            return Err(classify_auth_error(e));
        }

        info!("Login successful on {}", server);
        Ok(Self {
            session: Mutex::new(session),
            server,
            timeout,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// End the session politely
    pub async fn close(self) {
        let mut session = self.session.into_inner();
        if !session.has_broken() {
            if let Err(e) = session.quit().await {
                debug!("QUIT on {} failed: {}", self.server, e);
            }
        }
    }
}

#[async_trait]
impl Relay for SmtpRelay {
    async fn send(&self, message: Message) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.has_broken() {
            return Err(MailMergeError::RelayRejected(format!(
                "session with {} is closed",
                self.server
            )));
        }

        let outcome = tokio::time::timeout(self.timeout, transaction(&mut session, &message)).await;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.status().is_some() => {
                // Refused by the relay: reset the transaction, keep the session
                if let Err(reset) = session.command(Rset).await {
                    warn!("RSET on {} failed: {}", self.server, reset);
                    session.abort().await;
                }
                Err(MailMergeError::RelayRejected(e.to_string()))
            }
            Ok(Err(e)) => {
                session.abort().await;
                Err(MailMergeError::RelayRejected(e.to_string()))
            }
            Err(_) => {
                session.abort().await;
                Err(MailMergeError::RelayRejected(format!(
                    "no answer from {} within {}s",
                    self.server,
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// One MAIL/RCPT/DATA transaction on the held connection
async fn transaction(
    session: &mut AsyncSmtpConnection,
    message: &Message,
) -> std::result::Result<(), SmtpError> {
    let envelope = message.envelope();
    let raw = message.formatted();

    let mut parameters = Vec::new();
    if !raw.is_ascii() && session.server_info().supports_feature(Extension::EightBitMime) {
        parameters.push(MailParameter::Body(MailBodyParameter::EightBitMime));
    }

    session
        .command(Mail::new(envelope.from().cloned(), parameters))
        .await?;
    for recipient in envelope.to() {
        session.command(Rcpt::new(recipient.clone(), vec![])).await?;
    }
    session.command(Data).await?;
    let response = session.message(&raw).await?;

    debug!("Relay accepted message: {:?}", response.code());
    Ok(())
}

fn tls_parameters(host: &str) -> Result<TlsParameters> {
    TlsParameters::new(host.to_string())
        .map_err(|e| MailMergeError::RelayUnavailable(format!("TLS setup for {}: {}", host, e)))
}

fn unavailable(server: &str, error: SmtpError) -> MailMergeError {
    error!("Relay session on {} failed: {}", server, error);
    MailMergeError::RelayUnavailable(error.to_string())
}

/// Map a failed AUTH exchange to its fatal error kind
fn classify_auth_error(error: SmtpError) -> MailMergeError {
    let rejected_login = error
        .status()
        .is_some_and(|code| AUTH_FAILURE_CODES.contains(&code.to_string().as_str()));

    if rejected_login || error.is_permanent() {
        MailMergeError::RelayAuthFailed(error.to_string())
    } else {
        MailMergeError::RelayUnavailable(error.to_string())
    }
}
