//! Batch orchestration
//!
//! [`Batch::prepare`] performs every check that can abort the job before a
//! single recipient is touched. [`Batch::run`] then opens the relay session
//! (live mode only), drives the delivery engine and flushes the logs.

use crate::batch::BatchSettings;
use crate::config::{Config, Credentials, RelayConfig, SenderIdentity};
use crate::delivery::{BatchSummary, DeliveryEngine, DeliveryMode};
use crate::error::{MailMergeError, Result};
use crate::outcome::OutcomeLog;
use crate::recipients::RecipientReader;
use crate::relay::{Relay, SmtpRelay};
use crate::templates::types::SENDER_NAME_KEYS;
use crate::templates::{MessageTemplate, TemplateRenderer};
use tracing::{info, warn};

/// A validated batch, ready to run
pub struct Batch {
    settings: BatchSettings,
    template: MessageTemplate,
    sender: SenderIdentity,
    credentials: Option<Credentials>,
    relay: RelayConfig,
    log: OutcomeLog,
    reader: RecipientReader,
}

impl Batch {
    /// Load templates, identity, logs and the recipient source
    ///
    /// # Errors
    /// Any fatal error: missing or empty templates, missing credentials
    /// (live mode only), an unreadable config (live mode only), an
    /// unreadable source or a missing email column.
    pub fn prepare(settings: BatchSettings) -> Result<Self> {
        let template = MessageTemplate::load(&settings.subject_template, &settings.body_template)?;
        info!(
            "Loaded templates {} and {}",
            template.subject.source, template.body.source
        );

        let (config, sender, credentials) = load_identity(&settings)?;

        let mut logs = config.logs.clone();
        if let Some(mode) = settings.log_mode {
            logs.mode = mode;
        }
        if let Some(path) = &settings.sent_log {
            logs.sent_path = path.clone();
        }
        if let Some(path) = &settings.failed_log {
            logs.failed_path = path.clone();
        }
        let log = OutcomeLog::open(&logs);

        let reader = RecipientReader::open(
            &settings.data_source,
            &settings.email_column,
            settings.columns.as_deref(),
        )?;
        info!("CSV columns: {:?}", reader.headers());

        for name in unresolved_placeholders(&template, reader.headers()) {
            warn!("Placeholder {{{}}} has no matching CSV column", name);
        }

        Ok(Self {
            settings,
            template,
            sender,
            credentials,
            relay: config.relay,
            log,
            reader,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub fn sender(&self) -> &SenderIdentity {
        &self.sender
    }

    pub fn headers(&self) -> &[String] {
        self.reader.headers()
    }

    /// Run the batch, opening the relay session first in live mode
    ///
    /// # Errors
    /// [`MailMergeError::RelayAuthFailed`] or
    /// [`MailMergeError::RelayUnavailable`] when the session cannot be
    /// established; no recipient is processed in that case.
    pub async fn run(self) -> Result<BatchSummary> {
        if self.settings.dry_run {
            info!("--- DRY-RUN MODE: no emails will be sent ---");
            return Ok(self.execute(DeliveryMode::DryRun).await);
        }

        let credentials = self
            .credentials
            .clone()
            .ok_or_else(|| MailMergeError::CredentialsMissing("sender_email, sender_password".to_string()))?;
        let relay = SmtpRelay::connect(&self.relay, &credentials).await?;
        info!("Relay session open on {}", relay.server());

        let summary = self.execute(DeliveryMode::Live(&relay)).await;
        relay.close().await;
        Ok(summary)
    }

    /// Run live over a caller-supplied relay
    pub async fn run_with(self, relay: &dyn Relay) -> BatchSummary {
        self.execute(DeliveryMode::Live(relay)).await
    }

    async fn execute(self, mode: DeliveryMode<'_>) -> BatchSummary {
        let Batch {
            settings,
            template,
            sender,
            mut log,
            reader,
            ..
        } = self;

        let engine = DeliveryEngine::new(
            &template,
            &sender,
            &settings.email_column,
            &settings.name_column,
        )
        .with_format(settings.body_format);

        let summary = engine.deliver_all(mode, reader.into_records(), &mut log).await;
        log.flush();

        info!("{}", summary);
        summary
    }
}

/// Resolve the sender identity for the batch's mode
fn load_identity(
    settings: &BatchSettings,
) -> Result<(Config, SenderIdentity, Option<Credentials>)> {
    let path = &settings.config_path;

    if settings.dry_run {
        let config = Config::load(path).unwrap_or_else(|e| {
            warn!("Ignoring unusable config '{}' in dry run: {}", path.display(), e);
            Config::default()
        });
        if let Err(e) = config.sender_identity() {
            warn!("Unusable sender settings in '{}' ({}), using placeholders", path.display(), e);
        }
        let sender = config.dry_run_identity();
        return Ok((config, sender, None));
    }

    let config = Config::load(path)?;
    let with_path = |e: MailMergeError| match e {
        MailMergeError::CredentialsMissing(keys) => {
            MailMergeError::CredentialsMissing(format!("{} (in '{}')", keys, path.display()))
        }
        other => other,
    };
    let sender = config.sender_identity().map_err(with_path)?;
    let credentials = config.credentials().map_err(with_path)?;

    Ok((config, sender, Some(credentials)))
}

/// Placeholders the templates use that no column or sender key provides
pub fn unresolved_placeholders(template: &MessageTemplate, headers: &[String]) -> Vec<String> {
    let mut names = TemplateRenderer::placeholders(&template.subject.content);
    names.extend(TemplateRenderer::placeholders(&template.body.content));
    names.sort();
    names.dedup();

    names
        .into_iter()
        .filter(|name| !headers.iter().any(|h| h == name))
        .filter(|name| !SENDER_NAME_KEYS.contains(&name.as_str()))
        .collect()
}
