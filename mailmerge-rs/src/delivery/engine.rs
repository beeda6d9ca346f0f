//! Per-recipient render, classify, send and log loop

use crate::config::SenderIdentity;
use crate::delivery::message::compose;
use crate::delivery::{BatchSummary, BodyFormat, DeliveryMode};
use crate::error::{MailMergeError, Result};
use crate::outcome::types::preview;
use crate::outcome::{OutcomeEntry, OutcomeLog};
use crate::recipients::RecipientRecord;
use crate::templates::{MessageTemplate, RenderContext, RenderedMessage, TemplateRenderer};
use lettre::Message;
use tracing::{info, warn};

/// Characters of body shown for each dry-run message
const DRY_RUN_PREVIEW_CHARS: usize = 500;

/// A record that rendered and validated, ready to send
#[derive(Debug)]
pub struct PreparedMessage {
    pub recipient_email: String,
    pub recipient_name: String,
    pub rendered: RenderedMessage,
    pub message: Message,
}

/// Why a record stopped before reaching the relay
#[derive(Debug)]
pub struct Rejection {
    pub error: MailMergeError,
    pub recipient_email: String,
    pub recipient_name: String,
    /// Whatever was rendered before the failure
    pub subject: String,
    pub body: String,
}

impl Rejection {
    fn into_entry(self) -> OutcomeEntry {
        OutcomeEntry::failed(
            self.recipient_email,
            self.recipient_name,
            self.subject,
            self.body,
            &self.error,
        )
    }
}

/// Sends one personalized message per recipient record
///
/// Every record ends as exactly one [`OutcomeEntry`]; no per-record
/// failure stops the loop. Dry runs and live runs share [`prepare`], so a
/// dry run predicts the live split except for relay-side rejections.
///
/// [`prepare`]: DeliveryEngine::prepare
pub struct DeliveryEngine<'a> {
    template: &'a MessageTemplate,
    sender: &'a SenderIdentity,
    email_column: &'a str,
    name_column: &'a str,
    format: BodyFormat,
}

impl<'a> DeliveryEngine<'a> {
    pub fn new(
        template: &'a MessageTemplate,
        sender: &'a SenderIdentity,
        email_column: &'a str,
        name_column: &'a str,
    ) -> Self {
        Self {
            template,
            sender,
            email_column,
            name_column,
            format: BodyFormat::default(),
        }
    }

    pub fn with_format(mut self, format: BodyFormat) -> Self {
        self.format = format;
        self
    }

    /// Process every record in order and log each outcome
    pub async fn deliver_all<I>(
        &self,
        mode: DeliveryMode<'_>,
        records: I,
        log: &mut OutcomeLog,
    ) -> BatchSummary
    where
        I: IntoIterator<Item = Result<RecipientRecord>>,
    {
        let mut summary = BatchSummary::default();

        for record in records {
            summary.total += 1;

            let entry = match record {
                Ok(record) => self.deliver_one(mode, &record, summary.total).await,
                Err(e) => {
                    warn!("Skipping row #{}: {}", summary.total, e);
                    OutcomeEntry::failed("", "", "", "", &e)
                }
            };

            if entry.is_sent() {
                summary.sent += 1;
            } else {
                summary.skipped += 1;
            }
            log.record(entry);
        }

        summary
    }

    /// Process a single record; `position` is only used for progress output
    pub async fn deliver_one(
        &self,
        mode: DeliveryMode<'_>,
        record: &RecipientRecord,
        position: usize,
    ) -> OutcomeEntry {
        let prepared = match self.prepare(record) {
            Ok(prepared) => prepared,
            Err(rejection) => {
                warn!(
                    "Skipping row #{} ({}): {}",
                    position, rejection.recipient_name, rejection.error
                );
                return rejection.into_entry();
            }
        };

        let PreparedMessage {
            recipient_email,
            recipient_name,
            rendered,
            message,
        } = prepared;

        match mode {
            DeliveryMode::DryRun => {
                let body_preview = preview(&rendered.body, DRY_RUN_PREVIEW_CHARS);
                let ellipsis = if body_preview.len() < rendered.body.len() {
                    "..."
                } else {
                    ""
                };
                info!(
                    "--- DRY-RUN Message #{} ---\nTo: {} ({})\nSubject: {}\nBody preview:\n{}{}",
                    position, recipient_email, recipient_name, rendered.subject, body_preview, ellipsis
                );
                OutcomeEntry::sent(recipient_email, recipient_name, rendered.subject, rendered.body)
            }
            DeliveryMode::Live(relay) => match relay.send(message).await {
                Ok(()) => {
                    info!("Successfully sent email to: {} ({})", recipient_name, recipient_email);
                    OutcomeEntry::sent(recipient_email, recipient_name, rendered.subject, rendered.body)
                }
                Err(e) => {
                    warn!("Unable to send email to {} ({}): {}", recipient_name, recipient_email, e);
                    OutcomeEntry::failed(
                        recipient_email,
                        recipient_name,
                        rendered.subject,
                        rendered.body,
                        &e,
                    )
                }
            },
        }
    }

    /// Render and validate a record without touching the relay
    ///
    /// Order matters for what the outcome carries: subject, then body, then
    /// the recipient address, then the MIME message.
    pub fn prepare(&self, record: &RecipientRecord) -> std::result::Result<PreparedMessage, Rejection> {
        let recipient_name = record.display_name(self.name_column);
        let recipient_email = record.email(self.email_column).unwrap_or_default().to_string();
        let context = RenderContext::for_recipient(record, &self.sender.name);

        let reject = |error: MailMergeError, subject: &str, body: &str| Rejection {
            error,
            recipient_email: recipient_email.clone(),
            recipient_name: recipient_name.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let subject = TemplateRenderer::render(&self.template.subject.content, &context)
            .map_err(|e| reject(e, "", ""))?;
        let body = TemplateRenderer::render(&self.template.body.content, &context)
            .map_err(|e| reject(e, &subject, ""))?;

        if recipient_email.is_empty() {
            return Err(reject(MailMergeError::NoRecipientEmail, &subject, &body));
        }

        let rendered = RenderedMessage { subject, body };
        let message = compose(
            self.sender,
            &recipient_email,
            &recipient_name,
            &rendered,
            self.format,
        )
        .map_err(|e| reject(e, &rendered.subject, &rendered.body))?;

        Ok(PreparedMessage {
            recipient_email,
            recipient_name,
            rendered,
            message,
        })
    }
}
