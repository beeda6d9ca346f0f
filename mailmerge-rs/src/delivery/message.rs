//! MIME message construction

use crate::config::SenderIdentity;
use crate::delivery::BodyFormat;
use crate::error::{MailMergeError, Result};
use crate::templates::RenderedMessage;
use lettre::message::{Mailbox, SinglePart};
use lettre::{Address, Message};

/// Build the message for one recipient
///
/// # Errors
/// [`MailMergeError::InvalidAddress`] if the recipient address does not
/// parse, [`MailMergeError::Config`] if the sender address does not.
pub fn compose(
    sender: &SenderIdentity,
    recipient_email: &str,
    recipient_name: &str,
    rendered: &RenderedMessage,
    format: BodyFormat,
) -> Result<Message> {
    let from = mailbox(&sender.name, &sender.email).map_err(|e| match e {
        MailMergeError::InvalidAddress(detail) => {
            MailMergeError::Config(format!("sender address {}", detail))
        }
        other => other,
    })?;
    let to = mailbox(recipient_name, recipient_email)?;

    let body = match format {
        BodyFormat::Html => SinglePart::html(rendered.body.clone()),
        BodyFormat::Plain => SinglePart::plain(rendered.body.clone()),
    };

    Message::builder()
        .from(from)
        .to(to)
        .subject(rendered.subject.as_str())
        .singlepart(body)
        .map_err(|e| MailMergeError::InvalidAddress(e.to_string()))
}

fn mailbox(name: &str, email: &str) -> Result<Mailbox> {
    let address: Address = email
        .parse()
        .map_err(|e| MailMergeError::InvalidAddress(format!("'{}': {}", email, e)))?;

    let name = name.trim();
    Ok(Mailbox::new((!name.is_empty()).then(|| name.to_string()), address))
}
