use crate::config::Config;
use crate::error::{dispatch_error, BotResult};
use crate::model::EventRecord;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Outbound delivery of a built invite.
///
/// Failures here are local to one message and must not abort the batch.
#[async_trait]
pub trait InviteDispatcher: Send + Sync {
    /// Mail the calendar artifact back to the original sender
    async fn send_invite(&self, recipient: &str, record: &EventRecord, ics: &str) -> BotResult<()>;
}

/// SMTP implementation of the dispatch collaborator
pub struct SmtpDispatcher {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpDispatcher {
    /// Build a transport for the configured relay (implicit TLS)
    pub fn new(config: &Config) -> BotResult<Self> {
        let credentials = Credentials::new(
            config.email_address.clone(),
            config.email_password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| dispatch_error(&format!("Failed to build SMTP transport: {}", e)))?
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.email_address.clone(),
        })
    }

    fn summary_body(record: &EventRecord) -> String {
        let when = record
            .occurrences
            .first()
            .map(|o| o.start_local.clone())
            .unwrap_or_else(|| String::from("Time not specified"));
        let location = record
            .location
            .clone()
            .unwrap_or_else(|| String::from("Location not specified"));

        format!(
            "You're invited to: {}\n\n\
             When: {}\n\
             Where: {}\n\n\
             Participants: {}\n\n\
             This calendar invite was generated automatically. \
             Open the attachment to respond to the scheduling request.\n",
            record.name,
            when,
            location,
            record.participants.join(", ")
        )
    }
}

#[async_trait]
impl InviteDispatcher for SmtpDispatcher {
    async fn send_invite(&self, recipient: &str, record: &EventRecord, ics: &str) -> BotResult<()> {
        info!("Sending calendar invite to {}", recipient);

        let from = self
            .from_address
            .parse()
            .map_err(|e| dispatch_error(&format!("Invalid sender address: {}", e)))?;
        let to = recipient
            .parse()
            .map_err(|e| dispatch_error(&format!("Invalid recipient address '{}': {}", recipient, e)))?;

        let calendar_type = ContentType::parse("text/calendar; method=REQUEST; charset=utf-8")
            .map_err(|e| dispatch_error(&format!("Invalid attachment content type: {}", e)))?;
        let attachment =
            Attachment::new(String::from("invite.ics")).body(ics.to_string(), calendar_type);

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("Calendar Invite: {}", record.name))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(Self::summary_body(record)))
                    .singlepart(attachment),
            )
            .map_err(|e| dispatch_error(&format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| dispatch_error(&format!("SMTP send failed: {}", e)))?;

        info!("Calendar invite sent to {}", recipient);
        Ok(())
    }
}
