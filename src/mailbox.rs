use crate::config::Config;
use crate::error::{mailbox_error, BotResult};
use mail_parser::MessageParser;
use tracing::{info, warn};

/// One fetched message, reduced to what the pipeline needs
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub uid: u32,
    /// First From address; empty when the header could not be parsed
    pub sender: String,
    /// Decoded body text, preferring the first text/plain part
    pub body: String,
}

/// Mailbox collaborator: subject search and message fetch.
///
/// Any failure here is a fault of shared batch state and aborts the run.
pub trait Mailbox: Send {
    /// Find messages whose subject matches the filter, in ascending order
    fn search(&mut self, subject_filter: &str) -> BotResult<Vec<u32>>;

    /// Fetch and decode one message
    fn fetch(&mut self, uid: u32) -> BotResult<FetchedMessage>;

    /// End the mailbox session
    fn logout(&mut self) -> BotResult<()>;
}

/// IMAP implementation of the mailbox collaborator
pub struct ImapMailbox {
    session: imap::Session<imap::Connection>,
}

impl ImapMailbox {
    /// Connect, log in and select the inbox
    pub fn connect(config: &Config) -> BotResult<Self> {
        info!("Connecting to {}:{}", config.imap_host, config.imap_port);

        let client = imap::ClientBuilder::new(config.imap_host.as_str(), config.imap_port)
            .connect()
            .map_err(|e| mailbox_error(&format!("Failed to connect to IMAP server: {}", e)))?;

        let mut session = client
            .login(&config.email_address, &config.email_password)
            .map_err(|(e, _)| mailbox_error(&format!("IMAP login failed: {}", e)))?;

        session
            .select("INBOX")
            .map_err(|e| mailbox_error(&format!("Failed to select INBOX: {}", e)))?;

        info!("Connected to mailbox {}", config.email_address);
        Ok(Self { session })
    }
}

impl Mailbox for ImapMailbox {
    fn search(&mut self, subject_filter: &str) -> BotResult<Vec<u32>> {
        // IMAP SUBJECT matching is case-insensitive
        let query = format!("SUBJECT \"{}\"", subject_filter);
        let uids = self
            .session
            .uid_search(&query)
            .map_err(|e| mailbox_error(&format!("IMAP search failed: {}", e)))?;

        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        info!("Found {} message(s) matching '{}'", uids.len(), subject_filter);
        Ok(uids)
    }

    fn fetch(&mut self, uid: u32) -> BotResult<FetchedMessage> {
        let messages = self
            .session
            .uid_fetch(uid.to_string(), "RFC822")
            .map_err(|e| mailbox_error(&format!("IMAP fetch failed for {}: {}", uid, e)))?;

        let message = messages
            .iter()
            .next()
            .ok_or_else(|| mailbox_error(&format!("Message {} not found", uid)))?;
        let source = message
            .body()
            .ok_or_else(|| mailbox_error(&format!("Message {} has no body", uid)))?;

        let parsed = MessageParser::default()
            .parse(source)
            .ok_or_else(|| mailbox_error(&format!("Failed to parse message {}", uid)))?;

        let sender = parsed
            .from()
            .and_then(|addrs| addrs.first())
            .and_then(|addr| addr.address())
            .map(|a| a.to_string())
            .unwrap_or_default();
        if sender.is_empty() {
            warn!("Message {} has no parseable sender address", uid);
        }

        let body = parsed
            .body_text(0)
            .map(|s| s.to_string())
            .or_else(|| parsed.body_html(0).map(|s| s.to_string()))
            .unwrap_or_default();

        info!("Fetched message {} from '{}' ({} chars)", uid, sender, body.len());
        Ok(FetchedMessage { uid, sender, body })
    }

    fn logout(&mut self) -> BotResult<()> {
        info!("Logging out from mailbox");
        self.session
            .logout()
            .map_err(|e| mailbox_error(&format!("IMAP logout failed: {}", e)))
    }
}
