use crate::dispatch::InviteDispatcher;
use crate::error::BotResult;
use crate::extractor::EventExtractor;
use crate::invite::InviteBuilder;
use crate::mailbox::{FetchedMessage, Mailbox};
use crate::model::EventRecord;
use crate::store::EventStore;
use tracing::{error, info, warn};

/// Terminal state of one processed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    InviteSent,
    SkippedDuplicate,
    InviteFailed,
}

/// Counters for one batch run
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    pub fetched: usize,
    pub invited: usize,
    pub skipped_duplicates: usize,
    pub invite_failures: usize,
}

/// Drives each fetched message through extraction, dedup, persistence and
/// dispatch, one message at a time, in mailbox search order.
///
/// Mailbox and storage failures corrupt shared batch state and abort the
/// run; invite build and dispatch failures are logged and isolated to the
/// current message.
pub struct Orchestrator {
    mailbox: Box<dyn Mailbox>,
    extractor: EventExtractor,
    store: EventStore,
    builder: InviteBuilder,
    dispatcher: Box<dyn InviteDispatcher>,
    mailbox_address: String,
    subject_filter: String,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        mailbox: Box<dyn Mailbox>,
        extractor: EventExtractor,
        store: EventStore,
        builder: InviteBuilder,
        dispatcher: Box<dyn InviteDispatcher>,
        mailbox_address: String,
        subject_filter: String,
    ) -> Self {
        Self {
            mailbox,
            extractor,
            store,
            builder,
            dispatcher,
            mailbox_address,
            subject_filter,
        }
    }

    /// Process one batch of matching messages
    pub async fn run(&mut self) -> BotResult<BatchSummary> {
        let uids = self.mailbox.search(&self.subject_filter)?;

        let mut summary = BatchSummary {
            fetched: uids.len(),
            ..BatchSummary::default()
        };

        for uid in uids {
            let message = self.mailbox.fetch(uid)?;
            match self.process_message(&message).await? {
                MessageOutcome::InviteSent => summary.invited += 1,
                MessageOutcome::SkippedDuplicate => summary.skipped_duplicates += 1,
                MessageOutcome::InviteFailed => summary.invite_failures += 1,
            }
        }

        info!(
            "Batch finished: {} fetched, {} invited, {} duplicates skipped, {} invite failures",
            summary.fetched, summary.invited, summary.skipped_duplicates, summary.invite_failures
        );
        Ok(summary)
    }

    /// Drive one message to a terminal state.
    ///
    /// Returns Err only for storage faults, which abort the batch.
    async fn process_message(&mut self, message: &FetchedMessage) -> BotResult<MessageOutcome> {
        info!("Processing message {} from '{}'", message.uid, message.sender);

        // Extraction never fails; parse problems arrive as fallback records
        let record = self.extractor.extract(&message.body).await;

        let Some(stored) = self.store.persist(&self.mailbox_address, &record)? else {
            info!(
                "Skipping duplicate event '{}' from message {}",
                record.name, message.uid
            );
            return Ok(MessageOutcome::SkippedDuplicate);
        };

        match self.send_invite(&message.sender, &record).await {
            Ok(()) => Ok(MessageOutcome::InviteSent),
            Err(e) => {
                error!(
                    "Failed to send invite for event {} (message {}): {}",
                    stored.id, message.uid, e
                );
                Ok(MessageOutcome::InviteFailed)
            }
        }
    }

    async fn send_invite(&self, recipient: &str, record: &EventRecord) -> BotResult<()> {
        let ics = self.builder.build(record)?;
        self.dispatcher.send_invite(recipient, record, &ics).await
    }

    /// Release the mailbox session; called on every exit path of a run
    pub fn shutdown(&mut self) {
        if let Err(e) = self.mailbox.logout() {
            warn!("Failed to log out from mailbox: {}", e);
        }
    }
}
