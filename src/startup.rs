use crate::config::Config;
use crate::dispatch::SmtpDispatcher;
use crate::error::Error;
use crate::extractor::{EventExtractor, GeminiGenerator};
use crate::invite::InviteBuilder;
use crate::mailbox::ImapMailbox;
use crate::pipeline::Orchestrator;
use crate::store::EventStore;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and validate the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Wire up the collaborators and process one batch of messages.
///
/// The mailbox session and storage connection live for the duration of the
/// run and are released on every exit path.
pub async fn run_batch(config: Config) -> miette::Result<()> {
    let timezone = config.timezone()?;

    // A mailbox or storage fault here aborts before any message is processed
    let mailbox = ImapMailbox::connect(&config)?;
    let store = EventStore::open(&config.database_path)?;

    let generator = Arc::new(GeminiGenerator::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    ));
    let extractor = EventExtractor::new(generator);
    let builder = InviteBuilder::new(timezone, config.email_address.clone());
    let dispatcher = SmtpDispatcher::new(&config)?;

    let mut orchestrator = Orchestrator::new(
        Box::new(mailbox),
        extractor,
        store,
        builder,
        Box::new(dispatcher),
        config.email_address.clone(),
        config.subject_filter.clone(),
    );

    let result = orchestrator.run().await;
    orchestrator.shutdown();

    match result {
        Ok(summary) => {
            info!(
                "Run complete: {} invite(s) sent for {} message(s)",
                summary.invited, summary.fetched
            );
            Ok(())
        }
        Err(e) => {
            error!("Batch run failed: {:?}", e);
            Err(e.into())
        }
    }
}
