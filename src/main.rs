use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    kutsubotti::startup::init_logging()?;

    info!("Starting Kutsubotti");

    // Load configuration
    let config = kutsubotti::startup::load_config()?;

    // Process one batch of meeting-request emails
    kutsubotti::startup::run_batch(config).await
}
