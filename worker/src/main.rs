use anyhow::Context;
use headlock_server::auth::{SasTokenGenerator, TokenProvider};
use headlock_server::config::WorkerConfig;
use headlock_server::disposition::{MessageProcessor, ProcessOutcome};
use headlock_server::transport::{QueueEndpoint, ServiceBusRestClient};

mod logger;

/// Peeks the head of the configured queue once and disposes of it.
///
/// Only configuration problems make the process fail; transport failures are
/// logged and the next scheduled run tries again.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = WorkerConfig::from_env().context("Failed to load worker configuration")?;
    logger::setup_logger(config.log_level(), config.log_file())
        .context("Failed to initialize logger")?;

    let queue_path = config.queue_path();
    let endpoint = config.endpoint();
    log::info!("Processing head of {endpoint}/{queue_path}");

    let token = SasTokenGenerator::new(&endpoint, config.key_name(), config.key().clone())
        .token_for(&queue_path)
        .context("Failed to sign access token")?;

    let transport = ServiceBusRestClient::new(QueueEndpoint::new(&endpoint, &queue_path), token)
        .context("Failed to create HTTP client")?;

    let outcome = MessageProcessor::new(transport, &config).process_head().await;
    report(&outcome);

    Ok(())
}

fn report(outcome: &ProcessOutcome) {
    if let Some(decision) = outcome.decision() {
        log::info!(
            "Decision: {} (delivery count {}, over threshold: {})",
            decision.disposition.name(),
            decision.effective_delivery_count,
            decision.exceeds_max_delivery
        );
    }

    match outcome {
        ProcessOutcome::QueueEmpty => log::info!("Done: queue empty"),
        ProcessOutcome::PeekFailed(error) => log::error!("Done: peek failed: {error}"),
        ProcessOutcome::NoActionPossible { .. } => log::info!("Done: no action possible"),
        ProcessOutcome::Deleted { .. } => log::info!("Done: message deleted"),
        ProcessOutcome::Released { .. } => log::info!("Done: message released"),
        ProcessOutcome::Requeued { scheduled_for, .. } => log::info!(
            "Done: message requeued for {}",
            scheduled_for.to_rfc3339()
        ),
        ProcessOutcome::ActionFailed { action, error, .. } => {
            log::error!("Done: {action} failed: {error}")
        }
        ProcessOutcome::PartialRequeueFailure { error, .. } => log::error!(
            "Done: requeue not acknowledged, original message still locked: {error}"
        ),
    }

    if outcome.requires_attention() {
        log::warn!("This run needs operator attention");
    }
}
