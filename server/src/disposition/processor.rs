use super::decision::{Decision, Disposition, NoActionReason, decide};
use crate::common::ServiceBusError;
use crate::config::WorkerConfig;
use crate::model::PeekedMessage;
use crate::transport::{PeekResult, QueueTransport};
use chrono::{DateTime, Utc};

/// Log target of dead-letter escalation records, so they can be routed or
/// alerted on separately.
pub const DEAD_LETTER_LOG_TARGET: &str = "headlock::dead_letter";

/// What happened to the head of the queue during one run.
///
/// Failures are values here rather than errors: the worker logs them and exits
/// normally, leaving retries to whatever schedules the next run.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// No message was visible.
    QueueEmpty,
    /// The peek request itself failed.
    PeekFailed(ServiceBusError),
    /// A message was locked but could not be acted on.
    NoActionPossible { decision: Decision },
    Deleted { decision: Decision },
    Released { decision: Decision },
    /// A copy was scheduled and the original deleted.
    Requeued {
        decision: Decision,
        scheduled_for: DateTime<Utc>,
    },
    /// A delete or unlock call failed. `action` names the call.
    ActionFailed {
        decision: Decision,
        action: &'static str,
        error: ServiceBusError,
    },
    /// The scheduled send was not acknowledged; the original stays locked
    /// until its lock expires and nothing was deleted.
    PartialRequeueFailure {
        decision: Decision,
        error: ServiceBusError,
    },
}

impl ProcessOutcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            ProcessOutcome::QueueEmpty | ProcessOutcome::PeekFailed(_) => None,
            ProcessOutcome::NoActionPossible { decision }
            | ProcessOutcome::Deleted { decision }
            | ProcessOutcome::Released { decision }
            | ProcessOutcome::Requeued { decision, .. }
            | ProcessOutcome::ActionFailed { decision, .. }
            | ProcessOutcome::PartialRequeueFailure { decision, .. } => Some(decision),
        }
    }

    /// Whether an operator should look at the queue after this run.
    pub fn requires_attention(&self) -> bool {
        match self {
            ProcessOutcome::PeekFailed(_)
            | ProcessOutcome::ActionFailed { .. }
            | ProcessOutcome::PartialRequeueFailure { .. } => true,
            other => other
                .decision()
                .is_some_and(|decision| decision.exceeds_max_delivery),
        }
    }
}

/// Drives one peek → decide → act cycle against a [`QueueTransport`].
///
/// Each transport call is made at most once. Only a requeue makes two calls,
/// and only when the first one succeeds.
///
/// # Examples
///
/// ```no_run
/// use server::disposition::MessageProcessor;
///
/// async fn run(transport: impl server::transport::QueueTransport, config: &server::config::WorkerConfig) {
///     let outcome = MessageProcessor::new(transport, config).process_head().await;
///     println!("{outcome:?}");
/// }
/// ```
pub struct MessageProcessor<'a, T> {
    transport: T,
    config: &'a WorkerConfig,
}

impl<'a, T: QueueTransport> MessageProcessor<'a, T> {
    pub fn new(transport: T, config: &'a WorkerConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Peeks the head of the queue and disposes of the message found there.
    pub async fn process_head(&self) -> ProcessOutcome {
        match self.transport.peek_head().await {
            Ok(PeekResult::Empty) => {
                log::info!("No message in the queue");
                ProcessOutcome::QueueEmpty
            }
            Ok(PeekResult::Message(message)) => self.process_message(&message, Utc::now()).await,
            Err(error) => {
                log::error!("Failed to peek head message: {error}");
                ProcessOutcome::PeekFailed(error)
            }
        }
    }

    /// Decides and executes the disposition of an already peeked message.
    pub async fn process_message(
        &self,
        message: &PeekedMessage,
        now: DateTime<Utc>,
    ) -> ProcessOutcome {
        log_message(message);

        let decision = decide(message, self.config, now);
        if decision.exceeds_max_delivery {
            self.log_dead_letter_escalation(message, &decision);
        }

        match &decision.disposition {
            Disposition::NoActionPossible(reason) => {
                match reason {
                    NoActionReason::MissingBrokerProperties => log::error!(
                        "BrokerProperties missing, unable to unlock or delete the message"
                    ),
                    NoActionReason::MissingLockOrMessageId => log::info!(
                        "Message ID or Lock Token missing, unable to unlock or delete the message"
                    ),
                }
                ProcessOutcome::NoActionPossible { decision }
            }
            Disposition::Delete(lock) => {
                log::info!("Deleting the message from the queue");
                match self.transport.delete(lock).await {
                    Ok(()) => ProcessOutcome::Deleted { decision },
                    Err(error) => {
                        log::error!("Failed to delete message {}: {error}", lock.message_id);
                        ProcessOutcome::ActionFailed {
                            decision,
                            action: "delete",
                            error,
                        }
                    }
                }
            }
            Disposition::Release(lock) => {
                log::info!("Unlocking the message");
                match self.transport.unlock(lock).await {
                    Ok(()) => ProcessOutcome::Released { decision },
                    Err(error) => {
                        log::error!("Failed to unlock message {}: {error}", lock.message_id);
                        ProcessOutcome::ActionFailed {
                            decision,
                            action: "unlock",
                            error,
                        }
                    }
                }
            }
            Disposition::RequeueThenDelete {
                lock,
                delay_until,
                body,
                delivery_count_applied,
            } => {
                if !delivery_count_applied {
                    log::warn!(
                        "Message {} body is not a JSON object; requeueing it without a DeliveryCount",
                        lock.message_id
                    );
                }
                log::info!(
                    "Requeueing message {} with delivery count {} until {}",
                    lock.message_id,
                    decision.effective_delivery_count,
                    delay_until.to_rfc3339()
                );

                if let Err(error) = self.transport.send_scheduled(*delay_until, body.clone()).await
                {
                    log::error!(
                        "Scheduled send failed, message {} left locked in the queue: {error}",
                        lock.message_id
                    );
                    return ProcessOutcome::PartialRequeueFailure { decision, error };
                }

                let scheduled_for = *delay_until;
                match self.transport.delete(lock).await {
                    Ok(()) => ProcessOutcome::Requeued {
                        decision,
                        scheduled_for,
                    },
                    Err(error) => {
                        log::error!(
                            "Requeued copy scheduled for {} but deleting original {} failed: {error}",
                            scheduled_for.to_rfc3339(),
                            lock.message_id
                        );
                        ProcessOutcome::ActionFailed {
                            decision,
                            action: "delete",
                            error,
                        }
                    }
                }
            }
        }
    }

    fn log_dead_letter_escalation(&self, message: &PeekedMessage, decision: &Decision) {
        log::error!(
            target: DEAD_LETTER_LOG_TARGET,
            "FATAL: message {} (sequence {}) reached delivery count {} of {} and will be dead-lettered; WebhookId: {}",
            message.message_id().unwrap_or("<unknown>"),
            message
                .sequence_number()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            decision.effective_delivery_count,
            self.config.max_delivery_count(),
            message.webhook_id().unwrap_or_else(|| "<none>".to_string())
        );
    }
}

fn log_message(message: &PeekedMessage) {
    log::info!("Message: {}", String::from_utf8_lossy(message.body()));
    log::debug!("Lock Token: {:?}", message.lock_token());
    log::debug!("Message ID: {:?}", message.message_id());
    log::debug!("Sequence Number: {:?}", message.sequence_number());
    log::debug!("Delivery Count: {:?}", message.broker_delivery_count());
    log::debug!(
        "Application Delivery Count: {:?}",
        message.application_delivery_count()
    );
}
