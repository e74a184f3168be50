use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use claims::{assert_matches, assert_none, assert_some};
use serde_json::{Value, json};
use server::auth::SasKey;
use server::common::{ServiceBusError, ServiceBusResult};
use server::config::WorkerConfig;
use server::disposition::{Disposition, MessageProcessor, NoActionReason, ProcessOutcome};
use server::model::{BrokerProperties, MessageLock, PeekedMessage};
use server::transport::{PeekResult, QueueTransport};
use std::sync::Mutex;

// Scripted transport recording every call made by the processor
mod scripted_transport {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Peek,
        Delete(MessageLock),
        Unlock(MessageLock),
        SendScheduled(DateTime<Utc>, Vec<u8>),
    }

    pub struct ScriptedTransport {
        pub peek: ServiceBusResult<PeekResult>,
        pub delete: ServiceBusResult<()>,
        pub unlock: ServiceBusResult<()>,
        pub send: ServiceBusResult<()>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedTransport {
        pub fn with_peek(peek: ServiceBusResult<PeekResult>) -> Self {
            Self {
                peek,
                delete: Ok(()),
                unlock: Ok(()),
                send: Ok(()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_message(message: PeekedMessage) -> Self {
            Self::with_peek(Ok(PeekResult::Message(message)))
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl QueueTransport for ScriptedTransport {
        async fn peek_head(&self) -> ServiceBusResult<PeekResult> {
            self.record(Call::Peek);
            self.peek.clone()
        }

        async fn delete(&self, lock: &MessageLock) -> ServiceBusResult<()> {
            self.record(Call::Delete(lock.clone()));
            self.delete.clone()
        }

        async fn unlock(&self, lock: &MessageLock) -> ServiceBusResult<()> {
            self.record(Call::Unlock(lock.clone()));
            self.unlock.clone()
        }

        async fn send_scheduled(
            &self,
            enqueue_at: DateTime<Utc>,
            body: Vec<u8>,
        ) -> ServiceBusResult<()> {
            self.record(Call::SendScheduled(enqueue_at, body));
            self.send.clone()
        }
    }
}

use scripted_transport::{Call, ScriptedTransport};

fn config() -> WorkerConfig {
    WorkerConfig::new("contoso", "orders", SasKey::new("secret"))
}

fn lock() -> MessageLock {
    MessageLock {
        message_id: "msg-1".to_string(),
        lock_token: "lock-1".to_string(),
    }
}

fn message(delivery_count: Option<u32>, body: Value) -> PeekedMessage {
    PeekedMessage::new(
        Some(BrokerProperties {
            lock_token: Some("lock-1".to_string()),
            message_id: Some("msg-1".to_string()),
            sequence_number: Some(11),
            delivery_count,
        }),
        serde_json::to_vec(&body).unwrap(),
    )
}

fn api_error(operation: &str, status_code: u16) -> ServiceBusError {
    ServiceBusError::ApiError {
        code: format!("HTTP_{status_code}"),
        status_code,
        message: "scripted failure".to_string(),
        request_id: None,
        operation: operation.to_string(),
    }
}

mod peek {
    use super::*;

    #[tokio::test]
    async fn test_empty_queue_makes_no_further_calls() {
        let config = config().with_delete_message(true);
        let processor =
            MessageProcessor::new(ScriptedTransport::with_peek(Ok(PeekResult::Empty)), &config);

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::QueueEmpty);
        assert!(!outcome.requires_attention());
        assert_eq!(processor.transport().calls(), vec![Call::Peek]);
    }

    #[tokio::test]
    async fn test_peek_failure_is_reported_not_raised() {
        let config = config();
        let processor = MessageProcessor::new(
            ScriptedTransport::with_peek(Err(api_error("peek_head", 401))),
            &config,
        );

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::PeekFailed(e) if e.status_code() == Some(401));
        assert!(outcome.requires_attention());
        assert_none!(outcome.decision());
        assert_eq!(processor.transport().calls(), vec![Call::Peek]);
    }
}

mod no_action {
    use super::*;

    #[tokio::test]
    async fn test_missing_lock_token_issues_no_action_calls() {
        let peeked = PeekedMessage::new(
            Some(BrokerProperties {
                lock_token: None,
                message_id: Some("msg-1".to_string()),
                sequence_number: None,
                delivery_count: Some(1),
            }),
            b"{}".to_vec(),
        );
        let config = config().with_delete_message(true);
        let processor = MessageProcessor::new(ScriptedTransport::with_message(peeked), &config);

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::NoActionPossible { .. });
        assert_eq!(processor.transport().calls(), vec![Call::Peek]);
    }

    #[tokio::test]
    async fn test_missing_broker_properties_issues_no_action_calls() {
        let config = config().with_requeue_message(true);
        let processor = MessageProcessor::new(
            ScriptedTransport::with_message(PeekedMessage::new(None, b"{}".to_vec())),
            &config,
        );

        let outcome = processor.process_head().await;

        let decision = assert_some!(outcome.decision());
        assert_eq!(
            decision.disposition,
            Disposition::NoActionPossible(NoActionReason::MissingBrokerProperties)
        );
        assert_eq!(processor.transport().calls(), vec![Call::Peek]);
    }
}

mod release_and_delete {
    use super::*;

    #[tokio::test]
    async fn test_default_mode_releases_with_single_unlock() {
        let config = config();
        let processor =
            MessageProcessor::new(ScriptedTransport::with_message(message(Some(1), json!({}))), &config);

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::Released { .. });
        assert_eq!(
            processor.transport().calls(),
            vec![Call::Peek, Call::Unlock(lock())]
        );
    }

    #[tokio::test]
    async fn test_delete_mode_deletes_even_when_requeue_set() {
        let config = config().with_delete_message(true).with_requeue_message(true);
        let processor =
            MessageProcessor::new(ScriptedTransport::with_message(message(Some(1), json!({}))), &config);

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::Deleted { .. });
        assert_eq!(
            processor.transport().calls(),
            vec![Call::Peek, Call::Delete(lock())]
        );
    }

    #[tokio::test]
    async fn test_unlock_failure_is_not_retried() {
        let config = config();
        let mut transport = ScriptedTransport::with_message(message(Some(1), json!({})));
        transport.unlock = Err(api_error("unlock_message", 410));
        let processor = MessageProcessor::new(transport, &config);

        let outcome = processor.process_head().await;

        assert_matches!(
            &outcome,
            ProcessOutcome::ActionFailed { action: "unlock", error, .. } if error.status_code() == Some(410)
        );
        assert!(outcome.requires_attention());
        assert_eq!(
            processor.transport().calls(),
            vec![Call::Peek, Call::Unlock(lock())]
        );
    }
}

mod requeue {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_requeue_sends_then_deletes() {
        let config = config().with_requeue_message(true);
        let peeked = message(Some(5), json!({"WebhookId": "wh-1", "DeliveryCount": 1}));
        let processor = MessageProcessor::new(ScriptedTransport::with_message(peeked.clone()), &config);

        let outcome = processor.process_message(&peeked, now()).await;

        let expected_at = now() + Duration::seconds(180);
        assert_matches!(
            &outcome,
            ProcessOutcome::Requeued { scheduled_for, .. } if *scheduled_for == expected_at
        );

        let calls = processor.transport().calls();
        assert_eq!(calls.len(), 2);
        match &calls[0] {
            Call::SendScheduled(at, body) => {
                assert_eq!(*at, expected_at);
                let body: Value = serde_json::from_slice(body).unwrap();
                assert_eq!(body, json!({"WebhookId": "wh-1", "DeliveryCount": 2}));
            }
            other => panic!("expected scheduled send first, got {other:?}"),
        }
        assert_eq!(calls[1], Call::Delete(lock()));
    }

    #[tokio::test]
    async fn test_plain_text_body_is_requeued_unchanged() {
        let config = config().with_requeue_message(true);
        let peeked = PeekedMessage::new(
            Some(BrokerProperties {
                lock_token: Some("lock-1".to_string()),
                message_id: Some("msg-1".to_string()),
                sequence_number: None,
                delivery_count: Some(1),
            }),
            b"plain text".to_vec(),
        );
        let processor = MessageProcessor::new(ScriptedTransport::with_message(peeked.clone()), &config);

        let outcome = processor.process_message(&peeked, now()).await;

        let decision = assert_some!(outcome.decision());
        assert_matches!(
            &decision.disposition,
            Disposition::RequeueThenDelete { delivery_count_applied: false, .. }
        );
        assert_eq!(
            processor.transport().calls(),
            vec![
                Call::SendScheduled(now() + Duration::seconds(120), b"plain text".to_vec()),
                Call::Delete(lock()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_send_leaves_original_untouched() {
        let config = config().with_requeue_message(true);
        let peeked = message(Some(2), json!({}));
        let mut transport = ScriptedTransport::with_message(peeked.clone());
        transport.send = Err(api_error("send_scheduled_message", 500));
        let processor = MessageProcessor::new(transport, &config);

        let outcome = processor.process_message(&peeked, now()).await;

        assert_matches!(&outcome, ProcessOutcome::PartialRequeueFailure { .. });
        let calls = processor.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_matches!(&calls[0], Call::SendScheduled(..));
    }

    #[tokio::test]
    async fn test_delete_failure_after_send_is_reported() {
        let config = config().with_requeue_message(true);
        let peeked = message(Some(2), json!({}));
        let mut transport = ScriptedTransport::with_message(peeked.clone());
        transport.delete = Err(api_error("delete_message", 410));
        let processor = MessageProcessor::new(transport, &config);

        let outcome = processor.process_message(&peeked, now()).await;

        assert_matches!(&outcome, ProcessOutcome::ActionFailed { action: "delete", .. });
        assert_eq!(processor.transport().calls().len(), 2);
    }
}

mod escalation {
    use super::*;

    #[tokio::test]
    async fn test_threshold_reached_keeps_configured_disposition() {
        let config = config().with_max_delivery_count(3);
        let processor = MessageProcessor::new(
            ScriptedTransport::with_message(message(None, json!({"DeliveryCount": 2}))),
            &config,
        );

        let outcome = processor.process_head().await;

        assert_matches!(&outcome, ProcessOutcome::Released { .. });
        let decision = assert_some!(outcome.decision());
        assert_eq!(decision.effective_delivery_count, 3);
        assert!(decision.exceeds_max_delivery);
        assert!(outcome.requires_attention());
        assert_eq!(
            processor.transport().calls(),
            vec![Call::Peek, Call::Unlock(lock())]
        );
    }
}
