//! Queue consumer and delivery state machine
//!
//! Drives one inbound lookup message at a time through decode → validate →
//! process and maps the outcome onto the broker acknowledgement protocol:
//! permanently invalid messages are dropped, transient failures requeued,
//! and completed messages acknowledged regardless of per-record submission
//! failures. After an acknowledgement, a best-effort success notification
//! is published.

use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use thiserror::Error;
use tracing::{error, info, warn};

use teamsearch_common::config::RabbitConfig;
use teamsearch_common::Error;

use crate::models::LookupRequest;
use crate::processor::{self, ProcessError, ProcessingResult};
use crate::services::notifier::SuccessNotifier;
use crate::types::{DiplomaSource, OlympiadSink};

const CONSUMER_TAG: &str = "teamsearch-olymps";

/// Terminal acknowledgement decision for one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryDecision {
    /// Message fully consumed; per-record failures do not redeliver it
    Ack,
    /// Permanently invalid; retrying cannot help
    RejectDrop,
    /// Possibly transient; return to the queue for another attempt
    RejectRequeue,
}

/// Failures while handling one delivery
#[derive(Debug, Error)]
pub enum HandleError {
    /// Malformed payload bytes; will never become valid on retry
    #[error("malformed message body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Map a handling outcome onto the ack protocol.
///
/// Malformed payloads and invalid business data can never succeed on
/// redelivery; anything else is treated as transient and requeued for
/// another consumer attempt.
pub fn decide<T>(outcome: &Result<T, HandleError>) -> DeliveryDecision {
    match outcome {
        Ok(_) => DeliveryDecision::Ack,
        Err(HandleError::Decode(_)) => DeliveryDecision::RejectDrop,
        Err(HandleError::Process(ProcessError::Validation(_))) => DeliveryDecision::RejectDrop,
        Err(HandleError::Process(ProcessError::Other(_))) => DeliveryDecision::RejectRequeue,
    }
}

/// Decode and process one delivery body. Returns the requesting user's id
/// alongside the aggregate so the caller can notify after acknowledging.
pub async fn handle_delivery<S, K>(
    body: &[u8],
    source: &S,
    sink: &K,
) -> Result<(String, ProcessingResult), HandleError>
where
    S: DiplomaSource + ?Sized,
    K: OlympiadSink + ?Sized,
{
    let request: LookupRequest = serde_json::from_slice(body)?;
    let user_tg_id = request.user_tg_id.trim().to_string();
    let result = processor::process_message(&request, source, sink).await?;
    Ok((user_tg_id, result))
}

/// Single-queue consumer with serial processing
pub struct OlympsConsumer<S, K> {
    config: RabbitConfig,
    source: S,
    sink: K,
    notifier: SuccessNotifier,
}

impl<S, K> OlympsConsumer<S, K>
where
    S: DiplomaSource,
    K: OlympiadSink,
{
    pub fn new(config: RabbitConfig, source: S, sink: K, notifier: SuccessNotifier) -> Self {
        Self {
            config,
            source,
            sink,
            notifier,
        }
    }

    /// Connect, declare the queue, and consume until the broker goes away.
    ///
    /// Prefetch keeps at most `prefetch_count` (normally one) delivery in
    /// flight, so processing stays strictly serial per consumer process.
    pub async fn run(&self) -> teamsearch_common::Result<()> {
        let connection = Connection::connect(&self.config.amqp_uri(), ConnectionProperties::default())
            .await
            .map_err(|e| Error::Queue(format!("broker connect failed: {e}")))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| Error::Queue(format!("channel open failed: {e}")))?;

        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| Error::Queue(format!("qos setup failed: {e}")))?;
        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::Queue(format!("queue declare failed: {e}")))?;

        let mut consumer = channel
            .basic_consume(
                &self.config.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::Queue(format!("consume setup failed: {e}")))?;

        info!(queue = %self.config.queue, prefetch = self.config.prefetch_count, "consuming lookup requests");

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    error!(error = %err, "broker delivery error");
                    continue;
                }
            };

            let outcome = handle_delivery(&delivery.data, &self.source, &self.sink).await;
            let decision = decide(&outcome);

            let acked = match decision {
                DeliveryDecision::Ack => delivery.ack(BasicAckOptions::default()).await,
                DeliveryDecision::RejectDrop => {
                    delivery.reject(BasicRejectOptions { requeue: false }).await
                }
                DeliveryDecision::RejectRequeue => {
                    delivery.reject(BasicRejectOptions { requeue: true }).await
                }
            };
            if let Err(err) = acked {
                return Err(Error::Queue(format!("acknowledgement failed: {err}")));
            }

            match &outcome {
                Ok((user_tg_id, result)) => {
                    info!(
                        created = result.created,
                        total = result.total,
                        "lookup message processed"
                    );
                    // ack first, then notify; the notifier logs its own failures
                    self.notifier.send_success(user_tg_id).await;
                }
                Err(HandleError::Decode(err)) => {
                    warn!(error = %err, "dropping undecodable message");
                }
                Err(HandleError::Process(ProcessError::Validation(err))) => {
                    warn!(error = %err, "dropping invalid message");
                }
                Err(err) => {
                    error!(error = %err, "processing failed, message requeued");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;
    use crate::models::{DiplomaRecord, SubmissionPayload};
    use crate::services::db_client::{OutcomeCategory, SubmissionOutcome};
    use async_trait::async_trait;

    struct FakeSource(Vec<DiplomaRecord>);

    #[async_trait]
    impl DiplomaSource for FakeSource {
        async fn find_diplomas(
            &self,
            _full_name: &str,
            _birthdate: &str,
        ) -> Result<Vec<DiplomaRecord>, IdentityError> {
            Ok(self.0.clone())
        }
    }

    struct ErroringSource;

    #[async_trait]
    impl DiplomaSource for ErroringSource {
        async fn find_diplomas(
            &self,
            _full_name: &str,
            _birthdate: &str,
        ) -> Result<Vec<DiplomaRecord>, IdentityError> {
            Err(IdentityError::InvalidDate("31-02-2005".to_string()))
        }
    }

    struct FixedSink(u16);

    #[async_trait]
    impl OlympiadSink for FixedSink {
        async fn submit(&self, _payload: &SubmissionPayload) -> SubmissionOutcome {
            let category = OutcomeCategory::from_status(self.0);
            SubmissionOutcome {
                ok: category.is_ok(),
                status_code: self.0,
                category,
                response_body: None,
            }
        }
    }

    fn valid_body() -> Vec<u8> {
        serde_json::json!({
            "first_name": "Иван",
            "last_name": "Иванов",
            "middle_name": "",
            "date_of_birth": "01-12-2000",
            "user_tg_id": "123"
        })
        .to_string()
        .into_bytes()
    }

    fn one_record() -> Vec<DiplomaRecord> {
        vec![DiplomaRecord {
            person_name: Some("Иванов Иван".to_string()),
            year: 2024,
            olymp_name: Some("Олимпиада".to_string()),
            profile: Some("математика".to_string()),
            level: Some(1),
            result: Some(0),
        }]
    }

    #[tokio::test]
    async fn test_malformed_body_is_dropped() {
        let outcome =
            handle_delivery(b"\xff\xfe not json", &FakeSource(vec![]), &FixedSink(200)).await;
        assert!(matches!(outcome, Err(HandleError::Decode(_))));
        assert_eq!(decide(&outcome), DeliveryDecision::RejectDrop);
    }

    #[tokio::test]
    async fn test_missing_required_field_is_dropped() {
        let body = serde_json::json!({"first_name": "Иван", "last_name": "Иванов"})
            .to_string()
            .into_bytes();
        let outcome = handle_delivery(&body, &FakeSource(vec![]), &FixedSink(200)).await;
        assert!(matches!(
            outcome,
            Err(HandleError::Process(ProcessError::Validation(_)))
        ));
        assert_eq!(decide(&outcome), DeliveryDecision::RejectDrop);
    }

    #[tokio::test]
    async fn test_unexpected_discovery_error_is_requeued() {
        let outcome = handle_delivery(&valid_body(), &ErroringSource, &FixedSink(200)).await;
        assert!(matches!(
            outcome,
            Err(HandleError::Process(ProcessError::Other(_)))
        ));
        assert_eq!(decide(&outcome), DeliveryDecision::RejectRequeue);
    }

    #[tokio::test]
    async fn test_per_record_rejection_still_acks() {
        let outcome =
            handle_delivery(&valid_body(), &FakeSource(one_record()), &FixedSink(400)).await;
        let (user_tg_id, result) = outcome.as_ref().unwrap();
        assert_eq!(user_tg_id, "123");
        assert_eq!(result.total, 1);
        assert_eq!(result.created, 0);
        assert_eq!(decide(&outcome), DeliveryDecision::Ack);
    }

    #[tokio::test]
    async fn test_successful_processing_acks_with_created_count() {
        let outcome =
            handle_delivery(&valid_body(), &FakeSource(one_record()), &FixedSink(201)).await;
        let (_, result) = outcome.as_ref().unwrap();
        assert_eq!(result.created, 1);
        assert_eq!(decide(&outcome), DeliveryDecision::Ack);
    }

    #[tokio::test]
    async fn test_empty_discovery_still_acks() {
        let outcome =
            handle_delivery(&valid_body(), &FakeSource(vec![]), &FixedSink(200)).await;
        let (_, result) = outcome.as_ref().unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.created, 0);
        assert_eq!(decide(&outcome), DeliveryDecision::Ack);
    }
}
